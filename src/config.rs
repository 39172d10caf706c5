use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Assigns exam invigilators to rooms with an ILP model.
#[derive(Debug, Parser)]
#[command(name = "invigilation_solver", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the solve endpoint over HTTP.
    Serve {
        #[arg(long, env = "INVIGILATION_ADDR", default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
        #[command(flatten)]
        options: ModelOptions,
    },
    /// Solve one input file and write the report next to earlier runs.
    Solve {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = "out_files")]
        out_dir: PathBuf,
        #[command(flatten)]
        options: ModelOptions,
    },
}

/// How a teacher's must-invigilate room list is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RoomRule {
    /// The teacher may only be placed in the listed rooms.
    #[default]
    Exclusive,
    /// The teacher must appear in each listed room at least once.
    AtLeastOnce,
}

/// How the session-worked indicator is tied to the assignments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SessionLinkage {
    /// Linked separately for every subject of the session: working the
    /// session means covering each of its subjects.
    #[default]
    PerSubject,
    /// Linked once to all assignments of the session.
    PerSession,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Args)]
#[serde(default)]
pub struct ModelOptions {
    #[arg(long, value_enum, default_value_t = RoomRule::Exclusive)]
    pub room_rule: RoomRule,
    #[arg(long, value_enum, default_value_t = SessionLinkage::PerSubject)]
    pub session_linkage: SessionLinkage,
    /// Forward the HiGHS log to the console.
    #[arg(long)]
    pub solver_log: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["invigilation_solver", "solve", "--input", "in.json"]).unwrap();
        let Command::Solve { input, out_dir, options } = cli.command else {
            panic!("expected solve");
        };
        assert_eq!(input, PathBuf::from("in.json"));
        assert_eq!(out_dir, PathBuf::from("out_files"));
        assert_eq!(options, ModelOptions::default());
    }

    #[test]
    fn test_model_options_flags() {
        let cli = Cli::try_parse_from([
            "invigilation_solver",
            "serve",
            "--addr",
            "0.0.0.0:9000",
            "--room-rule",
            "at-least-once",
            "--session-linkage",
            "per-session",
        ])
        .unwrap();
        let Command::Serve { addr, options } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(addr.port(), 9000);
        assert_eq!(options.room_rule, RoomRule::AtLeastOnce);
        assert_eq!(options.session_linkage, SessionLinkage::PerSession);
    }

    #[test]
    fn test_options_from_json() {
        let options: ModelOptions = serde_json::from_str(r#"{"room_rule": "at-least-once"}"#).unwrap();
        assert_eq!(options.room_rule, RoomRule::AtLeastOnce);
        assert_eq!(options.session_linkage, SessionLinkage::PerSubject);
        assert!(!options.solver_log);
    }
}
