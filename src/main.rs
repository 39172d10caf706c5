mod config;
mod data;
mod error;
mod instance;
mod model;
mod report;
mod server;
mod solver;

use clap::Parser;
use config::{Cli, Command, ModelOptions};
use data::SchedulingInput;
use error::Result;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Serve { addr, options } => server::run_server(addr, options).await,
        Command::Solve {
            input,
            out_dir,
            options,
        } => {
            match tokio::task::block_in_place(|| solve_file(&input, &out_dir, options))? {
                Some(path) => info!("Report written to {}", path.display()),
                None => warn!("No assignment to report; no report written."),
            }
            Ok(())
        }
    }
}

/// Solves the JSON input at `input` and writes the report into `out_dir`.
fn solve_file(input: &Path, out_dir: &Path, options: ModelOptions) -> Result<Option<PathBuf>> {
    let raw = std::fs::read_to_string(input)?;
    let input: SchedulingInput = serde_json::from_str(&raw)?;
    let output = solver::run(&input, options)?;
    report::write_report(out_dir, &output)
}
