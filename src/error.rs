use thiserror::Error;

/// Everything that can abort a run. An infeasible model is not an error.
#[derive(Debug, Error)]
pub enum InvigilationError {
    #[error("subject {subject}: time range {time:?} is not clearly AM or PM")]
    TimeRange { subject: String, time: String },

    #[error("{kind} row {row}: {reason}")]
    MalformedRecord {
        kind: &'static str,
        row: usize,
        reason: String,
    },

    #[error("subject {subject}: cannot read date {value:?}")]
    InvalidDate { subject: String, value: String },

    #[error("duplicate {kind} name {name:?}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("{context}: unknown subject {name:?}")]
    UnknownSubject { context: String, name: String },

    #[error("{context}: unknown room {name:?}")]
    UnknownRoom { context: String, name: String },

    #[error("room {room} has no requirement column for subject {subject}")]
    MissingRequirement { room: String, subject: String },

    #[error("solver failed: {0}")]
    Solver(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = InvigilationError> = std::result::Result<T, E>;
