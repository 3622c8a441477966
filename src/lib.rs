//! # sqlstep - Resumable SQL script runner
//!
//! Executes one large, hand-written SQL script statement by statement
//! against a live database, committing each statement on its own and
//! stopping at the first failure with the index to resume from.
//!
//! sqlstep provides:
//! - A quote-aware statement scanner (single-pass, or the legacy two-pass pipeline)
//! - A checkpointed, fail-fast execution engine over a pluggable `Session`
//! - A SQLite session backed by rusqlite
//! - Job orchestration: provisioning, external importer, CSV reference loads,
//!   result export and a persisted high-water mark

pub mod script;
pub mod checkpoint;
pub mod session;
pub mod engine;
pub mod job;
pub mod config;
pub mod provision;
pub mod import;
pub mod csv_io;
pub mod pipeline;
pub mod ui;
pub mod output;

// Re-exports for convenient access
pub use script::{Dialect, ScanMode, Script, Statement};
pub use checkpoint::Checkpoint;
pub use session::{Session, SessionError, SqliteSession};
pub use engine::{Engine, ExecutionResult, FailureKind, RunFailure, RunState, RunSummary, SnapshotHook};
pub use job::{JobDescriptor, JobStatus, ResumePolicy};

/// Result type alias for sqlstep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for sqlstep operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Ambiguous quoting: string literal opened at line {line} (byte {offset}) is never closed")]
    ParseAmbiguity { line: usize, offset: usize },

    #[error("Statement {index} failed: {detail}")]
    StatementFailed {
        index: usize,
        statement: String,
        detail: String,
    },

    #[error("Connectivity error: {detail}")]
    Connectivity { index: Option<usize>, detail: String },

    #[error("Resume index {resume_from} is beyond the end of the script ({total} statements)")]
    ResumeOutOfRange { resume_from: usize, total: usize },

    #[error("Database rejected request: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Import failed: {0}")]
    Import(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Index an operator should pass back to resume after this error, if any.
    pub fn resume_index(&self) -> Option<usize> {
        match self {
            Error::StatementFailed { index, .. } => Some(*index),
            Error::Connectivity { index, .. } => *index,
            _ => None,
        }
    }
}
