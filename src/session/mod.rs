//! Session Layer - the database as seen by the engine
//!
//! The engine only needs three things from a database:
//! - run one statement as its own committed unit of work
//! - run a whole script file in one go (provisioning)
//! - read a single integer back (status checks, tests)

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteSession;

/// Why the database did not accept a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The statement reached the database and was refused.
    #[error("{0}")]
    Rejected(String),
    /// The database could not be reached or stopped being usable.
    #[error("{0}")]
    Connectivity(String),
}

impl SessionError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SessionError::Connectivity(_))
    }

    pub fn detail(&self) -> &str {
        match self {
            SessionError::Rejected(detail) | SessionError::Connectivity(detail) => detail,
        }
    }
}

impl From<SessionError> for crate::Error {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Rejected(detail) => crate::Error::Database(detail),
            SessionError::Connectivity(detail) => crate::Error::Connectivity { index: None, detail },
        }
    }
}

/// An open, authenticated database session.
///
/// Implementations must not be shared between runs; the engine borrows
/// the session mutably for the whole run.
pub trait Session {
    /// Execute one statement and make its effects durable before returning.
    /// On error nothing of the statement may remain applied.
    fn execute_unit(&mut self, sql: &str) -> Result<(), SessionError>;

    /// Execute a multi-statement script as one request.
    fn execute_batch(&mut self, sql: &str) -> Result<(), SessionError>;

    /// First column of the first row, if any.
    fn query_i64(&mut self, sql: &str) -> Result<Option<i64>, SessionError>;
}
