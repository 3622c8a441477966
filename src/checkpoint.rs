//! Resume position for a run
//!
//! A checkpoint is the 0-based index of the first statement to execute.
//! Everything before it is assumed to be durably applied already and is
//! neither executed nor re-checked. Nothing here is persisted; see
//! `job` for the descriptor that carries the position across processes.

use crate::script::Statement;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Checkpoint {
    resume_from: usize,
}

impl Checkpoint {
    pub fn new(resume_from: usize) -> Self {
        Self { resume_from }
    }

    /// Absence of a resume index means running everything.
    pub fn from_option(resume_from: Option<usize>) -> Self {
        Self::new(resume_from.unwrap_or(0))
    }

    pub fn resume_from(&self) -> usize {
        self.resume_from
    }

    pub fn is_resumed(&self) -> bool {
        self.resume_from > 0
    }

    pub fn should_skip(&self, index: usize) -> bool {
        index < self.resume_from
    }

    /// Reject positions past the end of the script. Resuming exactly at
    /// the end is allowed and executes nothing.
    pub fn validate(&self, total: usize) -> Result<()> {
        if self.resume_from > total {
            return Err(Error::ResumeOutOfRange {
                resume_from: self.resume_from,
                total,
            });
        }
        Ok(())
    }

    /// The statements a run starting here has to execute.
    pub fn pending<'a>(&self, statements: &'a [Statement]) -> &'a [Statement] {
        let start = statements.partition_point(|s| self.should_skip(s.index));
        &statements[start..]
    }
}

impl std::fmt::Display for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.resume_from)
    }
}
