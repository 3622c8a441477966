//! Resumable job descriptor
//!
//! The engine only ever needs a start index. Where that index comes from
//! is decided here: the descriptor persists the high-water mark of the
//! last run, and a `ResumePolicy` turns it into a `Checkpoint`.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use serde::{Deserialize, Serialize};
use crate::checkpoint::Checkpoint;
use crate::engine::RunFailure;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Failed,
    Completed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Failed => "failed",
            JobStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What to do with the statement a previous run failed on.
///
/// `RetryFailed` re-executes it, which is only safe because every
/// statement runs in its own transaction and a failure leaves nothing
/// behind. `SkipFailed` is for statements the operator applied by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResumePolicy {
    #[default]
    RetryFailed,
    SkipFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub name: String,
    pub script: PathBuf,
    pub statements: usize,
    /// First statement not known to be applied
    pub high_water_mark: usize,
    pub status: JobStatus,
    pub last_error: Option<String>,
    pub updated_at_unix: u64,
}

impl JobDescriptor {
    pub fn new(name: impl Into<String>, script: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            statements: 0,
            high_water_mark: 0,
            status: JobStatus::Pending,
            last_error: None,
            updated_at_unix: now_unix(),
        }
    }

    /// Load a descriptor, `None` if the file doesn't exist
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Write via a temporary file so a crash never leaves half a descriptor.
    pub fn save(&self, path: &Path) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp, path)?;
        tracing::debug!("Saved job descriptor {} ({}, mark {})", path.display(), self.status, self.high_water_mark);
        Ok(())
    }

    pub fn mark_running(&mut self, statements: usize, checkpoint: Checkpoint) {
        self.statements = statements;
        self.high_water_mark = checkpoint.resume_from();
        self.status = JobStatus::Running;
        self.last_error = None;
        self.touch();
    }

    pub fn mark_failed(&mut self, failure: &RunFailure) {
        self.high_water_mark = failure.resume_index();
        self.status = JobStatus::Failed;
        self.last_error = Some(failure.detail.clone());
        self.touch();
    }

    /// A failure outside the statement sequence (provisioning, import,
    /// finalize). The mark is left where it is.
    pub fn mark_aborted(&mut self, error: &Error) {
        self.status = JobStatus::Failed;
        self.last_error = Some(error.to_string());
        self.touch();
    }

    pub fn mark_completed(&mut self) {
        self.high_water_mark = self.statements;
        self.status = JobStatus::Completed;
        self.last_error = None;
        self.touch();
    }

    /// Where the next run should start.
    ///
    /// A `Running` descriptor means the previous process died mid-run
    /// without reporting; the applied prefix is unknown, so the operator
    /// must choose the index explicitly.
    pub fn resume_checkpoint(&self, policy: ResumePolicy) -> Result<Checkpoint> {
        match self.status {
            JobStatus::Pending => Ok(Checkpoint::new(0)),
            JobStatus::Completed => Ok(Checkpoint::new(self.high_water_mark)),
            JobStatus::Failed => match policy {
                ResumePolicy::RetryFailed => Ok(Checkpoint::new(self.high_water_mark)),
                ResumePolicy::SkipFailed => Ok(Checkpoint::new(self.high_water_mark + 1)),
            },
            JobStatus::Running => Err(Error::Config(format!(
                "job '{}' was interrupted while running from statement {}; pass --resume-at explicitly",
                self.name, self.high_water_mark
            ))),
        }
    }

    fn touch(&mut self) {
        self.updated_at_unix = now_unix();
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FailureKind;

    fn failure_at(index: usize) -> RunFailure {
        RunFailure {
            index,
            statement: "SELECT broken;".into(),
            kind: FailureKind::Rejected,
            detail: "no such column: broken".into(),
            results: Vec::new(),
        }
    }

    #[test]
    fn test_failed_job_resumes_at_failing_index() {
        let mut job = JobDescriptor::new("grid", "power_script.sql");
        job.mark_running(10, Checkpoint::new(0));
        job.mark_failed(&failure_at(3));

        assert_eq!(job.high_water_mark, 3);
        assert_eq!(job.resume_checkpoint(ResumePolicy::RetryFailed).unwrap(), Checkpoint::new(3));
        assert_eq!(job.resume_checkpoint(ResumePolicy::SkipFailed).unwrap(), Checkpoint::new(4));
    }

    #[test]
    fn test_completed_job_has_nothing_left() {
        let mut job = JobDescriptor::new("grid", "power_script.sql");
        job.mark_running(10, Checkpoint::new(4));
        job.mark_completed();

        assert_eq!(job.high_water_mark, 10);
        assert_eq!(job.resume_checkpoint(ResumePolicy::default()).unwrap(), Checkpoint::new(10));
    }

    #[test]
    fn test_interrupted_job_requires_explicit_index() {
        let mut job = JobDescriptor::new("grid", "power_script.sql");
        job.mark_running(10, Checkpoint::new(2));
        assert!(matches!(job.resume_checkpoint(ResumePolicy::RetryFailed), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.job.json");
        assert!(JobDescriptor::load(&path).unwrap().is_none());

        let mut job = JobDescriptor::new("grid", "power_script.sql");
        job.mark_running(5, Checkpoint::new(0));
        job.mark_failed(&failure_at(2));
        job.save(&path).unwrap();

        let loaded = JobDescriptor::load(&path).unwrap().unwrap();
        assert_eq!(loaded, job);
        assert_eq!(loaded.last_error.as_deref(), Some("no such column: broken"));
        assert!(!path.with_extension("json.tmp").exists());
    }
}
