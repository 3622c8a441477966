//! Execution engine
//!
//! Runs statements strictly in order, one committed unit of work each,
//! and stops at the first failure. The failure carries the index the
//! next run should resume from; the engine itself keeps no state across
//! runs.

use std::time::{Duration, Instant};
use crossbeam::channel::Sender;
use serde::Serialize;
use crate::checkpoint::Checkpoint;
use crate::script::Statement;
use crate::session::{Session, SessionError};
use crate::ui::ProgressMessage;

/// Outcome of one executed statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub index: usize,
    pub succeeded: bool,
    pub error_detail: Option<String>,
}

/// Lifecycle of a run. `Failed` is terminal; there is no retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NotStarted,
    Running(usize),
    Completed,
    Failed(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The database refused the statement
    Rejected,
    /// The session was lost while executing the statement
    Connectivity,
}

/// Why a run stopped, and where to pick it up again
#[derive(Debug, Clone, thiserror::Error)]
#[error("statement {index} failed: {detail}")]
pub struct RunFailure {
    pub index: usize,
    pub statement: String,
    pub kind: FailureKind,
    pub detail: String,
    pub results: Vec<ExecutionResult>,
}

impl RunFailure {
    /// The index to hand back as the next run's resume position.
    pub fn resume_index(&self) -> usize {
        self.index
    }
}

impl From<RunFailure> for crate::Error {
    fn from(failure: RunFailure) -> Self {
        match failure.kind {
            FailureKind::Rejected => crate::Error::StatementFailed {
                index: failure.index,
                statement: failure.statement,
                detail: failure.detail,
            },
            FailureKind::Connectivity => crate::Error::Connectivity {
                index: Some(failure.index),
                detail: failure.detail,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub executed: usize,
    pub skipped: usize,
    pub results: Vec<ExecutionResult>,
    pub elapsed: Duration,
}

/// Records coarse progress counters into a side table after each statement
/// past `after_index`. Purely observational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHook {
    pub after_index: usize,
    pub sql: String,
}

impl SnapshotHook {
    pub fn new(after_index: usize, sql: impl Into<String>) -> Self {
        Self {
            after_index,
            sql: sql.into(),
        }
    }

    pub fn applies_to(&self, index: usize) -> bool {
        index > self.after_index
    }

    /// Substitute `{index}` with the statement index.
    pub fn render(&self, index: usize) -> String {
        self.sql.replace("{index}", &index.to_string())
    }
}

pub struct Engine<'s> {
    session: &'s mut dyn Session,
    hook: Option<SnapshotHook>,
    progress: Option<Sender<ProgressMessage>>,
    state: RunState,
}

impl<'s> Engine<'s> {
    pub fn new(session: &'s mut dyn Session) -> Self {
        Self {
            session,
            hook: None,
            progress: None,
            state: RunState::NotStarted,
        }
    }

    pub fn with_snapshot_hook(mut self, hook: Option<SnapshotHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn with_progress(mut self, progress: Sender<ProgressMessage>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Execute every statement at or after the checkpoint, in order.
    pub fn run(&mut self, statements: &[Statement], checkpoint: Checkpoint) -> Result<RunSummary, RunFailure> {
        let started = Instant::now();
        let pending = checkpoint.pending(statements);
        let skipped = statements.len() - pending.len();
        let mut results = Vec::with_capacity(pending.len());

        tracing::info!(
            "Executing {} of {} statements, starting at {}",
            pending.len(),
            statements.len(),
            checkpoint
        );
        self.notify(ProgressMessage::Started {
            total: statements.len(),
            pending: pending.len(),
            resume_from: checkpoint.resume_from(),
        });

        for statement in pending {
            self.state = RunState::Running(statement.index);
            tracing::info!("Executing SQL statement {}:\n{}", statement.index, statement.sql());
            self.notify(ProgressMessage::Executing {
                index: statement.index,
                preview: statement.preview(60),
            });

            if let Err(err) = self.session.execute_unit(&statement.sql()) {
                return Err(self.fail(statement, err, results));
            }

            results.push(ExecutionResult {
                index: statement.index,
                succeeded: true,
                error_detail: None,
            });
            self.notify(ProgressMessage::Committed { index: statement.index });
            self.record_snapshot(statement.index);
        }

        self.state = RunState::Completed;
        self.notify(ProgressMessage::Finished);

        Ok(RunSummary {
            executed: results.len(),
            skipped,
            results,
            elapsed: started.elapsed(),
        })
    }

    fn fail(&mut self, statement: &Statement, err: SessionError, mut results: Vec<ExecutionResult>) -> RunFailure {
        let kind = if err.is_connectivity() {
            FailureKind::Connectivity
        } else {
            FailureKind::Rejected
        };
        let detail = err.detail().to_string();

        tracing::error!("Statement {} failed ({:?}): {}", statement.index, kind, detail);
        self.state = RunState::Failed(statement.index);
        self.notify(ProgressMessage::Failed { index: statement.index });

        results.push(ExecutionResult {
            index: statement.index,
            succeeded: false,
            error_detail: Some(detail.clone()),
        });

        RunFailure {
            index: statement.index,
            statement: statement.sql(),
            kind,
            detail,
            results,
        }
    }

    fn record_snapshot(&mut self, index: usize) {
        let Some(hook) = &self.hook else {
            return;
        };
        if !hook.applies_to(index) {
            return;
        }

        let sql = hook.render(index);
        if let Err(err) = self.session.execute_unit(&sql) {
            tracing::warn!("Progress snapshot after statement {} failed: {}", index, err);
        }
    }

    fn notify(&self, msg: ProgressMessage) {
        if let Some(tx) = &self.progress {
            // A vanished UI must not stop the run.
            tx.send(msg).ok();
        }
    }
}
