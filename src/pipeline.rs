//! Job pipeline
//!
//! Ties the pieces together for one invocation:
//! 1. split the main script (ambiguities abort before the database is touched)
//! 2. provision a fresh database, or reopen the existing one when resuming
//! 3. run the importer, parameters and CSV reference loads (fresh runs only)
//! 4. execute the main script from the checkpoint
//! 5. run the finalize statements and export result tables to CSV
//!
//! The job descriptor is saved when the statement sequence starts, fails
//! and completes.

use std::path::PathBuf;
use crossbeam::channel::Sender;
use crate::checkpoint::Checkpoint;
use crate::config::{JobPaths, SqlstepConfig};
use crate::csv_io;
use crate::engine::{Engine, RunSummary};
use crate::import::Importer;
use crate::job::{JobDescriptor, ResumePolicy};
use crate::provision;
use crate::script::{Dialect, Script, Statement};
use crate::session::{Session, SqliteSession};
use crate::ui::ProgressMessage;
use crate::{Error, Result};

/// Where a run starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeRequest {
    /// Drop and rebuild the database, run everything
    Fresh,
    /// Keep the database, start at this statement
    At(usize),
    /// Keep the database, start where the job descriptor says
    FromJob,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    pub resume: ResumeRequest,
    pub policy: ResumePolicy,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            resume: ResumeRequest::Fresh,
            policy: ResumePolicy::RetryFailed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub summary: RunSummary,
    pub job: JobDescriptor,
    pub database: PathBuf,
    pub checkpoint: Checkpoint,
    /// CSV files written by the export step
    pub exported: Vec<PathBuf>,
}

pub struct Pipeline<'a> {
    paths: &'a JobPaths,
    config: &'a SqlstepConfig,
    dialect: Dialect,
}

impl<'a> Pipeline<'a> {
    pub fn new(paths: &'a JobPaths, config: &'a SqlstepConfig) -> Self {
        Self {
            paths,
            config,
            dialect: Dialect::default(),
        }
    }

    pub fn script_path(&self) -> PathBuf {
        self.paths.script(&self.config.scripts.main)
    }

    pub fn load_statements(&self) -> Result<Vec<Statement>> {
        Script::load(&self.script_path())?.statements(self.config.scripts.scan_mode, &self.dialect)
    }

    /// Resolve the requested start position; `None` means a fresh run.
    pub fn checkpoint_for(&self, options: &RunOptions, total: usize) -> Result<Option<Checkpoint>> {
        let checkpoint = match options.resume {
            ResumeRequest::Fresh => return Ok(None),
            ResumeRequest::At(index) => Checkpoint::new(index),
            ResumeRequest::FromJob => {
                let job_file = self.paths.job_file();
                let job = JobDescriptor::load(&job_file)?.ok_or_else(|| {
                    Error::Config(format!("no job descriptor at {}; nothing to resume", job_file.display()))
                })?;
                if job.statements != 0 && job.statements != total {
                    tracing::warn!(
                        "Script now has {} statements, previous run saw {}; indices may have shifted",
                        total,
                        job.statements
                    );
                }
                job.resume_checkpoint(options.policy)?
            }
        };
        checkpoint.validate(total)?;
        Ok(Some(checkpoint))
    }

    pub fn run(&self, options: &RunOptions, progress: Option<Sender<ProgressMessage>>) -> Result<PipelineReport> {
        let statements = self.load_statements()?;
        let resumed = self.checkpoint_for(options, statements.len())?;
        let checkpoint = resumed.unwrap_or_default();

        std::fs::create_dir_all(&self.paths.job_dir)?;
        let job_file = self.paths.job_file();
        let mut job = match resumed {
            Some(_) => JobDescriptor::load(&job_file)?
                .unwrap_or_else(|| JobDescriptor::new(&self.paths.name, self.script_path())),
            None => JobDescriptor::new(&self.paths.name, self.script_path()),
        };

        let database = self.paths.database(self.config);
        match self.execute(&database, &statements, resumed, &mut job, progress) {
            Ok((summary, exported)) => {
                tracing::info!("Job '{}' completed", self.paths.name);
                Ok(PipelineReport {
                    summary,
                    job,
                    database,
                    checkpoint,
                    exported,
                })
            }
            Err(err) => {
                // Statement failures were recorded by the engine step already.
                if err.resume_index().is_none() {
                    job.mark_aborted(&err);
                    job.save(&job_file)?;
                }
                Err(err)
            }
        }
    }

    fn execute(
        &self,
        database: &std::path::Path,
        statements: &[Statement],
        resumed: Option<Checkpoint>,
        job: &mut JobDescriptor,
        progress: Option<Sender<ProgressMessage>>,
    ) -> Result<(RunSummary, Vec<PathBuf>)> {
        let (mut session, checkpoint) = match resumed {
            Some(checkpoint) => {
                tracing::info!("Continuing at statement {} (database will not be emptied)", checkpoint.resume_from());
                (self.reopen(database)?, checkpoint)
            }
            None => {
                tracing::info!("Starting from scratch, rebuilding {}", database.display());
                (self.provision_fresh(database)?, Checkpoint::default())
            }
        };

        let job_file = self.paths.job_file();
        job.mark_running(statements.len(), checkpoint);
        job.save(&job_file)?;

        let hook = self.config.diagnostics.as_ref().map(|d| d.hook());
        let mut engine = Engine::new(&mut session).with_snapshot_hook(hook);
        if let Some(tx) = progress {
            engine = engine.with_progress(tx);
        }

        let summary = match engine.run(statements, checkpoint) {
            Ok(summary) => summary,
            Err(failure) => {
                job.mark_failed(&failure);
                job.save(&job_file)?;
                return Err(failure.into());
            }
        };
        drop(engine);

        // Every statement is applied; a failing finalize must not replay them.
        job.mark_completed();
        job.save(&job_file)?;

        for sql in &self.config.scripts.finalize {
            tracing::info!("Running finalize statement: {}", sql);
            session
                .execute_unit(sql)
                .map_err(|e| Error::Database(format!("finalize statement failed: {}", e)))?;
        }

        let exported = match &self.config.export {
            Some(export) => csv_io::export_tables(&session, &export.tables, &self.paths.results_dir(export))?,
            None => Vec::new(),
        };

        Ok((summary, exported))
    }

    fn provision_fresh(&self, database: &std::path::Path) -> Result<SqliteSession> {
        let mut session = provision::create_fresh(database, &self.paths.name)?;

        let setup: Vec<PathBuf> = self.config.scripts.setup.iter().map(|p| self.paths.script(p)).collect();
        provision::run_scripts(&mut session, &setup)?;
        provision::mark_provisioned(&mut session, &self.paths.name)?;

        if let Some(import) = &self.config.import {
            let importer = Importer::new(import, database, &self.paths.base_dir);
            importer.run()?;
            importer.run_post_statements(&mut session)?;
        }

        provision::apply_parameters(&mut session, &self.config.parameters)?;
        for load in &self.config.csv_loads {
            csv_io::load_table(&mut session, &self.paths.script(&load.file), load)?;
        }
        if let Some(diagnostics) = &self.config.diagnostics {
            provision::prepare_diagnostics(&mut session, diagnostics)?;
        }
        Ok(session)
    }

    fn reopen(&self, database: &std::path::Path) -> Result<SqliteSession> {
        let mut session = provision::open_existing(database)?;
        let scripts: Vec<PathBuf> = self
            .config
            .scripts
            .resume_setup
            .iter()
            .map(|p| self.paths.script(p))
            .collect();
        provision::run_scripts(&mut session, &scripts)?;
        Ok(session)
    }
}
