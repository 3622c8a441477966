use std::path::Path;
use sqlstep::config::{ask_terminal, load_config, sample_config, write_config, JobPaths};
use sqlstep::job::{JobDescriptor, ResumePolicy};
use sqlstep::pipeline::{Pipeline, ResumeRequest, RunOptions};
use sqlstep::script::{Dialect, ScanMode, Script};
use sqlstep::ui::{self, Icons, RunProgress, TableBuilder};
use sqlstep::Error;

/// The command line that resumes `paths` at `index`.
pub fn resume_command(paths: &JobPaths, index: usize) -> String {
    format!("sqlstep run {} --resume-at {}", paths.config_file.display(), index)
}

pub fn run_job(paths: &JobPaths, resume_at: Option<usize>, resume: bool, skip_failed: bool) -> anyhow::Result<()> {
    let mut config = load_config(&paths.config_file)?;
    config.resolve_prompts(ask_terminal)?;

    let options = RunOptions {
        resume: match (resume_at, resume) {
            (Some(index), _) => ResumeRequest::At(index),
            (None, true) => ResumeRequest::FromJob,
            (None, false) => ResumeRequest::Fresh,
        },
        policy: if skip_failed {
            ResumePolicy::SkipFailed
        } else {
            ResumePolicy::RetryFailed
        },
    };

    ui::header(&format!("Job '{}'", paths.name));
    ui::status(Icons::CONFIG, "Config", &paths.config_file.display().to_string());
    ui::status(Icons::DATABASE, "Database", &paths.database(&config).display().to_string());
    match options.resume {
        ResumeRequest::Fresh => ui::status(Icons::REBUILD, "Mode", "starting from scratch (database will be rebuilt)"),
        ResumeRequest::At(index) => ui::status(Icons::RESUME, "Mode", &format!("continuing at statement #{}", index)),
        ResumeRequest::FromJob => ui::status(Icons::RESUME, "Mode", "continuing where the last run stopped"),
    }

    let pipeline = Pipeline::new(paths, &config);
    let (progress, tx) = RunProgress::new();

    match pipeline.run(&options, Some(tx)) {
        Ok(report) => {
            progress.finish_with_summary(report.summary.elapsed, report.summary.executed, report.summary.skipped);

            let mut table = TableBuilder::new();
            table
                .add_row("Statements", report.job.statements)
                .add_row("Started at", report.checkpoint)
                .add_row("Executed", report.summary.executed)
                .add_row("Skipped", report.summary.skipped)
                .add_row("Exported files", report.exported.len())
                .add_row("Database", report.database.display());
            println!("{}", table.build());
            for path in &report.exported {
                ui::status(Icons::EXPORT, "Exported", &path.display().to_string());
            }
            ui::success("Execution finished successfully");
            Ok(())
        }
        Err(err) => {
            progress.join();
            if let Some(index) = err.resume_index() {
                let sql = match &err {
                    Error::StatementFailed { statement, .. } => statement.clone(),
                    _ => pipeline
                        .load_statements()
                        .ok()
                        .and_then(|statements| statements.get(index).map(|s| s.sql()))
                        .unwrap_or_default(),
                };
                ui::failure_report(index, &sql, &resume_command(paths, index));
            }
            Err(err.into())
        }
    }
}

pub fn split_script(path: &Path, legacy: bool, json: bool) -> anyhow::Result<()> {
    let script = Script::load(path)?;
    let mode = if legacy { ScanMode::Legacy } else { ScanMode::Unified };
    let statements = script.statements(mode, &Dialect::default())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&statements)?);
        return Ok(());
    }

    for statement in &statements {
        ui::statement(statement.index, &statement.sql());
    }
    ui::section("Summary");
    ui::summary_row("Statements", &statements.len().to_string());
    ui::summary_row("Scan mode", mode.as_str());
    Ok(())
}

pub fn show_status(paths: &JobPaths, json: bool) -> anyhow::Result<()> {
    let Some(job) = JobDescriptor::load(&paths.job_file())? else {
        ui::warn(&format!("Job '{}' has not been run yet", paths.name));
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
        return Ok(());
    }

    let next = match job.resume_checkpoint(ResumePolicy::RetryFailed) {
        Ok(checkpoint) if checkpoint.resume_from() >= job.statements => "nothing left to run".to_string(),
        Ok(checkpoint) => resume_command(paths, checkpoint.resume_from()),
        Err(_) => "interrupted; choose --resume-at explicitly".to_string(),
    };

    let mut table = TableBuilder::new();
    table
        .add_row("Job", &job.name)
        .add_row("Script", job.script.display())
        .add_row("Statements", job.statements)
        .add_row("High-water mark", job.high_water_mark)
        .add_row("Status", job.status)
        .add_row("Last error", job.last_error.as_deref().unwrap_or("-"))
        .add_row("Updated (unix)", job.updated_at_unix)
        .add_row("Next", next);

    println!("{} {}", Icons::STATS, paths.job_file().display());
    println!("{}", table.build());
    Ok(())
}

pub fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    write_config(path, &sample_config(), force)?;
    ui::success(&format!("Wrote {}", path.display()));
    ui::info("Next", "edit the script paths, then run `sqlstep run` with this file");
    Ok(())
}
