//! sqlstep CLI - Resumable SQL script runner

mod commands;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use sqlstep::config::JobPaths;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "sqlstep")]
#[command(version)]
#[command(about = "Resumable, statement-by-statement SQL script runner")]
#[command(long_about = r#"
sqlstep provisions a job database, runs its setup scripts and importer,
then executes the main SQL script one statement at a time. Each statement
commits on its own; the first failure stops the run and reports the index
to resume from.

Example usage:
  sqlstep init grid.toml
  sqlstep run grid.toml
  sqlstep run grid.toml --resume-at 42
  sqlstep split sql/main.sql
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the job database and execute its main script
    Run {
        /// Path to the job configuration file
        config: PathBuf,

        /// Keep the database and start at this statement index
        #[arg(long, conflicts_with = "resume")]
        resume_at: Option<usize>,

        /// Keep the database and start where the last run stopped
        #[arg(long)]
        resume: bool,

        /// With --resume, start after the statement that failed last time
        #[arg(long, requires = "resume")]
        skip_failed: bool,
    },

    /// List the statements of a script with their indices
    Split {
        /// Path to the SQL script
        script: PathBuf,

        /// Strip comments without regard to string literals first
        #[arg(long)]
        legacy: bool,

        /// Print statements as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the persisted state of a job
    Status {
        /// Path to the job configuration file
        config: PathBuf,

        /// Print the job descriptor as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a starter configuration file
    Init {
        /// Where to write the configuration
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

fn init_logging(verbose: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    if let Some(path) = log_file {
        tracing::info!("Logging to standard error and to file '{}'", path.display());
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            resume_at,
            resume,
            skip_failed,
        } => {
            let paths = JobPaths::from_config_path(&config)?;
            paths.ensure_job_dir()?;
            init_logging(cli.verbose, Some(&paths.log_file()))?;
            commands::run_job(&paths, resume_at, resume, skip_failed)?;
        }

        Commands::Split { script, legacy, json } => {
            init_logging(cli.verbose, None)?;
            commands::split_script(&script, legacy, json)?;
        }

        Commands::Status { config, json } => {
            init_logging(cli.verbose, None)?;
            let paths = JobPaths::from_config_path(&config)?;
            commands::show_status(&paths, json)?;
        }

        Commands::Init { path, force } => {
            init_logging(cli.verbose, None)?;
            commands::init_config(&path, force)?;
        }
    }

    Ok(())
}
