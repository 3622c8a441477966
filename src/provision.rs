//! Database provisioning
//!
//! Fresh runs start from an empty database file: status table, setup
//! scripts, run parameters. Resumed runs reuse the existing file and only
//! re-run the scripts that (re)define functions and views.

use std::path::{Path, PathBuf};
use crate::config::{DiagnosticsConfig, Parameter};
use crate::script::Script;
use crate::session::{schema, Session, SqliteSession};
use crate::{Error, Result};

/// Remove any existing database and create an empty one with the
/// status table in place.
pub fn create_fresh(database: &Path, module: &str) -> Result<SqliteSession> {
    if database.exists() {
        tracing::info!("Removing existing database {}", database.display());
        std::fs::remove_file(database)?;
    }
    if let Some(parent) = database.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    tracing::info!("Creating database {}", database.display());
    let mut session = SqliteSession::create(database)?;

    tracing::info!("Creating status table ...");
    session.execute_batch(schema::CREATE_STATUS_TABLE)?;
    session.execute_unit(&schema::insert_status_sql(module))?;
    Ok(session)
}

/// Connect to the database of a previous run.
pub fn open_existing(database: &Path) -> Result<SqliteSession> {
    tracing::info!("Connecting to existing database {}", database.display());
    SqliteSession::open_existing(database)
}

/// Run whole script files, each as one batch.
pub fn run_scripts(session: &mut dyn Session, scripts: &[PathBuf]) -> Result<()> {
    for path in scripts {
        tracing::info!("Running script {} ...", path.display());
        let script = Script::load(path)?;
        session
            .execute_batch(script.text())
            .map_err(|e| Error::Database(format!("{}: {}", path.display(), e)))?;
        tracing::info!("Done.");
    }
    Ok(())
}

pub fn apply_parameters(session: &mut dyn Session, parameters: &[Parameter]) -> Result<()> {
    for parameter in parameters {
        let label = parameter.name.as_deref().unwrap_or("parameter");
        tracing::info!("Setting {} ...", label);
        session
            .execute_unit(&parameter.sql)
            .map_err(|e| Error::Database(format!("{}: {}", label, e)))?;
    }
    Ok(())
}

/// Drop and recreate the table the snapshot hook writes into.
pub fn prepare_diagnostics(session: &mut dyn Session, diagnostics: &DiagnosticsConfig) -> Result<()> {
    tracing::info!("Creating diagnostics table {}", diagnostics.table);
    session.execute_batch(&schema::diagnostics_table_sql(&diagnostics.table, &diagnostics.columns))?;
    Ok(())
}

pub fn mark_provisioned(session: &mut dyn Session, module: &str) -> Result<()> {
    session.execute_unit(&schema::set_status_sql(module, true))?;
    tracing::info!("Database for '{}' successfully built up", module);
    Ok(())
}
