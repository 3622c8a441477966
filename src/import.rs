//! External data importer
//!
//! The importer is a separate program that fills the base tables. It is
//! invoked once per fresh run; a non-zero exit stops the run before any
//! statement of the main script executes.

use std::path::{Path, PathBuf};
use std::process::Command;
use crate::config::ImportConfig;
use crate::session::Session;
use crate::{Error, Result};

pub struct Importer<'a> {
    config: &'a ImportConfig,
    database: PathBuf,
    base_dir: PathBuf,
}

impl<'a> Importer<'a> {
    pub fn new(config: &'a ImportConfig, database: &Path, base_dir: &Path) -> Self {
        Self {
            config,
            database: database.to_path_buf(),
            base_dir: base_dir.to_path_buf(),
        }
    }

    /// Input file, relative to the config file directory
    fn input(&self) -> Option<PathBuf> {
        self.config.input.as_ref().map(|input| {
            let path = Path::new(input);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                self.base_dir.join(path)
            }
        })
    }

    /// Substitute `{database}` and `{input}` in the configured arguments.
    pub fn args(&self) -> Vec<String> {
        let database = self.database.display().to_string();
        let input = self.input().map(|p| p.display().to_string()).unwrap_or_default();
        self.config
            .args
            .iter()
            .map(|arg| arg.replace("{database}", &database).replace("{input}", &input))
            .collect()
    }

    pub fn command(&self) -> Command {
        let mut command = Command::new(&self.config.command);
        command.args(self.args()).current_dir(&self.base_dir);
        command
    }

    /// Run the importer and wait for it to exit.
    pub fn run(&self) -> Result<()> {
        if let Some(input) = self.input() {
            if !input.exists() {
                return Err(Error::Import(format!("input file {} not found", input.display())));
            }
            tracing::info!("Using input file: {}", input.display());
        }

        tracing::info!("Running importer: {} {}", self.config.command, self.args().join(" "));
        let status = self
            .command()
            .status()
            .map_err(|e| Error::Import(format!("cannot start '{}': {}", self.config.command, e)))?;

        if !status.success() {
            return Err(Error::Import(format!("'{}' exited with {}", self.config.command, status)));
        }
        tracing::info!("Import finished");
        Ok(())
    }

    /// Statements that derive working tables from the imported data.
    pub fn run_post_statements(&self, session: &mut dyn Session) -> Result<()> {
        for sql in &self.config.post_statements {
            tracing::info!("Running post-import statement: {}", sql);
            session
                .execute_unit(sql)
                .map_err(|e| Error::Import(format!("post-import statement failed: {}", e)))?;
        }
        Ok(())
    }
}
