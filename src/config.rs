use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::engine::SnapshotHook;
use crate::script::ScanMode;

/// Marker for values the operator is asked for at startup
pub const ASK: &str = "<ask>";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SqlstepConfig {
    pub database: DatabaseConfig,
    pub scripts: ScriptsConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import: Option<ImportConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<DiagnosticsConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub csv_loads: Vec<CsvLoadConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseConfig {
    /// Relative paths are resolved against the job directory
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "job.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ScriptsConfig {
    /// Whole-file scripts run once when provisioning a fresh database
    #[serde(default)]
    pub setup: Vec<PathBuf>,
    /// Whole-file scripts re-run before resuming (functions, views)
    #[serde(default)]
    pub resume_setup: Vec<PathBuf>,
    /// The script executed statement by statement
    pub main: PathBuf,
    /// Statements run after the main script succeeds
    #[serde(default)]
    pub finalize: Vec<String>,
    #[serde(default)]
    pub scan_mode: ScanMode,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub post_statements: Vec<String>,
}

/// A run parameter written into the database on fresh runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Parameter {
    #[serde(default)]
    pub name: Option<String>,
    pub sql: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticsConfig {
    pub after_index: usize,
    pub table: String,
    pub columns: String,
    pub sql: String,
}

/// Reference data copied from a CSV file into a table on fresh runs.
/// The table is emptied first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CsvLoadConfig {
    /// Relative to the config file
    pub file: PathBuf,
    pub table: String,
    pub columns: Vec<String>,
    /// Zero-based CSV field feeding each column; the leading fields when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<usize>>,
    #[serde(default = "default_true")]
    pub has_header: bool,
}

impl CsvLoadConfig {
    /// CSV field index for each target column.
    pub fn field_indices(&self) -> crate::Result<Vec<usize>> {
        match &self.fields {
            Some(fields) if fields.len() != self.columns.len() => Err(crate::Error::Config(format!(
                "csv load into {}: {} columns but {} fields",
                self.table,
                self.columns.len(),
                fields.len()
            ))),
            Some(fields) => Ok(fields.clone()),
            None => Ok((0..self.columns.len()).collect()),
        }
    }
}

/// Tables written to `<dir>/<table>.csv` once the job has finished.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportConfig {
    pub tables: Vec<String>,
    /// Relative to the job directory
    #[serde(default = "default_results_dir")]
    pub dir: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_results_dir() -> PathBuf {
    PathBuf::from("results")
}

impl DiagnosticsConfig {
    pub fn hook(&self) -> SnapshotHook {
        SnapshotHook::new(self.after_index, self.sql.clone())
    }
}

impl SqlstepConfig {
    /// Replace every `<ask>` value using `ask(question, default)`.
    pub fn resolve_prompts<F>(&mut self, mut ask: F) -> std::io::Result<()>
    where
        F: FnMut(&str, &str) -> std::io::Result<String>,
    {
        if is_ask(&self.database.path) {
            self.database.path = ask("Database file", "job.db")?;
        }
        if let Some(import) = self.import.as_mut() {
            if is_ask(&import.command) {
                import.command = ask("Importer command", "osmosis")?;
            }
            if let Some(input) = import.input.as_mut() {
                if is_ask(input) {
                    *input = ask("Importer input file", "")?;
                }
            }
        }
        Ok(())
    }
}

fn is_ask(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(ASK)
}

/// Prompt on the terminal, falling back to `default` on empty input.
pub fn ask_terminal(question: &str, default: &str) -> std::io::Result<String> {
    let term = console::Term::stderr();
    if default.is_empty() {
        term.write_str(&format!("{}? ", question))?;
    } else {
        term.write_str(&format!("{}? (default: {}) ", question, default))?;
    }
    let answer = term.read_line()?;
    let answer = answer.trim();
    Ok(if answer.is_empty() { default.to_string() } else { answer.to_string() })
}

/// Filesystem locations derived from the config file path.
///
/// `/jobs/grid.toml` names the job `grid` and keeps its database, job
/// descriptor and log under `/jobs/grid/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobPaths {
    pub name: String,
    pub config_file: PathBuf,
    pub base_dir: PathBuf,
    pub job_dir: PathBuf,
}

impl JobPaths {
    pub fn from_config_path(config_file: &Path) -> anyhow::Result<Self> {
        let name = config_file
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow::anyhow!("cannot derive a job name from {}", config_file.display()))?
            .to_string();
        let base_dir = config_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let job_dir = base_dir.join(&name);

        Ok(Self {
            name,
            config_file: config_file.to_path_buf(),
            base_dir,
            job_dir,
        })
    }

    /// Paths named in the config (scripts, CSV inputs) are relative to the config file
    pub fn script(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// The database path is relative to the job directory
    pub fn database(&self, config: &SqlstepConfig) -> PathBuf {
        let path = Path::new(&config.database.path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.job_dir.join(path)
        }
    }

    pub fn results_dir(&self, export: &ExportConfig) -> PathBuf {
        if export.dir.is_absolute() {
            export.dir.clone()
        } else {
            self.job_dir.join(&export.dir)
        }
    }

    pub fn job_file(&self) -> PathBuf {
        self.job_dir.join(format!("{}.job.json", self.name))
    }

    pub fn log_file(&self) -> PathBuf {
        self.job_dir.join(format!("{}.log", self.name))
    }

    pub fn ensure_job_dir(&self) -> anyhow::Result<()> {
        if !self.job_dir.exists() {
            std::fs::create_dir_all(&self.job_dir)?;
        }
        Ok(())
    }
}

pub fn load_config(path: &Path) -> anyhow::Result<SqlstepConfig> {
    if !path.exists() {
        anyhow::bail!("config file {} not found (create one with `sqlstep init`)", path.display());
    }

    let contents = std::fs::read_to_string(path)?;
    let config: SqlstepConfig = toml::from_str(&contents)?;
    Ok(config)
}

pub fn write_config(path: &Path, config: &SqlstepConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

/// Starting point written by `sqlstep init`
pub fn sample_config() -> SqlstepConfig {
    SqlstepConfig {
        database: DatabaseConfig {
            path: "job.db".to_string(),
        },
        scripts: ScriptsConfig {
            setup: vec![PathBuf::from("sql/functions.sql"), PathBuf::from("sql/schema.sql")],
            resume_setup: vec![PathBuf::from("sql/functions.sql")],
            main: PathBuf::from("sql/main.sql"),
            finalize: Vec::new(),
            scan_mode: ScanMode::Unified,
        },
        import: None,
        parameters: vec![Parameter {
            name: Some("min_voltage".to_string()),
            sql: "UPDATE abstr_values SET val_int = 110000 WHERE val_description = 'min_voltage'".to_string(),
        }],
        diagnostics: None,
        csv_loads: Vec::new(),
        export: Some(ExportConfig {
            tables: vec!["bus_data".to_string(), "branch_data".to_string()],
            dir: default_results_dir(),
        }),
    }
}
