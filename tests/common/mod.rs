//! Test utilities for sqlstep integration tests.
//!
//! Provides a temporary job layout:
//! - `<tmp>/<name>.toml` config
//! - `<tmp>/sql/*.sql` scripts
//! - `<tmp>/<name>/` job directory created by the run

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use sqlstep::config::{load_config, JobPaths, SqlstepConfig};
use tempfile::TempDir;

/// Test fixture that manages a temporary job directory.
///
/// The directory is automatically cleaned up when the fixture is dropped.
pub struct JobFixture {
    pub temp_dir: TempDir,
    pub config_path: PathBuf,
}

impl JobFixture {
    /// Create a job named `grid` whose main script is `main_sql`.
    pub fn new(main_sql: &str) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let fixture = Self {
            config_path: temp_dir.path().join("grid.toml"),
            temp_dir,
        };
        fixture.write_script("schema.sql", "CREATE TABLE abstr_values (val_description TEXT, val_int INT);\nINSERT INTO abstr_values VALUES ('min_voltage', 0);\n");
        fixture.write_script("functions.sql", "CREATE VIEW IF NOT EXISTS one AS SELECT 1 AS x;\n");
        fixture.write_script("main.sql", main_sql);
        fixture.write_config(
            r#"
[database]
path = "grid.db"

[scripts]
setup = ["sql/schema.sql", "sql/functions.sql"]
resume_setup = ["sql/functions.sql"]
main = "sql/main.sql"

[[parameters]]
name = "min_voltage"
sql = "UPDATE abstr_values SET val_int = 110000 WHERE val_description = 'min_voltage'"
"#,
        );
        fixture
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write_script(&self, name: &str, contents: &str) {
        let dir = self.root().join("sql");
        std::fs::create_dir_all(&dir).expect("failed to create sql dir");
        std::fs::write(dir.join(name), contents).expect("failed to write script");
    }

    pub fn write_config(&self, contents: &str) {
        std::fs::write(&self.config_path, contents).expect("failed to write config");
    }

    pub fn append_config(&self, contents: &str) {
        let mut existing = std::fs::read_to_string(&self.config_path).expect("failed to read config");
        existing.push_str(contents);
        self.write_config(&existing);
    }

    pub fn paths(&self) -> JobPaths {
        JobPaths::from_config_path(&self.config_path).expect("invalid config path")
    }

    pub fn config(&self) -> SqlstepConfig {
        load_config(&self.config_path).expect("invalid config")
    }

    pub fn database(&self) -> PathBuf {
        self.paths().database(&self.config())
    }

    /// Open the job database directly for assertions.
    pub fn query_i64(&self, sql: &str) -> i64 {
        let conn = rusqlite::Connection::open(self.database()).expect("failed to open database");
        conn.query_row(sql, [], |row| row.get(0)).expect("query failed")
    }
}
