//! SQLite session implementation

use std::path::{Path, PathBuf};
use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension};
use crate::{Error, Result};
use super::{schema, Session, SessionError};

/// Statements that manage transactions themselves or cannot run inside one.
const TRANSACTION_CONTROL: &[&str] = &[
    "BEGIN", "COMMIT", "END", "ROLLBACK", "SAVEPOINT", "RELEASE", "VACUUM", "ATTACH", "DETACH", "PRAGMA",
];

/// A single SQLite connection used as the run's database session
pub struct SqliteSession {
    conn: Connection,
    path: Option<PathBuf>,
}

impl SqliteSession {
    /// Open a database file, creating it if it doesn't exist
    pub fn create(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| connectivity(path, e))?;
        Self::from_connection(conn, Some(path.to_path_buf()))
    }

    /// Open a database file that must already exist
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Connectivity {
                index: None,
                detail: format!("database {} does not exist", path.display()),
            });
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX)
            .map_err(|e| connectivity(path, e))?;
        Self::from_connection(conn, Some(path.to_path_buf()))
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, None)
    }

    /// SQLite opens lazily; touch the schema so a bad file fails here.
    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .map_err(|e| Error::Connectivity {
                index: None,
                detail: format!(
                    "{} is not usable: {}",
                    path.as_deref().map(|p| p.display().to_string()).unwrap_or_else(|| ":memory:".into()),
                    e
                ),
            })?;
        Ok(Self { conn, path })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Provisioning status of a module, `None` when no row exists
    pub fn module_status(&self, module: &str) -> Result<Option<bool>> {
        self.conn
            .query_row(&schema::select_status_sql(module), [], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    /// Count rows of a table
    pub fn count_rows(&self, table: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", schema::quote_ident(table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

impl Session for SqliteSession {
    fn execute_unit(&mut self, sql: &str) -> std::result::Result<(), SessionError> {
        // Inside a script-managed BEGIN ... COMMIT the script owns the transaction.
        if controls_transactions(sql) || !self.conn.is_autocommit() {
            return self.conn.execute_batch(sql).map_err(classify);
        }

        // Dropping an uncommitted transaction rolls it back.
        let tx = self.conn.transaction().map_err(classify)?;
        tx.execute_batch(sql).map_err(classify)?;
        tx.commit().map_err(classify)
    }

    fn execute_batch(&mut self, sql: &str) -> std::result::Result<(), SessionError> {
        self.conn.execute_batch(sql).map_err(classify)
    }

    fn query_i64(&mut self, sql: &str) -> std::result::Result<Option<i64>, SessionError> {
        self.conn
            .query_row(sql, [], |row| row.get::<_, Option<i64>>(0))
            .optional()
            .map(Option::flatten)
            .map_err(classify)
    }
}

fn connectivity(path: &Path, err: rusqlite::Error) -> Error {
    Error::Connectivity {
        index: None,
        detail: format!("cannot open {}: {}", path.display(), err),
    }
}

/// Separate "the database refused this statement" from "the database is gone".
fn classify(err: rusqlite::Error) -> SessionError {
    let lost = match &err {
        rusqlite::Error::SqliteFailure(failure, _) => matches!(
            failure.code,
            ErrorCode::CannotOpen
                | ErrorCode::NotADatabase
                | ErrorCode::DatabaseCorrupt
                | ErrorCode::SystemIoFailure
                | ErrorCode::PermissionDenied
        ),
        _ => false,
    };

    if lost {
        SessionError::Connectivity(err.to_string())
    } else {
        SessionError::Rejected(err.to_string())
    }
}

fn controls_transactions(sql: &str) -> bool {
    let keyword: String = sql
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    TRANSACTION_CONTROL.contains(&keyword.as_str())
}
