//! Script Layer - loading and splitting SQL scripts
//!
//! Two ways to turn script text into statements:
//! - `Unified`: one scanner tracking literals and comments together (default)
//! - `Legacy`: quote-unaware comment stripping, then literal-aware splitting

pub mod legacy;
pub mod scanner;
pub mod statement;

pub use legacy::{strip_line_comments, tokenize};
pub use scanner::Scanner;
pub use statement::Statement;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Lexical conventions of a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialect {
    pub terminator: char,
    pub quote: char,
    pub line_comment: String,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            terminator: ';',
            quote: '\'',
            line_comment: "--".to_string(),
        }
    }
}

/// How comments and literals are recognised while splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    #[default]
    Unified,
    Legacy,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Unified => "unified",
            ScanMode::Legacy => "legacy",
        }
    }
}

impl FromStr for ScanMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unified" => Ok(ScanMode::Unified),
            "legacy" => Ok(ScanMode::Legacy),
            _ => Err(Error::Config(format!("Unknown scan mode: {}", s))),
        }
    }
}

impl std::fmt::Display for ScanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Split script text into statements.
pub fn split(text: &str, mode: ScanMode, dialect: &Dialect) -> Result<Vec<Statement>> {
    match mode {
        ScanMode::Unified => Scanner::new(dialect).split(text),
        ScanMode::Legacy => legacy::split(text, dialect),
    }
}

/// 1-based line number of a byte offset.
pub(crate) fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

/// Raw script content, loaded once.
#[derive(Debug, Clone)]
pub struct Script {
    path: Option<PathBuf>,
    text: String,
}

impl Script {
    /// Read a script file. A leading byte-order mark is dropped.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let text = raw.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(raw);
        Ok(Self {
            path: Some(path.to_path_buf()),
            text,
        })
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            path: None,
            text: text.into(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn statements(&self, mode: ScanMode, dialect: &Dialect) -> Result<Vec<Statement>> {
        let statements = split(&self.text, mode, dialect)?;
        tracing::debug!(
            "Split {} into {} statements ({} mode)",
            self.path
                .as_deref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<inline script>".to_string()),
            statements.len(),
            mode
        );
        Ok(statements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_agree_without_markers_in_literals() {
        let text = "-- create\nCREATE TABLE t(x int);\nINSERT INTO t VALUES (1); -- one\n";
        let unified = split(text, ScanMode::Unified, &Dialect::default()).unwrap();
        let legacy = split(text, ScanMode::Legacy, &Dialect::default()).unwrap();
        assert_eq!(unified, legacy);
        assert_eq!(unified.len(), 2);
    }

    #[test]
    fn test_modes_differ_on_marker_in_literal() {
        let text = "INSERT INTO t VALUES ('a--b');";
        assert_eq!(split(text, ScanMode::Unified, &Dialect::default()).unwrap().len(), 1);
        assert!(matches!(
            split(text, ScanMode::Legacy, &Dialect::default()),
            Err(Error::ParseAmbiguity { .. })
        ));
    }

    #[test]
    fn test_modes_report_same_ambiguity_position() {
        let text = "-- load\nSELECT 1; -- warm up\nSELECT 'x;\n";
        let quote = text.rfind('\'').unwrap();
        for mode in [ScanMode::Unified, ScanMode::Legacy] {
            let err = split(text, mode, &Dialect::default()).unwrap_err();
            assert!(
                matches!(err, Error::ParseAmbiguity { line: 3, offset } if offset == quote),
                "{mode}: {err}"
            );
        }
    }

    #[test]
    fn test_scan_mode_from_str() {
        assert_eq!("LEGACY".parse::<ScanMode>().unwrap(), ScanMode::Legacy);
        assert!("fancy".parse::<ScanMode>().is_err());
    }

    #[test]
    fn test_load_strips_bom() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.sql");
        std::fs::write(&path, "\u{feff}SELECT 1;").unwrap();

        let script = Script::load(&path).unwrap();
        assert_eq!(script.text(), "SELECT 1;");
        assert_eq!(script.path(), Some(path.as_path()));
    }
}
