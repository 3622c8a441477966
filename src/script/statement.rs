//! Statement values produced by the scanners

use serde::Serialize;

/// One executable statement extracted from a script.
///
/// `text` is trimmed and never contains the top-level terminator; indices
/// are contiguous from 0 in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Statement {
    pub index: usize,
    pub text: String,
    #[serde(skip)]
    terminator: char,
}

impl Statement {
    pub fn new(index: usize, text: impl Into<String>, terminator: char) -> Self {
        Self {
            index,
            text: text.into(),
            terminator,
        }
    }

    /// The statement as sent to the database, terminator included.
    pub fn sql(&self) -> String {
        format!("{}{}", self.text, self.terminator)
    }

    /// First line of the statement, shortened for progress display.
    pub fn preview(&self, max_chars: usize) -> String {
        let first = self.text.lines().next().unwrap_or("").trim();
        if first.chars().count() > max_chars {
            let cut: String = first.chars().take(max_chars).collect();
            format!("{}…", cut)
        } else {
            first.to_string()
        }
    }
}

impl std::fmt::Display for Statement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.text, self.terminator)
    }
}

/// Accumulates characters and cuts them into statements at terminators.
pub(crate) struct StatementBuilder {
    terminator: char,
    current: String,
    statements: Vec<Statement>,
}

impl StatementBuilder {
    pub(crate) fn new(terminator: char) -> Self {
        Self {
            terminator,
            current: String::new(),
            statements: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, ch: char) {
        self.current.push(ch);
    }

    /// Close the pending statement; whitespace-only fragments are dropped
    /// without consuming an index.
    pub(crate) fn close(&mut self) {
        let text = self.current.trim();
        if !text.is_empty() {
            let index = self.statements.len();
            self.statements
                .push(Statement::new(index, text, self.terminator));
        }
        self.current.clear();
    }

    /// Discard whatever follows the last terminator and return the statements.
    pub(crate) fn finish(self) -> Vec<Statement> {
        let trailing = self.current.trim();
        if !trailing.is_empty() {
            tracing::warn!(
                "Ignoring {} characters after the last '{}': {:?}",
                trailing.chars().count(),
                self.terminator,
                trailing.lines().next().unwrap_or("")
            );
        }
        self.statements
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_appends_terminator() {
        let stmt = Statement::new(0, "SELECT 1", ';');
        assert_eq!(stmt.sql(), "SELECT 1;");
        assert_eq!(stmt.to_string(), "SELECT 1;");
    }

    #[test]
    fn test_preview_uses_first_line() {
        let stmt = Statement::new(4, "UPDATE bus_data\n   SET voltage = 110000", ';');
        assert_eq!(stmt.preview(40), "UPDATE bus_data");
        assert_eq!(stmt.preview(6), "UPDATE…");
    }

    #[test]
    fn test_builder_drops_empty_fragments() {
        let mut builder = StatementBuilder::new(';');
        for ch in "  \n".chars() {
            builder.push(ch);
        }
        builder.close();
        for ch in " SELECT 2 ".chars() {
            builder.push(ch);
        }
        builder.close();

        let statements = builder.finish();
        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].index, 0);
        assert_eq!(statements[0].text, "SELECT 2");
    }
}
