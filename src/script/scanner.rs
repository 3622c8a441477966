//! Single-pass statement scanner
//!
//! Tracks literal and comment state together, so a comment marker inside
//! a string literal is plain text and a quote inside a comment is ignored.

use super::statement::{Statement, StatementBuilder};
use super::{line_of, Dialect};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    InsideLiteral,
    InsideComment,
}

pub struct Scanner<'d> {
    dialect: &'d Dialect,
}

impl<'d> Scanner<'d> {
    pub fn new(dialect: &'d Dialect) -> Self {
        Self { dialect }
    }

    /// Split raw script text into statements in one pass.
    pub fn split(&self, text: &str) -> Result<Vec<Statement>> {
        let marker = self.dialect.line_comment.as_str();
        let mut builder = StatementBuilder::new(self.dialect.terminator);
        let mut state = ScanState::Outside;
        let mut literal_start = 0;
        // Characters of the comment marker still to be consumed.
        let mut marker_rest = 0;

        for (offset, ch) in text.char_indices() {
            match state {
                ScanState::InsideComment => {
                    if marker_rest > 0 {
                        marker_rest -= 1;
                    } else if ch == '\n' {
                        builder.push(ch);
                        state = ScanState::Outside;
                    }
                }
                ScanState::InsideLiteral => {
                    if ch == self.dialect.quote {
                        state = ScanState::Outside;
                    }
                    builder.push(ch);
                }
                ScanState::Outside => {
                    if !marker.is_empty() && text[offset..].starts_with(marker) {
                        state = ScanState::InsideComment;
                        marker_rest = marker.chars().count() - 1;
                    } else if ch == self.dialect.quote {
                        state = ScanState::InsideLiteral;
                        literal_start = offset;
                        builder.push(ch);
                    } else if ch == self.dialect.terminator {
                        builder.close();
                    } else {
                        builder.push(ch);
                    }
                }
            }
        }

        if state == ScanState::InsideLiteral {
            return Err(Error::ParseAmbiguity {
                line: line_of(text, literal_start),
                offset: literal_start,
            });
        }

        Ok(builder.finish())
    }
}
