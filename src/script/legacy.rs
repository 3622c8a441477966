//! Two-pass pipeline: comment stripping, then literal-aware splitting.
//!
//! The comment pass knows nothing about string literals, so a comment
//! marker inside a literal truncates the line. Scripts written against
//! that behaviour can still select it with `ScanMode::Legacy`.

use super::statement::{Statement, StatementBuilder};
use super::{line_of, Dialect};
use crate::{Error, Result};

/// Remove everything from `marker` to end of line, per line.
///
/// Line breaks are kept so line numbers stay stable. Block comments are
/// not recognised and pass through unchanged.
pub fn strip_line_comments(text: &str, marker: &str) -> String {
    if marker.is_empty() {
        return text.to_string();
    }

    text.split('\n')
        .map(|line| match line.find(marker) {
            Some(pos) => &line[..pos],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strip comments, then split. Positions in errors refer to `text`.
pub fn split(text: &str, dialect: &Dialect) -> Result<Vec<Statement>> {
    let stripped = strip_line_comments(text, &dialect.line_comment);
    tokenize(&stripped, dialect).map_err(|err| match err {
        Error::ParseAmbiguity { line, offset } => Error::ParseAmbiguity {
            line,
            offset: source_offset(text, &stripped, offset),
        },
        other => other,
    })
}

/// Map a byte offset in stripped text back to the unstripped source.
///
/// Stripping only shortens lines from the end, so the line number and
/// the column within the line are the same in both.
fn source_offset(source: &str, stripped: &str, offset: usize) -> usize {
    let before = &stripped[..offset];
    let line = before.matches('\n').count();
    let column = offset - before.rfind('\n').map_or(0, |pos| pos + 1);
    let line_start: usize = source.split_inclusive('\n').take(line).map(str::len).sum();
    line_start + column
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LiteralState {
    Outside,
    Inside,
}

/// Split comment-free text into statements.
///
/// A literal runs from one quote character to the next; terminators
/// inside it never split. Text after the last terminator is discarded.
pub fn tokenize(text: &str, dialect: &Dialect) -> Result<Vec<Statement>> {
    let mut builder = StatementBuilder::new(dialect.terminator);
    let mut state = LiteralState::Outside;
    let mut literal_start = 0;

    for (offset, ch) in text.char_indices() {
        match state {
            LiteralState::Outside if ch == dialect.quote => {
                state = LiteralState::Inside;
                literal_start = offset;
                builder.push(ch);
            }
            LiteralState::Outside if ch == dialect.terminator => builder.close(),
            LiteralState::Outside => builder.push(ch),
            LiteralState::Inside => {
                if ch == dialect.quote {
                    state = LiteralState::Outside;
                }
                builder.push(ch);
            }
        }
    }

    if state == LiteralState::Inside {
        return Err(Error::ParseAmbiguity {
            line: line_of(text, literal_start),
            offset: literal_start,
        });
    }

    Ok(builder.finish())
}
