//! Source positions, spans, and diagnostic rendering.
//!
//! The semantic core never formats prose while solving; it carries structured
//! error kinds and converts them to rendered snippets at reporting boundaries.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;

use thiserror::Error;

use crate::core::lexer::LexError;
use crate::core::parse::ParseError;
use crate::core::resolve::ResolveError;
use crate::core::typecheck::TypeCheckError;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("name resolution failed")]
    Resolve(Vec<ResolveError>),

    #[error("type checking failed")]
    TypeCheck(Vec<TypeCheckError>),

    #[error("IO error: {0}")]
    Io(PathBuf, std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn start() -> Self {
        Position {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn to(self, other: Span) -> Span {
        Span::new(self.start, other.end)
    }
}

impl Default for Span {
    fn default() -> Self {
        Self {
            start: Position::start(),
            end: Position::start(),
        }
    }
}

impl Display for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// An error kind paired with the source span it refers to.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedError<K> {
    kind: K,
    span: Span,
}

impl<K> SpannedError<K> {
    pub fn new(kind: K, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn kind(&self) -> &K {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn into_kind(self) -> K {
        self.kind
    }
}

impl<K: Display> Display for SpannedError<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "({}) {}", self.span.start, self.kind)
    }
}

impl<K: Display + std::fmt::Debug> std::error::Error for SpannedError<K> {}

fn build_marker(len: usize, single_line: bool) -> String {
    if single_line && len == 1 {
        "^".to_string()
    } else {
        "-".repeat(len.max(1))
    }
}

/// Formats an error message with a source snippet and marker lines
/// highlighting the span.
///
/// Single-line spans use a caret for one char and dashes otherwise;
/// multi-line spans underline each covered line. One line of context is shown
/// before and after the span.
pub fn format_error(source: &str, span: Span, error: impl Display) -> String {
    let start_line = span.start.line.max(1);
    let end_line = span.end.line.max(start_line);
    let lines: Vec<&str> = source.lines().collect();

    let first_line = start_line.saturating_sub(1).max(1);
    let last_line = (end_line + 1).min(lines.len().max(1));

    let number_width = last_line.to_string().len();

    let mut out = String::new();
    out.push_str(&format!(
        "({}:{}) {}\n",
        span.start.line, span.start.column, error
    ));

    let single_line = start_line == end_line;

    for line_no in first_line..=last_line {
        let content = lines.get(line_no - 1).copied().unwrap_or("");
        out.push_str(&format!(
            "│ {:>number_width$} │ {}\n",
            line_no,
            content,
            number_width = number_width
        ));

        if line_no < start_line || line_no > end_line {
            continue;
        }

        let start_col = if line_no == span.start.line {
            span.start.column.max(1)
        } else {
            1
        };
        let end_col_excl = if line_no == span.end.line {
            span.end.column.max(start_col)
        } else {
            content.chars().count() + 1
        };

        if end_col_excl > start_col {
            let len = end_col_excl - start_col;
            let mut marker = String::with_capacity(start_col - 1 + len);
            marker.push_str(&" ".repeat(start_col - 1));
            marker.push_str(&build_marker(len, single_line));
            out.push_str(&format!(
                "│ {:>number_width$} │ {}\n",
                "",
                marker,
                number_width = number_width
            ));
        }
    }
    out
}
