//! Source locations
//!
//! Every token and AST node carries a [`Span`]: character offsets into the
//! source plus the 1-based lines where the node starts and ends. Lines are what the
//! trace ultimately reports, so they are tracked eagerly by the lexer instead of being
//! recomputed from offsets.

use serde::{Deserialize, Serialize};

/// A region of source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    /// Start offset (inclusive, in chars)
    pub start: usize,
    /// End offset (exclusive, in chars)
    pub end: usize,
    /// Line where the span starts (1-based)
    pub line: u32,
    /// Line where the span ends (1-based)
    pub end_line: u32,
}

impl Span {
    /// Create a span on a single line
    pub fn new(start: usize, end: usize, line: u32) -> Self {
        Self {
            start,
            end,
            line,
            end_line: line,
        }
    }

    /// Span for nodes with no source position
    pub fn dummy() -> Self {
        Self::default()
    }

    /// Smallest span covering both `self` and `other`
    pub fn merge(self, other: Span) -> Span {
        let (first, last) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };
        Span {
            start: first.start,
            end: self.end.max(other.end),
            line: first.line,
            end_line: last.end_line.max(first.end_line),
        }
    }

    /// Whether this span came from real source text
    pub fn is_dummy(&self) -> bool {
        self.line == 0
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
