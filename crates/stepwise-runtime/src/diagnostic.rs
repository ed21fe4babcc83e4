//! Diagnostics for source that cannot be traced
//!
//! Lexer, parser and instrumenter problems all flow through [`Diagnostic`] so the
//! CLI and the service boundary can render them the same way.

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostic schema version
pub const DIAG_VERSION: u32 = 1;

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    /// Prevents the snippet from running
    Error,
    /// Reported but not fatal
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message (error or warning)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Diagnostic schema version
    pub diag_version: u32,
    /// Severity level
    pub level: DiagnosticLevel,
    /// Error code (e.g., "SW1001")
    pub code: String,
    /// Main diagnostic message
    pub message: String,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Length of error span
    pub length: usize,
    /// Source line string
    pub snippet: String,
    /// Short label for caret range
    pub label: String,
    /// Additional notes
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
    /// Suggested fix
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic with code
    pub fn error_with_code(
        code: impl Into<String>,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            diag_version: DIAG_VERSION,
            level: DiagnosticLevel::Error,
            code: code.into(),
            message: message.into(),
            line: span.line.max(1) as usize,
            column: 1,
            length: span.len(),
            snippet: String::new(),
            label: String::new(),
            notes: Vec::new(),
            help: None,
        }
    }

    /// Create a new warning diagnostic with code
    pub fn warning_with_code(
        code: impl Into<String>,
        message: impl Into<String>,
        span: Span,
    ) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            ..Self::error_with_code(code, message, span)
        }
    }

    /// Set the line number
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    /// Set the column number
    pub fn with_column(mut self, column: usize) -> Self {
        self.column = column;
        self
    }

    /// Set the snippet (source line)
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    /// Set the label (caret description)
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Add a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Add a help message
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Format as human-readable string
    pub fn to_human_string(&self) -> String {
        let mut output = String::new();

        // Header: error[SW1001]: Unexpected character
        output.push_str(&format!("{}[{}]: {}\n", self.level, self.code, self.message));
        output.push_str(&format!("  --> line {}:{}\n", self.line, self.column));

        if !self.snippet.is_empty() {
            output.push_str("   |\n");
            output.push_str(&format!("{:>2} | {}\n", self.line, self.snippet));

            if self.length > 0 {
                let padding = " ".repeat(self.column.saturating_sub(1));
                let carets = "^".repeat(self.length);
                output.push_str(&format!("   | {}{}", padding, carets));
                if !self.label.is_empty() {
                    output.push_str(&format!(" {}", self.label));
                }
                output.push('\n');
            }
        }

        for note in &self.notes {
            output.push_str(&format!("   = note: {}\n", note));
        }

        if let Some(help) = &self.help {
            output.push_str(&format!("   = help: {}\n", help));
        }

        output
    }

    /// Format as JSON string
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] line {}: {}", self.code, self.line, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_takes_line_from_span() {
        let diag = Diagnostic::error_with_code("SW2000", "Expected ';'", Span::new(4, 5, 3));
        assert_eq!(diag.line, 3);
        assert_eq!(diag.length, 1);
        assert_eq!(diag.level, DiagnosticLevel::Error);
    }

    #[test]
    fn test_human_string_includes_snippet_and_help() {
        let diag = Diagnostic::error_with_code("SW1001", "Unexpected character '#'", Span::new(2, 3, 1))
            .with_column(3)
            .with_snippet("a # b")
            .with_label("here")
            .with_help("remove it");
        let text = diag.to_human_string();
        assert!(text.starts_with("error[SW1001]: Unexpected character '#'"));
        assert!(text.contains(" 1 | a # b"));
        assert!(text.contains("   |   ^ here"));
        assert!(text.contains("= help: remove it"));
    }

    #[test]
    fn test_display_is_single_line() {
        let diag = Diagnostic::warning_with_code("SW3001", "odd", Span::new(0, 1, 7));
        assert_eq!(diag.to_string(), "[SW3001] line 7: odd");
        assert_eq!(diag.level, DiagnosticLevel::Warning);
    }
}
