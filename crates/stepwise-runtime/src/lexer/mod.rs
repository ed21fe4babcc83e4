//! Tokenizer for the traced language subset
//!
//! Produces the whole token stream up front, ending in `Eof`. Problems are
//! reported as `Error` tokens plus a [`Diagnostic`] so the parser can keep
//! going. Every token carries its line: probes report the line of the
//! construct they were derived from.

use crate::diagnostic::Diagnostic;
use crate::span::Span;
use crate::token::{Token, TokenKind};

mod literals;

/// Operators and punctuation, longest spelling first so that scanning can
/// take the first entry that matches.
const PUNCTUATORS: &[(&str, TokenKind)] = &[
    ("===", TokenKind::EqualEqualEqual),
    ("!==", TokenKind::BangEqualEqual),
    ("==", TokenKind::EqualEqual),
    ("!=", TokenKind::BangEqual),
    ("=>", TokenKind::FatArrow),
    ("<=", TokenKind::LessEqual),
    (">=", TokenKind::GreaterEqual),
    ("&&", TokenKind::AmpAmp),
    ("||", TokenKind::PipePipe),
    ("++", TokenKind::PlusPlus),
    ("--", TokenKind::MinusMinus),
    ("+=", TokenKind::PlusEqual),
    ("-=", TokenKind::MinusEqual),
    ("*=", TokenKind::StarEqual),
    ("/=", TokenKind::SlashEqual),
    ("%=", TokenKind::PercentEqual),
    ("(", TokenKind::LeftParen),
    (")", TokenKind::RightParen),
    ("{", TokenKind::LeftBrace),
    ("}", TokenKind::RightBrace),
    ("[", TokenKind::LeftBracket),
    ("]", TokenKind::RightBracket),
    (";", TokenKind::Semicolon),
    (",", TokenKind::Comma),
    (":", TokenKind::Colon),
    ("?", TokenKind::Question),
    (".", TokenKind::Dot),
    ("=", TokenKind::Equal),
    ("!", TokenKind::Bang),
    ("<", TokenKind::Less),
    (">", TokenKind::Greater),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
];

/// A point in the source: character offset plus 1-indexed line and column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    offset: usize,
    line: u32,
    column: u32,
}

impl Cursor {
    const START: Cursor = Cursor {
        offset: 0,
        line: 1,
        column: 1,
    };
}

pub struct Lexer {
    source: String,
    chars: Vec<char>,
    /// Next character to read
    pos: Cursor,
    /// First character of the token being scanned
    start: Cursor,
    diagnostics: Vec<Diagnostic>,
}

impl Lexer {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let chars = source.chars().collect();
        Self {
            source,
            chars,
            pos: Cursor::START,
            start: Cursor::START,
            diagnostics: Vec::new(),
        }
    }

    /// Tokenize the whole source; the last token is always `Eof`
    pub fn tokenize(&mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        (tokens, std::mem::take(&mut self.diagnostics))
    }

    fn next_token(&mut self) -> Token {
        self.skip_trivia();
        self.start = self.pos;

        let Some(c) = self.peek() else {
            return self.token(TokenKind::Eof, "");
        };

        if c == '"' || c == '\'' {
            self.bump();
            self.string(c)
        } else if c.is_ascii_digit() {
            self.number()
        } else if is_ident_start(c) {
            self.identifier()
        } else {
            self.punctuator(c)
        }
    }

    fn punctuator(&mut self, c: char) -> Token {
        let found = PUNCTUATORS
            .iter()
            .find(|(text, _)| self.rest_starts_with(text));
        if let Some(&(text, kind)) = found {
            for _ in 0..text.chars().count() {
                self.bump();
            }
            return self.token(kind, text);
        }

        self.bump();
        match c {
            '&' | '|' => self.fail(
                "SW1001",
                &format!(
                    "Unexpected character '{}' (bitwise operators are not supported)",
                    c
                ),
            ),
            _ => self.fail("SW1001", &format!("Unexpected character '{}'", c)),
        }
    }

    /// Whitespace, `// line` and `/* block */` comments
    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_at(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('/'), Some('/')) => {
                    self.eat_while(|c| c != '\n');
                }
                (Some('/'), Some('*')) => self.block_comment(),
                _ => return,
            }
        }
    }

    fn block_comment(&mut self) {
        let opened = self.pos;
        self.bump();
        self.bump();
        while self.peek().is_some() {
            if self.rest_starts_with("*/") {
                self.bump();
                self.bump();
                return;
            }
            self.bump();
        }

        let span = Span::new(opened.offset, self.pos.offset, opened.line);
        let snippet = self.line_text(opened.line);
        self.diagnostics.push(
            Diagnostic::error_with_code("SW1004", "Unterminated multi-line comment", span)
                .with_snippet(snippet)
                .with_label("comment starts here")
                .with_help("add '*/' to close the multi-line comment"),
        );
    }

    // --- reading ---

    pub(super) fn peek(&self) -> Option<char> {
        self.peek_at(0)
    }

    pub(super) fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos.offset + ahead).copied()
    }

    /// Consume one character, keeping line and column current
    pub(super) fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos.offset += 1;
        if c == '\n' {
            self.pos.line += 1;
            self.pos.column = 1;
        } else {
            self.pos.column += 1;
        }
        Some(c)
    }

    /// Consume `expected` if it is next
    pub(super) fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(super) fn eat_while(&mut self, keep: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&keep) {
            self.bump();
        }
    }

    fn rest_starts_with(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, c)| self.peek_at(i) == Some(c))
    }

    /// Source text of the token scanned so far
    pub(super) fn lexeme(&self) -> String {
        self.chars[self.start.offset..self.pos.offset].iter().collect()
    }

    // --- producing ---

    fn span(&self) -> Span {
        Span {
            start: self.start.offset,
            end: self.pos.offset,
            line: self.start.line,
            end_line: self.pos.line,
        }
    }

    pub(super) fn token(&self, kind: TokenKind, lexeme: &str) -> Token {
        Token::new(kind, lexeme, self.span())
    }

    /// Record a diagnostic for the current token and return an `Error` token
    pub(super) fn fail(&mut self, code: &str, message: &str) -> Token {
        let mut span = self.span();
        span.end = span.end.max(span.start + 1);
        let snippet = self.line_text(self.start.line);
        self.diagnostics.push(
            Diagnostic::error_with_code(code, message, span)
                .with_column(self.start.column as usize)
                .with_snippet(snippet)
                .with_label("lexer error"),
        );
        Token::new(TokenKind::Error, message, span)
    }

    fn line_text(&self, line: u32) -> String {
        self.source
            .lines()
            .nth(line.saturating_sub(1) as usize)
            .unwrap_or("")
            .to_string()
    }
}

pub(super) fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub(super) fn is_ident_part(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, _) = Lexer::new(source).tokenize();
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty_input() {
        let (tokens, diagnostics) = Lexer::new("").tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_punctuation() {
        assert_eq!(
            kinds("(){}[];,:.?"),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::LeftBrace,
                TokenKind::RightBrace,
                TokenKind::LeftBracket,
                TokenKind::RightBracket,
                TokenKind::Semicolon,
                TokenKind::Comma,
                TokenKind::Colon,
                TokenKind::Dot,
                TokenKind::Question,
                TokenKind::Eof,
            ]
        );
    }

    #[rstest]
    #[case("===", TokenKind::EqualEqualEqual)]
    #[case("!==", TokenKind::BangEqualEqual)]
    #[case("==", TokenKind::EqualEqual)]
    #[case("=>", TokenKind::FatArrow)]
    #[case("++", TokenKind::PlusPlus)]
    #[case("%=", TokenKind::PercentEqual)]
    #[case("&&", TokenKind::AmpAmp)]
    #[case("||", TokenKind::PipePipe)]
    #[case("!", TokenKind::Bang)]
    fn test_longest_operator_wins(#[case] source: &str, #[case] kind: TokenKind) {
        assert_eq!(kinds(source), vec![kind, TokenKind::Eof]);
    }

    #[test]
    fn test_operators_without_spaces() {
        assert_eq!(
            kinds("i++<=n"),
            vec![
                TokenKind::Identifier,
                TokenKind::PlusPlus,
                TokenKind::LessEqual,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("a // line\n/* block\n comment */ b"),
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn test_line_tracking() {
        let (tokens, _) = Lexer::new("let x;\n/* two\nlines */\nx = 1;").tokenize();
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[3].lexeme, "x");
        assert_eq!(tokens[3].span.line, 4);
    }

    #[test]
    fn test_unterminated_comment_reports_diagnostic() {
        let (_, diagnostics) = Lexer::new("/* never closed").tokenize();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "SW1004");
    }

    #[rstest]
    #[case("a # b", "Unexpected character '#'")]
    #[case("a & b", "Unexpected character '&' (bitwise operators are not supported)")]
    fn test_unexpected_character(#[case] source: &str, #[case] message: &str) {
        let (tokens, diagnostics) = Lexer::new(source).tokenize();
        assert_eq!(tokens[1].kind, TokenKind::Error);
        assert_eq!(diagnostics[0].code, "SW1001");
        assert_eq!(diagnostics[0].message, message);
        assert_eq!(diagnostics[0].column, 3);
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
    }
}
