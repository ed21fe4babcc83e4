//! String, number and identifier scanning

use super::{is_ident_part, Lexer};
use crate::token::{Token, TokenKind};

impl Lexer {
    /// Scan the rest of a string literal; the opening `quote` is consumed
    ///
    /// After an invalid escape the literal is still read to its end so
    /// scanning resumes after it. The first bad escape is reported.
    pub(super) fn string(&mut self, quote: char) -> Token {
        let mut value = String::new();
        let mut bad_escape = None;

        loop {
            match self.peek() {
                None | Some('\n') => {
                    return self.fail("SW1002", "Unterminated string literal");
                }
                Some(c) if c == quote => break,
                Some('\\') => {
                    self.bump();
                    let Some(escape) = self.bump() else {
                        return self.fail("SW1002", "Unterminated string literal");
                    };
                    match unescape(escape) {
                        Some(c) => value.push(c),
                        None if bad_escape.is_none() => {
                            let message = format!("Invalid escape sequence '\\{}'", escape);
                            bad_escape = Some(self.fail("SW1003", &message));
                        }
                        None => {}
                    }
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
            }
        }
        self.bump();

        bad_escape.unwrap_or_else(|| self.token(TokenKind::String, &value))
    }

    /// Integer, decimal or exponent form; `1.foo` stops before the dot
    pub(super) fn number(&mut self) -> Token {
        self.eat_while(|c| c.is_ascii_digit());

        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }

        if self.eat('e') || self.eat('E') {
            let _ = self.eat('+') || self.eat('-');
            if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return self.fail("SW1005", "Invalid number: exponent requires digits");
            }
            self.eat_while(|c| c.is_ascii_digit());
        }

        let lexeme = self.lexeme();
        self.token(TokenKind::Number, &lexeme)
    }

    pub(super) fn identifier(&mut self) -> Token {
        self.eat_while(is_ident_part);
        let lexeme = self.lexeme();
        let kind = TokenKind::is_keyword(&lexeme).unwrap_or(TokenKind::Identifier);
        self.token(kind, &lexeme)
    }
}

fn unescape(c: char) -> Option<char> {
    match c {
        'n' => Some('\n'),
        'r' => Some('\r'),
        't' => Some('\t'),
        '0' => Some('\0'),
        '\\' | '"' | '\'' => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::lexer::Lexer;
    use crate::token::TokenKind;
    use rstest::rstest;

    #[rstest]
    #[case(r#""hello""#, "hello")]
    #[case("'single'", "single")]
    #[case(r#""tab\there""#, "tab\there")]
    #[case(r#"'it\'s'"#, "it's")]
    #[case(r#""say \"hi\"""#, "say \"hi\"")]
    fn test_string_literals(#[case] source: &str, #[case] expected: &str) {
        let mut lexer = Lexer::new(source);
        let (tokens, diagnostics) = lexer.tokenize();
        assert!(diagnostics.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].lexeme, expected);
    }

    #[test]
    fn test_unterminated_string() {
        let mut lexer = Lexer::new("\"open\nlet");
        let (tokens, diagnostics) = lexer.tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(diagnostics[0].code, "SW1002");
    }

    #[test]
    fn test_invalid_escape() {
        let mut lexer = Lexer::new(r#""bad \q escape""#);
        let (tokens, diagnostics) = lexer.tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Error);
        assert_eq!(diagnostics[0].code, "SW1003");
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }

    #[rstest]
    #[case("42", "42")]
    #[case("3.14", "3.14")]
    #[case("1e10", "1e10")]
    #[case("1.5e-3", "1.5e-3")]
    fn test_numbers(#[case] source: &str, #[case] lexeme: &str) {
        let mut lexer = Lexer::new(source);
        let (tokens, _) = lexer.tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].lexeme, lexeme);
    }

    #[test]
    fn test_member_access_after_number_is_not_a_decimal() {
        let mut lexer = Lexer::new("1.toString");
        let (tokens, _) = lexer.tokenize();
        assert_eq!(tokens[0].lexeme, "1");
        assert_eq!(tokens[1].kind, TokenKind::Dot);
    }

    #[test]
    fn test_identifiers_and_keywords() {
        let mut lexer = Lexer::new("foo $bar _baz const of");
        let (tokens, _) = lexer.tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].lexeme, "$bar");
        assert_eq!(tokens[2].kind, TokenKind::Identifier);
        assert_eq!(tokens[3].kind, TokenKind::Const);
        assert_eq!(tokens[4].kind, TokenKind::Of);
    }
}
