//! Token types for lexical analysis
//!
//! Defines all token types recognized by the Stepwise lexer.

use crate::span::Span;
use serde::{Deserialize, Serialize};

/// Token type produced by the lexer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The source text of this token (unescaped contents for strings)
    pub lexeme: String,
    /// Source location
    pub span: Span,
}

impl Token {
    /// Create a new token
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            span,
        }
    }
}

/// Classification of token types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // Literals
    /// Number literal (42, 3.14, 1e3)
    Number,
    /// String literal ("hello" or 'hello')
    String,
    /// `true` keyword
    True,
    /// `false` keyword
    False,
    /// `null` keyword
    Null,
    /// `undefined` keyword
    Undefined,
    /// Identifier
    Identifier,

    // Keywords
    /// `let` keyword
    Let,
    /// `const` keyword
    Const,
    /// `var` keyword
    Var,
    /// `function` keyword
    Function,
    /// `return` keyword
    Return,
    /// `if` keyword
    If,
    /// `else` keyword
    Else,
    /// `while` keyword
    While,
    /// `for` keyword
    For,
    /// `of` keyword (only meaningful inside a for header)
    Of,
    /// `break` keyword
    Break,
    /// `continue` keyword
    Continue,
    /// `class` keyword
    Class,
    /// `new` keyword
    New,
    /// `this` keyword
    This,
    /// `typeof` keyword
    Typeof,
    /// `throw` keyword
    Throw,

    // Operators
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `!`
    Bang,
    /// `=`
    Equal,
    /// `==`
    EqualEqual,
    /// `===`
    EqualEqualEqual,
    /// `!=`
    BangEqual,
    /// `!==`
    BangEqualEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,
    /// `&&`
    AmpAmp,
    /// `||`
    PipePipe,
    /// `++`
    PlusPlus,
    /// `--`
    MinusMinus,
    /// `+=`
    PlusEqual,
    /// `-=`
    MinusEqual,
    /// `*=`
    StarEqual,
    /// `/=`
    SlashEqual,
    /// `%=`
    PercentEqual,
    /// `=>`
    FatArrow,

    // Punctuation
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `:`
    Colon,
    /// `?`
    Question,

    // Special
    /// End of file
    Eof,
    /// Lexer error
    Error,
}

impl TokenKind {
    /// Check if an identifier is a keyword
    pub fn is_keyword(s: &str) -> Option<TokenKind> {
        match s {
            "let" => Some(TokenKind::Let),
            "const" => Some(TokenKind::Const),
            "var" => Some(TokenKind::Var),
            "function" => Some(TokenKind::Function),
            "return" => Some(TokenKind::Return),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "while" => Some(TokenKind::While),
            "for" => Some(TokenKind::For),
            "of" => Some(TokenKind::Of),
            "break" => Some(TokenKind::Break),
            "continue" => Some(TokenKind::Continue),
            "class" => Some(TokenKind::Class),
            "new" => Some(TokenKind::New),
            "this" => Some(TokenKind::This),
            "typeof" => Some(TokenKind::Typeof),
            "throw" => Some(TokenKind::Throw),
            "true" => Some(TokenKind::True),
            "false" => Some(TokenKind::False),
            "null" => Some(TokenKind::Null),
            "undefined" => Some(TokenKind::Undefined),
            _ => None,
        }
    }

    /// Keywords that may still be used as property names and method names
    pub fn is_word(&self) -> bool {
        Self::is_keyword(self.as_str()).is_some()
    }

    /// Get the string representation of this token kind
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Undefined => "undefined",
            TokenKind::Identifier => "identifier",
            TokenKind::Let => "let",
            TokenKind::Const => "const",
            TokenKind::Var => "var",
            TokenKind::Function => "function",
            TokenKind::Return => "return",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::For => "for",
            TokenKind::Of => "of",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Class => "class",
            TokenKind::New => "new",
            TokenKind::This => "this",
            TokenKind::Typeof => "typeof",
            TokenKind::Throw => "throw",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Percent => "%",
            TokenKind::Bang => "!",
            TokenKind::Equal => "=",
            TokenKind::EqualEqual => "==",
            TokenKind::EqualEqualEqual => "===",
            TokenKind::BangEqual => "!=",
            TokenKind::BangEqualEqual => "!==",
            TokenKind::Less => "<",
            TokenKind::LessEqual => "<=",
            TokenKind::Greater => ">",
            TokenKind::GreaterEqual => ">=",
            TokenKind::AmpAmp => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::PlusEqual => "+=",
            TokenKind::MinusEqual => "-=",
            TokenKind::StarEqual => "*=",
            TokenKind::SlashEqual => "/=",
            TokenKind::PercentEqual => "%=",
            TokenKind::FatArrow => "=>",
            TokenKind::LeftParen => "(",
            TokenKind::RightParen => ")",
            TokenKind::LeftBrace => "{",
            TokenKind::RightBrace => "}",
            TokenKind::LeftBracket => "[",
            TokenKind::RightBracket => "]",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Dot => ".",
            TokenKind::Colon => ":",
            TokenKind::Question => "?",
            TokenKind::Eof => "EOF",
            TokenKind::Error => "error",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = Token::new(TokenKind::Number, "42", Span::new(0, 2, 1));
        assert_eq!(token.kind, TokenKind::Number);
        assert_eq!(token.lexeme, "42");
        assert_eq!(token.span, Span::new(0, 2, 1));
    }

    #[test]
    fn test_keyword_detection() {
        assert_eq!(TokenKind::is_keyword("let"), Some(TokenKind::Let));
        assert_eq!(TokenKind::is_keyword("const"), Some(TokenKind::Const));
        assert_eq!(TokenKind::is_keyword("function"), Some(TokenKind::Function));
        assert_eq!(TokenKind::is_keyword("class"), Some(TokenKind::Class));
        assert_eq!(TokenKind::is_keyword("of"), Some(TokenKind::Of));
        assert_eq!(TokenKind::is_keyword("undefined"), Some(TokenKind::Undefined));
        assert_eq!(TokenKind::is_keyword("console"), None);
    }

    #[test]
    fn test_keywords_are_words() {
        assert!(TokenKind::New.is_word());
        assert!(TokenKind::Of.is_word());
        assert!(!TokenKind::Plus.is_word());
        assert!(!TokenKind::Identifier.is_word());
    }
}
