//! Parsing (tokens to AST)
//!
//! The parser converts a stream of tokens into an Abstract Syntax Tree (AST).
//! Uses Pratt parsing for expressions and recursive descent for statements.

mod expr;
mod stmt;

use crate::ast::*;
use crate::diagnostic::Diagnostic;
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

/// Lex and parse `source`, failing on the first batch of diagnostics
pub fn parse_source(source: &str) -> Result<Program, Vec<Diagnostic>> {
    let (tokens, lex_diagnostics) = Lexer::new(source).tokenize();
    if !lex_diagnostics.is_empty() {
        return Err(lex_diagnostics);
    }
    let (program, diagnostics) = Parser::new(tokens).parse();
    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }
    Ok(program)
}

/// Parser state for building AST from tokens
pub struct Parser {
    pub(super) tokens: Vec<Token>,
    pub(super) current: usize,
    pub(super) diagnostics: Vec<Diagnostic>,
}

/// Operator precedence levels for Pratt parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(super) enum Precedence {
    Lowest,
    Conditional, // ?:
    Or,          // ||
    And,         // &&
    Equality,    // == != === !==
    Comparison,  // < <= > >=
    Term,        // + -
    Factor,      // * / %
    Unary,       // ! - + typeof
    Call,        // () [] .
}

impl Parser {
    /// Create a new parser for the given tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        let mut tokens = tokens;
        if tokens.last().map(|t| t.kind) != Some(TokenKind::Eof) {
            let span = tokens.last().map(|t| t.span).unwrap_or_default();
            tokens.push(Token::new(TokenKind::Eof, "", span));
        }
        Self {
            tokens,
            current: 0,
            diagnostics: Vec::new(),
        }
    }

    /// Parse tokens into an AST
    pub fn parse(&mut self) -> (Program, Vec<Diagnostic>) {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(_) => self.synchronize(),
            }
        }

        (Program { statements }, std::mem::take(&mut self.diagnostics))
    }

    // === Helper methods ===

    /// Advance to next token and return reference to previous
    pub(super) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        &self.tokens[self.current - 1]
    }

    /// Peek at current token
    pub(super) fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    /// Peek `offset` tokens ahead (clamped to EOF)
    pub(super) fn peek_at(&self, offset: usize) -> &Token {
        let index = (self.current + offset).min(self.tokens.len() - 1);
        &self.tokens[index]
    }

    /// The token consumed most recently
    pub(super) fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Check if current token matches kind
    pub(super) fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    /// Match and consume token if it matches
    pub(super) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume token of given kind or error
    pub(super) fn consume(&mut self, kind: TokenKind, message: &str) -> Result<&Token, ()> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            self.error(message);
            Err(())
        }
    }

    /// Statement terminator with automatic insertion before `}`, EOF or a line break
    pub(super) fn consume_semicolon(&mut self, context: &str) -> Result<(), ()> {
        if self.match_token(TokenKind::Semicolon) {
            return Ok(());
        }
        let next = self.peek();
        if next.kind == TokenKind::RightBrace
            || next.kind == TokenKind::Eof
            || next.span.line > self.previous().span.end_line
        {
            return Ok(());
        }
        self.error(&format!("Expected ';' after {}", context));
        Err(())
    }

    /// Check if at end of token stream
    pub(super) fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len() || self.tokens[self.current].kind == TokenKind::Eof
    }

    /// Record an error
    pub(super) fn error(&mut self, message: &str) {
        let token = self.peek();
        let found = if token.kind == TokenKind::Eof {
            "end of input".to_string()
        } else {
            format!("'{}'", token.lexeme)
        };
        let span = token.span;
        self.diagnostics.push(
            Diagnostic::error_with_code("SW2000", message, span)
                .with_label("syntax error")
                .with_note(format!("found {}", found))
                .with_help("check your syntax for typos or missing tokens"),
        );
    }

    /// Consume an identifier token with a better error message for keywords
    pub(super) fn consume_identifier(&mut self, context: &str) -> Result<Identifier, ()> {
        let current = self.peek();

        if current.kind == TokenKind::Identifier {
            let token = self.advance();
            Ok(Identifier::new(token.lexeme.clone(), token.span))
        } else if current.kind.is_word() {
            let keyword = current.lexeme.clone();
            self.error(&format!("Cannot use reserved keyword '{}' as {}", keyword, context));
            Err(())
        } else {
            let found = current.kind;
            self.error(&format!("Expected {} but found '{}'", context, found));
            Err(())
        }
    }

    /// Property and method names may be keywords (`list.of`, `obj.new`)
    pub(super) fn consume_property_name(&mut self, context: &str) -> Result<Identifier, ()> {
        let current = self.peek();
        if current.kind == TokenKind::Identifier || current.kind.is_word() {
            let token = self.advance();
            Ok(Identifier::new(token.lexeme.clone(), token.span))
        } else {
            self.error(&format!("Expected {}", context));
            Err(())
        }
    }

    /// Synchronize after error
    pub(super) fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.tokens[self.current - 1].kind == TokenKind::Semicolon {
                return;
            }

            match self.peek().kind {
                TokenKind::Function
                | TokenKind::Class
                | TokenKind::Let
                | TokenKind::Const
                | TokenKind::Var
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}
