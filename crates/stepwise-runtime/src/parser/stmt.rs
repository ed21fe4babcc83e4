//! Statement parsing

use crate::ast::*;
use crate::parser::Parser;
use crate::span::Span;
use crate::token::TokenKind;

impl Parser {
    /// Parse a statement
    pub(super) fn parse_statement(&mut self) -> Result<Stmt, ()> {
        match self.peek().kind {
            TokenKind::LeftBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Let | TokenKind::Const | TokenKind::Var => {
                let decl = self.parse_var_decl()?;
                self.consume_semicolon("variable declaration")?;
                Ok(Stmt::VarDecl(decl))
            }
            TokenKind::Function if self.peek_at(1).kind == TokenKind::Identifier => {
                Ok(Stmt::FunctionDecl(self.parse_function()?))
            }
            TokenKind::Class => self.parse_class(),
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::While => self.parse_while_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Return => self.parse_return_stmt(),
            TokenKind::Break => self.parse_jump_stmt(TokenKind::Break),
            TokenKind::Continue => self.parse_jump_stmt(TokenKind::Continue),
            TokenKind::Throw => self.parse_throw_stmt(),
            TokenKind::Semicolon => {
                let span = self.advance().span;
                Ok(Stmt::Empty(span))
            }
            TokenKind::Identifier if self.peek_at(1).kind == TokenKind::Colon => {
                self.parse_labeled_stmt()
            }
            _ => {
                let stmt = self.parse_simple_stmt()?;
                self.consume_semicolon("expression")?;
                Ok(stmt)
            }
        }
    }

    /// Parse a braced block
    pub(super) fn parse_block(&mut self) -> Result<Block, ()> {
        let start_span = self.consume(TokenKind::LeftBrace, "Expected '{'")?.span;
        let mut statements = Vec::new();

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        let end_span = self.consume(TokenKind::RightBrace, "Expected '}' after block")?.span;

        Ok(Block {
            statements,
            span: start_span.merge(end_span),
        })
    }

    /// Parse `let|const|var` declarators (no terminator)
    fn parse_var_decl(&mut self) -> Result<VarDecl, ()> {
        let keyword = self.advance();
        let kind = match keyword.kind {
            TokenKind::Let => DeclKind::Let,
            TokenKind::Const => DeclKind::Const,
            _ => DeclKind::Var,
        };
        let start_span = keyword.span;
        let first = self.consume_identifier("a variable name")?;
        self.finish_var_decl(kind, start_span, first)
    }

    /// Parse the declarators after the first bound name
    fn finish_var_decl(
        &mut self,
        kind: DeclKind,
        start_span: Span,
        first: Identifier,
    ) -> Result<VarDecl, ()> {
        let mut declarators = Vec::new();
        let mut name = first;

        loop {
            let init = if self.match_token(TokenKind::Equal) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            let span = init
                .as_ref()
                .map(|e| name.span.merge(e.span()))
                .unwrap_or(name.span);
            declarators.push(Declarator { name, init, span });

            if !self.match_token(TokenKind::Comma) {
                break;
            }
            name = self.consume_identifier("a variable name")?;
        }

        let end_span = self.previous().span;
        Ok(VarDecl {
            kind,
            declarators,
            span: start_span.merge(end_span),
        })
    }

    /// Parse a function declaration
    pub(super) fn parse_function(&mut self) -> Result<Function, ()> {
        let fn_span = self.consume(TokenKind::Function, "Expected 'function'")?.span;
        let name = if self.check(TokenKind::Identifier) {
            Some(self.consume_identifier("a function name")?)
        } else {
            None
        };
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        let end_span = body.span;

        Ok(Function {
            name,
            params,
            body: FunctionBody::Block(body),
            is_arrow: false,
            span: fn_span.merge(end_span),
        })
    }

    /// Parse `(a, b, c)`
    pub(super) fn parse_params(&mut self) -> Result<Vec<Identifier>, ()> {
        self.consume(TokenKind::LeftParen, "Expected '(' before parameters")?;
        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                params.push(self.consume_identifier("a parameter name")?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expected ')' after parameters")?;
        Ok(params)
    }

    /// Parse a class declaration
    fn parse_class(&mut self) -> Result<Stmt, ()> {
        let class_span = self.consume(TokenKind::Class, "Expected 'class'")?.span;
        let name = self.consume_identifier("a class name")?;
        self.consume(TokenKind::LeftBrace, "Expected '{' after class name")?;

        let mut methods = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if self.match_token(TokenKind::Semicolon) {
                continue;
            }
            let method_name = self.consume_property_name("a method name")?;
            let params = self.parse_params()?;
            let body = self.parse_block()?;
            let span = method_name.span.merge(body.span);
            methods.push(Method {
                name: method_name,
                function: Function {
                    name: None,
                    params,
                    body: FunctionBody::Block(body),
                    is_arrow: false,
                    span,
                },
                span,
            });
        }

        let end_span = self.consume(TokenKind::RightBrace, "Expected '}' after class body")?.span;
        Ok(Stmt::ClassDecl(ClassDecl {
            name,
            methods,
            span: class_span.merge(end_span),
        }))
    }

    /// Parse an if statement
    fn parse_if_stmt(&mut self) -> Result<Stmt, ()> {
        let if_span = self.consume(TokenKind::If, "Expected 'if'")?.span;
        self.consume(TokenKind::LeftParen, "Expected '(' after 'if'")?;
        let cond = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition")?;

        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.match_token(TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        let end_span = else_branch
            .as_ref()
            .map(|s| s.span())
            .unwrap_or_else(|| then_branch.span());

        Ok(Stmt::If(IfStmt {
            cond,
            then_branch,
            else_branch,
            span: if_span.merge(end_span),
        }))
    }

    /// Parse a while loop
    fn parse_while_stmt(&mut self) -> Result<Stmt, ()> {
        let while_span = self.consume(TokenKind::While, "Expected 'while'")?.span;
        self.consume(TokenKind::LeftParen, "Expected '(' after 'while'")?;
        let cond = self.parse_expression()?;
        self.consume(TokenKind::RightParen, "Expected ')' after condition")?;
        let body = self.parse_statement()?;
        let span = while_span.merge(body.span());

        Ok(Stmt::While(WhileStmt {
            cond,
            body: Box::new(body),
            span,
        }))
    }

    /// Parse a classic `for` loop or a `for-of` loop
    fn parse_for_stmt(&mut self) -> Result<Stmt, ()> {
        let for_span = self.consume(TokenKind::For, "Expected 'for'")?.span;
        self.consume(TokenKind::LeftParen, "Expected '(' after 'for'")?;

        let init = if self.check(TokenKind::Semicolon) {
            None
        } else if matches!(
            self.peek().kind,
            TokenKind::Let | TokenKind::Const | TokenKind::Var
        ) {
            let keyword = self.advance();
            let kind = match keyword.kind {
                TokenKind::Let => DeclKind::Let,
                TokenKind::Const => DeclKind::Const,
                _ => DeclKind::Var,
            };
            let start_span = keyword.span;
            let binding = self.consume_identifier("a loop variable")?;

            if self.match_token(TokenKind::Of) {
                let iterable = self.parse_expression()?;
                self.consume(TokenKind::RightParen, "Expected ')' after for-of header")?;
                let body = self.parse_statement()?;
                let span = for_span.merge(body.span());
                return Ok(Stmt::ForOf(ForOfStmt {
                    kind,
                    binding,
                    iterable,
                    body: Box::new(body),
                    span,
                }));
            }

            Some(Box::new(Stmt::VarDecl(
                self.finish_var_decl(kind, start_span, binding)?,
            )))
        } else {
            Some(Box::new(self.parse_simple_stmt()?))
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after for-loop initializer")?;

        let cond = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expected ';' after for-loop condition")?;

        let update = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(Box::new(self.parse_simple_stmt()?))
        };
        self.consume(TokenKind::RightParen, "Expected ')' after for-loop clauses")?;

        let body = self.parse_statement()?;
        let span = for_span.merge(body.span());

        Ok(Stmt::For(ForStmt {
            init,
            cond,
            update,
            body: Box::new(body),
            span,
        }))
    }

    /// Parse a return statement
    fn parse_return_stmt(&mut self) -> Result<Stmt, ()> {
        let return_span = self.consume(TokenKind::Return, "Expected 'return'")?.span;

        // A value must start on the same line as `return`
        let next = self.peek();
        let value = if next.kind == TokenKind::Semicolon
            || next.kind == TokenKind::RightBrace
            || next.kind == TokenKind::Eof
            || next.span.line > return_span.end_line
        {
            None
        } else {
            Some(self.parse_expression()?)
        };

        let span = value
            .as_ref()
            .map(|v| return_span.merge(v.span()))
            .unwrap_or(return_span);
        self.consume_semicolon("return statement")?;

        Ok(Stmt::Return(ReturnStmt { value, span }))
    }

    /// Parse `break` or `continue` with an optional label
    fn parse_jump_stmt(&mut self, kind: TokenKind) -> Result<Stmt, ()> {
        let keyword_span = self.advance().span;
        let label = if self.check(TokenKind::Identifier)
            && self.peek().span.line == keyword_span.end_line
        {
            Some(self.consume_identifier("a label")?)
        } else {
            None
        };
        let span = label
            .as_ref()
            .map(|l| keyword_span.merge(l.span))
            .unwrap_or(keyword_span);
        self.consume_semicolon(kind.as_str())?;

        let jump = JumpStmt { label, span };
        Ok(if kind == TokenKind::Break {
            Stmt::Break(jump)
        } else {
            Stmt::Continue(jump)
        })
    }

    /// Parse a throw statement
    fn parse_throw_stmt(&mut self) -> Result<Stmt, ()> {
        let throw_span = self.consume(TokenKind::Throw, "Expected 'throw'")?.span;
        let value = self.parse_expression()?;
        let span = throw_span.merge(value.span());
        self.consume_semicolon("throw statement")?;
        Ok(Stmt::Throw(ThrowStmt { value, span }))
    }

    /// Parse `label: statement`
    fn parse_labeled_stmt(&mut self) -> Result<Stmt, ()> {
        let label = self.consume_identifier("a label")?;
        self.consume(TokenKind::Colon, "Expected ':' after label")?;
        let body = self.parse_statement()?;
        let span = label.span.merge(body.span());
        Ok(Stmt::Labeled(LabeledStmt {
            label,
            body: Box::new(body),
            span,
        }))
    }

    /// Parse an assignment, update or expression statement (no terminator)
    ///
    /// Assignments are statements in this language, so they are recognised after
    /// the left-hand side has been parsed as an ordinary expression.
    pub(super) fn parse_simple_stmt(&mut self) -> Result<Stmt, ()> {
        if matches!(self.peek().kind, TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let op_token = self.advance();
            let op_span = op_token.span;
            let op = if op_token.kind == TokenKind::PlusPlus {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            let operand = self.parse_precedence(super::Precedence::Unary)?;
            let span = op_span.merge(operand.span());
            let target = self.expr_to_assign_target(operand)?;
            return Ok(Stmt::Update(UpdateStmt {
                target,
                op,
                prefix: true,
                span,
            }));
        }

        let expr = self.parse_expression()?;

        let assign_op = match self.peek().kind {
            TokenKind::Equal => Some(AssignOp::Assign),
            TokenKind::PlusEqual => Some(AssignOp::Add),
            TokenKind::MinusEqual => Some(AssignOp::Sub),
            TokenKind::StarEqual => Some(AssignOp::Mul),
            TokenKind::SlashEqual => Some(AssignOp::Div),
            TokenKind::PercentEqual => Some(AssignOp::Mod),
            _ => None,
        };

        if let Some(op) = assign_op {
            self.advance();
            let value = self.parse_expression()?;
            let span = expr.span().merge(value.span());
            let target = self.expr_to_assign_target(expr)?;
            return Ok(Stmt::Assign(AssignStmt {
                target,
                op,
                value,
                span,
            }));
        }

        if matches!(self.peek().kind, TokenKind::PlusPlus | TokenKind::MinusMinus) {
            let op_token = self.advance();
            let op = if op_token.kind == TokenKind::PlusPlus {
                UpdateOp::Increment
            } else {
                UpdateOp::Decrement
            };
            let span = expr.span().merge(op_token.span);
            let target = self.expr_to_assign_target(expr)?;
            return Ok(Stmt::Update(UpdateStmt {
                target,
                op,
                prefix: false,
                span,
            }));
        }

        Ok(Stmt::expr(expr))
    }

    /// Validate the left-hand side of an assignment
    fn expr_to_assign_target(&mut self, expr: Expr) -> Result<AssignTarget, ()> {
        match AssignTarget::from_expr(expr) {
            Some(target) => Ok(target),
            None => {
                self.error("Invalid assignment target");
                Err(())
            }
        }
    }
}
