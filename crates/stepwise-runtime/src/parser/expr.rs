//! Expression parsing (Pratt parsing)

use crate::ast::*;
use crate::parser::{Parser, Precedence};
use crate::span::Span;
use crate::token::TokenKind;

impl Parser {
    /// Parse an expression
    pub(super) fn parse_expression(&mut self) -> Result<Expr, ()> {
        self.parse_precedence(Precedence::Lowest)
    }

    /// Parse expression with given precedence
    pub(super) fn parse_precedence(&mut self, precedence: Precedence) -> Result<Expr, ()> {
        let mut left = self.parse_prefix()?;

        while precedence < self.current_precedence() {
            left = self.parse_infix(left)?;
        }

        Ok(left)
    }

    /// Parse prefix expression
    fn parse_prefix(&mut self) -> Result<Expr, ()> {
        match self.peek().kind {
            TokenKind::Number => self.parse_number(),
            TokenKind::String => {
                let token = self.advance();
                Ok(Expr::string(token.lexeme.clone(), token.span))
            }
            TokenKind::True | TokenKind::False => {
                let token = self.advance();
                Ok(Expr::Literal(
                    Literal::Bool(token.kind == TokenKind::True),
                    token.span,
                ))
            }
            TokenKind::Null => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Null, span))
            }
            TokenKind::Undefined => {
                let span = self.advance().span;
                Ok(Expr::Literal(Literal::Undefined, span))
            }
            TokenKind::This => {
                let span = self.advance().span;
                Ok(Expr::This(span))
            }
            TokenKind::Identifier => {
                if self.peek_at(1).kind == TokenKind::FatArrow {
                    return self.parse_arrow_function();
                }
                let token = self.advance();
                Ok(Expr::ident(token.lexeme.clone(), token.span))
            }
            TokenKind::LeftParen => {
                if self.is_arrow_ahead() {
                    self.parse_arrow_function()
                } else {
                    self.parse_group()
                }
            }
            TokenKind::LeftBracket => self.parse_array_literal(),
            TokenKind::LeftBrace => self.parse_object_literal(),
            TokenKind::Function => {
                let function = self.parse_function()?;
                Ok(Expr::Function(Box::new(function)))
            }
            TokenKind::New => self.parse_new(),
            TokenKind::Minus | TokenKind::Plus | TokenKind::Bang | TokenKind::Typeof => {
                self.parse_unary()
            }
            _ => {
                self.error("Expected expression");
                Err(())
            }
        }
    }

    /// Parse infix expression
    fn parse_infix(&mut self, left: Expr) -> Result<Expr, ()> {
        match self.peek().kind {
            TokenKind::LeftParen => self.parse_call(left),
            TokenKind::LeftBracket => self.parse_index(left),
            TokenKind::Dot => self.parse_member(left),
            TokenKind::Question => self.parse_conditional(left),
            _ => self.parse_binary(left),
        }
    }

    /// Get current token precedence
    pub(super) fn current_precedence(&self) -> Precedence {
        Self::token_precedence(self.peek().kind)
    }

    /// Get precedence for a token kind
    fn token_precedence(kind: TokenKind) -> Precedence {
        match kind {
            TokenKind::Question => Precedence::Conditional,
            TokenKind::PipePipe => Precedence::Or,
            TokenKind::AmpAmp => Precedence::And,
            TokenKind::EqualEqual
            | TokenKind::BangEqual
            | TokenKind::EqualEqualEqual
            | TokenKind::BangEqualEqual => Precedence::Equality,
            TokenKind::Less
            | TokenKind::LessEqual
            | TokenKind::Greater
            | TokenKind::GreaterEqual => Precedence::Comparison,
            TokenKind::Plus | TokenKind::Minus => Precedence::Term,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => Precedence::Factor,
            TokenKind::LeftParen | TokenKind::LeftBracket | TokenKind::Dot => Precedence::Call,
            _ => Precedence::Lowest,
        }
    }

    /// Parse number literal
    fn parse_number(&mut self) -> Result<Expr, ()> {
        let token = self.advance();
        let span = token.span;
        match token.lexeme.parse::<f64>() {
            Ok(value) => Ok(Expr::number(value, span)),
            Err(_) => {
                self.error("Invalid number literal");
                Err(())
            }
        }
    }

    /// Parse grouped expression
    fn parse_group(&mut self) -> Result<Expr, ()> {
        let start_span = self.consume(TokenKind::LeftParen, "Expected '('")?.span;
        let expr = self.parse_expression()?;
        let end_span = self.consume(TokenKind::RightParen, "Expected ')'")?.span;

        Ok(Expr::Group(GroupExpr {
            expr: Box::new(expr),
            span: start_span.merge(end_span),
        }))
    }

    /// Whether the parenthesised list at the cursor is followed by `=>`
    fn is_arrow_ahead(&self) -> bool {
        let mut depth = 0usize;
        let mut index = self.current;
        while let Some(token) = self.tokens.get(index) {
            match token.kind {
                TokenKind::LeftParen => depth += 1,
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        return self
                            .tokens
                            .get(index + 1)
                            .map(|t| t.kind == TokenKind::FatArrow)
                            .unwrap_or(false);
                    }
                }
                TokenKind::Eof => return false,
                _ => {}
            }
            index += 1;
        }
        false
    }

    /// Parse `x => body` or `(a, b) => body`
    fn parse_arrow_function(&mut self) -> Result<Expr, ()> {
        let start_span = self.peek().span;
        let params = if self.check(TokenKind::Identifier) {
            vec![self.consume_identifier("a parameter name")?]
        } else {
            self.parse_params()?
        };
        self.consume(TokenKind::FatArrow, "Expected '=>' after arrow parameters")?;

        let body = if self.check(TokenKind::LeftBrace) {
            FunctionBody::Block(self.parse_block()?)
        } else {
            FunctionBody::Expr(Box::new(self.parse_expression()?))
        };
        let end_span = match &body {
            FunctionBody::Block(block) => block.span,
            FunctionBody::Expr(expr) => expr.span(),
        };

        Ok(Expr::Function(Box::new(Function {
            name: None,
            params,
            body,
            is_arrow: true,
            span: start_span.merge(end_span),
        })))
    }

    /// Parse array literal
    fn parse_array_literal(&mut self) -> Result<Expr, ()> {
        let start_span = self.consume(TokenKind::LeftBracket, "Expected '['")?.span;
        let mut elements = Vec::new();

        while !self.check(TokenKind::RightBracket) {
            elements.push(self.parse_expression()?);
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        let end_span = self.consume(TokenKind::RightBracket, "Expected ']'")?.span;

        Ok(Expr::Array(ArrayLiteral {
            elements,
            span: start_span.merge(end_span),
        }))
    }

    /// Parse object literal `{ a: 1, "b": 2, c }`
    fn parse_object_literal(&mut self) -> Result<Expr, ()> {
        let start_span = self.consume(TokenKind::LeftBrace, "Expected '{'")?.span;
        let mut properties = Vec::new();

        while !self.check(TokenKind::RightBrace) {
            let key_token = self.peek().clone();
            let key = match key_token.kind {
                TokenKind::String | TokenKind::Number => {
                    self.advance();
                    key_token.lexeme.clone()
                }
                _ => self.consume_property_name("a property name")?.name,
            };

            let value = if self.match_token(TokenKind::Colon) {
                self.parse_expression()?
            } else if key_token.kind == TokenKind::Identifier {
                Expr::ident(key.clone(), key_token.span)
            } else {
                self.error("Expected ':' after property name");
                return Err(());
            };

            let span = key_token.span.merge(value.span());
            properties.push(Property { key, value, span });

            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        let end_span = self.consume(TokenKind::RightBrace, "Expected '}' after object literal")?.span;

        Ok(Expr::Object(ObjectLiteral {
            properties,
            span: start_span.merge(end_span),
        }))
    }

    /// Parse `new Callee(args)`
    fn parse_new(&mut self) -> Result<Expr, ()> {
        let new_span = self.consume(TokenKind::New, "Expected 'new'")?.span;
        let name = self.consume_identifier("a class name")?;
        let mut callee = Expr::Identifier(name);

        while self.check(TokenKind::Dot) {
            callee = self.parse_member(callee)?;
        }

        let (args, end_span) = if self.check(TokenKind::LeftParen) {
            self.parse_arguments()?
        } else {
            (Vec::new(), callee.span())
        };

        Ok(Expr::New(NewExpr {
            callee: Box::new(callee),
            args,
            span: new_span.merge(end_span),
        }))
    }

    /// Parse unary expression
    fn parse_unary(&mut self) -> Result<Expr, ()> {
        let op_token = self.advance();
        let op_span = op_token.span;
        let op = match op_token.kind {
            TokenKind::Minus => UnaryOp::Negate,
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Bang => UnaryOp::Not,
            _ => UnaryOp::Typeof,
        };

        let operand = self.parse_precedence(Precedence::Unary)?;
        let operand_span = operand.span();

        Ok(Expr::Unary(UnaryExpr {
            op,
            expr: Box::new(operand),
            span: op_span.merge(operand_span),
        }))
    }

    /// Parse binary expression
    fn parse_binary(&mut self, left: Expr) -> Result<Expr, ()> {
        let left_span = left.span();
        let op_kind = self.advance().kind;
        let precedence = Self::token_precedence(op_kind);

        let op = match op_kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            TokenKind::EqualEqual => BinaryOp::Eq,
            TokenKind::BangEqual => BinaryOp::Ne,
            TokenKind::EqualEqualEqual => BinaryOp::StrictEq,
            TokenKind::BangEqualEqual => BinaryOp::StrictNe,
            TokenKind::Less => BinaryOp::Lt,
            TokenKind::LessEqual => BinaryOp::Le,
            TokenKind::Greater => BinaryOp::Gt,
            TokenKind::GreaterEqual => BinaryOp::Ge,
            TokenKind::AmpAmp => BinaryOp::And,
            TokenKind::PipePipe => BinaryOp::Or,
            _ => {
                self.error("Expected an operator");
                return Err(());
            }
        };

        let right = self.parse_precedence(precedence)?;
        let right_span = right.span();

        Ok(Expr::Binary(BinaryExpr {
            op,
            left: Box::new(left),
            right: Box::new(right),
            span: left_span.merge(right_span),
        }))
    }

    /// Parse `cond ? a : b` (right associative)
    fn parse_conditional(&mut self, cond: Expr) -> Result<Expr, ()> {
        self.consume(TokenKind::Question, "Expected '?'")?;
        let then_expr = self.parse_expression()?;
        self.consume(TokenKind::Colon, "Expected ':' in conditional expression")?;
        let else_expr = self.parse_precedence(Precedence::Lowest)?;
        let span = cond.span().merge(else_expr.span());

        Ok(Expr::Conditional(ConditionalExpr {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
            span,
        }))
    }

    /// Parse `(a, b)` call arguments, returning the closing span
    fn parse_arguments(&mut self) -> Result<(Vec<Expr>, Span), ()> {
        self.consume(TokenKind::LeftParen, "Expected '('")?;
        let mut args = Vec::new();

        while !self.check(TokenKind::RightParen) {
            args.push(self.parse_expression()?);
            if !self.match_token(TokenKind::Comma) {
                break;
            }
        }

        let end_span = self.consume(TokenKind::RightParen, "Expected ')' after arguments")?.span;
        Ok((args, end_span))
    }

    /// Parse call expression
    fn parse_call(&mut self, callee: Expr) -> Result<Expr, ()> {
        let callee_span = callee.span();
        let (args, end_span) = self.parse_arguments()?;

        Ok(Expr::Call(CallExpr {
            callee: Box::new(callee),
            args,
            span: callee_span.merge(end_span),
        }))
    }

    /// Parse index expression
    fn parse_index(&mut self, object: Expr) -> Result<Expr, ()> {
        let object_span = object.span();
        self.consume(TokenKind::LeftBracket, "Expected '['")?;
        let index = self.parse_expression()?;
        let end_span = self.consume(TokenKind::RightBracket, "Expected ']'")?.span;

        Ok(Expr::Index(IndexExpr {
            object: Box::new(object),
            index: Box::new(index),
            span: object_span.merge(end_span),
        }))
    }

    /// Parse member access
    fn parse_member(&mut self, object: Expr) -> Result<Expr, ()> {
        let object_span = object.span();
        self.consume(TokenKind::Dot, "Expected '.'")?;
        let property = self.consume_property_name("a property name after '.'")?;
        let span = object_span.merge(property.span);

        Ok(Expr::Member(MemberExpr {
            object: Box::new(object),
            property,
            span,
        }))
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn parse_expr(source: &str) -> Expr {
        let mut lexer = Lexer::new(format!("{};", source));
        let (tokens, _) = lexer.tokenize();
        let mut parser = Parser::new(tokens);
        let (program, diagnostics) = parser.parse();
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        match program.statements.into_iter().next() {
            Some(Stmt::Expr(stmt)) => stmt.expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_binary_precedence() {
        match parse_expr("1 + 2 * 3") {
            Expr::Binary(bin) => {
                assert_eq!(bin.op, BinaryOp::Add);
                assert!(matches!(*bin.right, Expr::Binary(ref r) if r.op == BinaryOp::Mul));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_logical_binds_looser_than_comparison() {
        match parse_expr("a < b && b === c") {
            Expr::Binary(bin) => {
                assert_eq!(bin.op, BinaryOp::And);
                assert!(matches!(*bin.left, Expr::Binary(ref l) if l.op == BinaryOp::Lt));
                assert!(matches!(*bin.right, Expr::Binary(ref r) if r.op == BinaryOp::StrictEq));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_conditional_is_right_associative() {
        match parse_expr("a ? 1 : b ? 2 : 3") {
            Expr::Conditional(cond) => {
                assert!(matches!(*cond.else_expr, Expr::Conditional(_)));
            }
            other => panic!("expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_member_call_chain() {
        match parse_expr("console.log(a.b[0])") {
            Expr::Call(call) => {
                assert!(matches!(*call.callee, Expr::Member(ref m) if m.property.name == "log"));
                assert_eq!(call.args.len(), 1);
                assert!(matches!(call.args[0], Expr::Index(_)));
            }
            other => panic!("expected call, got {:?}", other),
        }
    }

    #[test]
    fn test_arrow_functions() {
        match parse_expr("xs.map(x => x * 2)") {
            Expr::Call(call) => match &call.args[0] {
                Expr::Function(func) => {
                    assert!(func.is_arrow);
                    assert_eq!(func.params.len(), 1);
                    assert!(matches!(func.body, FunctionBody::Expr(_)));
                }
                other => panic!("expected arrow, got {:?}", other),
            },
            other => panic!("expected call, got {:?}", other),
        }

        match parse_expr("((a, b) => { return a; })") {
            Expr::Group(group) => {
                assert!(matches!(*group.expr, Expr::Function(ref f) if f.params.len() == 2));
            }
            other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_object_literal_with_shorthand() {
        match parse_expr("({ a: 1, 'b c': 2, d })") {
            Expr::Group(group) => match *group.expr {
                Expr::Object(obj) => {
                    let keys: Vec<&str> = obj.properties.iter().map(|p| p.key.as_str()).collect();
                    assert_eq!(keys, vec!["a", "b c", "d"]);
                    assert!(matches!(obj.properties[2].value, Expr::Identifier(_)));
                }
                other => panic!("expected object, got {:?}", other),
            },
            other => panic!("expected group, got {:?}", other),
        }
    }

    #[test]
    fn test_new_expression() {
        match parse_expr("new Point(1, 2).x") {
            Expr::Member(member) => {
                assert!(matches!(*member.object, Expr::New(ref n) if n.args.len() == 2));
            }
            other => panic!("expected member, got {:?}", other),
        }
    }

    #[test]
    fn test_unary_typeof() {
        match parse_expr("typeof -x") {
            Expr::Unary(unary) => {
                assert_eq!(unary.op, UnaryOp::Typeof);
                assert!(matches!(*unary.expr, Expr::Unary(ref inner) if inner.op == UnaryOp::Negate));
            }
            other => panic!("expected unary, got {:?}", other),
        }
    }
}
