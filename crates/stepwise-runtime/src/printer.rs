//! Source printer (AST to text)
//!
//! Renders a syntax tree back to source. Used for the instrumented program handed
//! to the sandbox and for the condition text carried by `test` events. Parentheses
//! are inserted only where operator precedence requires them, so printing a parsed
//! expression reproduces what the user wrote modulo whitespace.

use crate::ast::*;

/// Printer configuration
#[derive(Debug, Clone)]
pub struct PrintConfig {
    /// Number of spaces per indentation level (default: 2)
    pub indent_size: usize,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self { indent_size: 2 }
    }
}

impl PrintConfig {
    pub fn with_indent_size(mut self, size: usize) -> Self {
        self.indent_size = size;
        self
    }
}

/// Print a whole program with the default configuration
pub fn print_program(program: &Program) -> String {
    let mut printer = Printer::new(PrintConfig::default());
    printer.visit_program(program);
    printer.into_output()
}

/// Print a single expression on one line
pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::new(PrintConfig::default());
    printer.visit_expr(expr);
    printer.output
}

/// AST visitor that produces source text
pub struct Printer {
    output: String,
    indent_level: usize,
    config: PrintConfig,
}

impl Printer {
    pub fn new(config: PrintConfig) -> Self {
        Self {
            output: String::new(),
            indent_level: 0,
            config,
        }
    }

    pub fn into_output(self) -> String {
        let mut result = self.output;
        if !result.is_empty() && !result.ends_with('\n') {
            result.push('\n');
        }
        result
    }

    fn write_indent(&mut self) {
        let spaces = " ".repeat(self.indent_level * self.config.indent_size);
        self.output.push_str(&spaces);
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn writeln(&mut self) {
        self.output.push('\n');
    }

    // === Statements ===

    pub fn visit_program(&mut self, program: &Program) {
        for stmt in &program.statements {
            self.visit_statement(stmt);
        }
    }

    fn visit_statement(&mut self, stmt: &Stmt) {
        self.write_indent();
        self.visit_statement_inline(stmt);
        self.writeln();
    }

    /// Print a statement without leading indent or trailing newline
    fn visit_statement_inline(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl(decl) => {
                self.visit_var_decl(decl);
                self.write(";");
            }
            Stmt::FunctionDecl(func) => self.visit_function(func),
            Stmt::ClassDecl(class) => self.visit_class(class),
            Stmt::Assign(_) | Stmt::Update(_) | Stmt::Expr(_) => {
                self.visit_simple_stmt(stmt);
                self.write(";");
            }
            Stmt::If(if_stmt) => self.visit_if(if_stmt),
            Stmt::While(w) => {
                self.write("while (");
                self.visit_expr(&w.cond);
                self.write(") ");
                self.visit_body(&w.body);
            }
            Stmt::For(f) => {
                self.write("for (");
                if let Some(init) = &f.init {
                    self.visit_simple_stmt(init);
                }
                self.write(";");
                if let Some(cond) = &f.cond {
                    self.write(" ");
                    self.visit_expr(cond);
                }
                self.write(";");
                if let Some(update) = &f.update {
                    self.write(" ");
                    self.visit_simple_stmt(update);
                }
                self.write(") ");
                self.visit_body(&f.body);
            }
            Stmt::ForOf(f) => {
                self.write(&format!("for ({} {} of ", f.kind.as_str(), f.binding.name));
                self.visit_expr(&f.iterable);
                self.write(") ");
                self.visit_body(&f.body);
            }
            Stmt::Return(r) => {
                self.write("return");
                if let Some(value) = &r.value {
                    self.write(" ");
                    self.visit_expr(value);
                }
                self.write(";");
            }
            Stmt::Break(jump) | Stmt::Continue(jump) => {
                self.write(if matches!(stmt, Stmt::Break(_)) {
                    "break"
                } else {
                    "continue"
                });
                if let Some(label) = &jump.label {
                    self.write(" ");
                    self.write(&label.name);
                }
                self.write(";");
            }
            Stmt::Throw(t) => {
                self.write("throw ");
                self.visit_expr(&t.value);
                self.write(";");
            }
            Stmt::Block(block) => self.visit_block(block),
            Stmt::Labeled(labeled) => {
                self.write(&labeled.label.name);
                self.write(": ");
                self.visit_statement_inline(&labeled.body);
            }
            Stmt::Empty(_) => self.write(";"),
        }
    }

    /// Declarations, assignments, updates and expressions (no terminator)
    fn visit_simple_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl(decl) => self.visit_var_decl(decl),
            Stmt::Assign(a) => {
                self.visit_assign_target(&a.target);
                self.write(&format!(" {} ", a.op.as_str()));
                self.visit_expr(&a.value);
            }
            Stmt::Update(u) => {
                if u.prefix {
                    self.write(u.op.as_str());
                    self.visit_assign_target(&u.target);
                } else {
                    self.visit_assign_target(&u.target);
                    self.write(u.op.as_str());
                }
            }
            Stmt::Expr(e) => {
                // Statements may not start with `{` or `function`
                let needs_parens = matches!(e.expr, Expr::Object(_))
                    || matches!(&e.expr, Expr::Function(f) if !f.is_arrow);
                if needs_parens {
                    self.write("(");
                    self.visit_expr(&e.expr);
                    self.write(")");
                } else {
                    self.visit_expr(&e.expr);
                }
            }
            other => self.visit_statement_inline(other),
        }
    }

    fn visit_var_decl(&mut self, decl: &VarDecl) {
        self.write(decl.kind.as_str());
        self.write(" ");
        for (i, declarator) in decl.declarators.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.write(&declarator.name.name);
            if let Some(init) = &declarator.init {
                self.write(" = ");
                self.visit_expr(init);
            }
        }
    }

    fn visit_assign_target(&mut self, target: &AssignTarget) {
        match target {
            AssignTarget::Identifier(id) => self.write(&id.name),
            AssignTarget::Member(m) => self.visit_member(m),
            AssignTarget::Index(i) => self.visit_index(i),
        }
    }

    fn visit_if(&mut self, if_stmt: &IfStmt) {
        self.write("if (");
        self.visit_expr(&if_stmt.cond);
        self.write(") ");
        self.visit_body(&if_stmt.then_branch);
        if let Some(else_branch) = &if_stmt.else_branch {
            if matches!(if_stmt.then_branch.as_ref(), Stmt::Block(_)) {
                self.write(" else ");
            } else {
                self.writeln();
                self.write_indent();
                self.write("else ");
            }
            match else_branch.as_ref() {
                Stmt::If(nested) => self.visit_if(nested),
                other => self.visit_body(other),
            }
        }
    }

    /// Loop and branch bodies: blocks stay on the header line
    fn visit_body(&mut self, body: &Stmt) {
        match body {
            Stmt::Block(block) => self.visit_block(block),
            other => {
                self.writeln();
                self.indent_level += 1;
                self.write_indent();
                self.visit_statement_inline(other);
                self.indent_level -= 1;
            }
        }
    }

    fn visit_block(&mut self, block: &Block) {
        self.write("{");
        if block.statements.is_empty() {
            self.write("}");
            return;
        }
        self.writeln();
        self.indent_level += 1;
        for stmt in &block.statements {
            self.visit_statement(stmt);
        }
        self.indent_level -= 1;
        self.write_indent();
        self.write("}");
    }

    fn visit_function(&mut self, func: &Function) {
        if func.is_arrow {
            self.write("(");
            self.write(&param_list(&func.params));
            self.write(") => ");
            match &func.body {
                FunctionBody::Block(block) => self.visit_block(block),
                FunctionBody::Expr(expr) => {
                    if matches!(expr.as_ref(), Expr::Object(_)) {
                        self.write("(");
                        self.visit_expr(expr);
                        self.write(")");
                    } else {
                        self.visit_expr(expr);
                    }
                }
            }
            return;
        }

        self.write("function");
        if let Some(name) = &func.name {
            self.write(" ");
            self.write(&name.name);
        }
        self.write("(");
        self.write(&param_list(&func.params));
        self.write(") ");
        self.visit_function_body(&func.body);
    }

    fn visit_function_body(&mut self, body: &FunctionBody) {
        match body {
            FunctionBody::Block(block) => self.visit_block(block),
            FunctionBody::Expr(expr) => {
                self.write("{ return ");
                self.visit_expr(expr);
                self.write("; }");
            }
        }
    }

    fn visit_class(&mut self, class: &ClassDecl) {
        self.write("class ");
        self.write(&class.name.name);
        self.write(" {");
        if class.methods.is_empty() {
            self.write("}");
            return;
        }
        self.writeln();
        self.indent_level += 1;
        for method in &class.methods {
            self.write_indent();
            self.write(&method.name.name);
            self.write("(");
            self.write(&param_list(&method.function.params));
            self.write(") ");
            self.visit_function_body(&method.function.body);
            self.writeln();
        }
        self.indent_level -= 1;
        self.write_indent();
        self.write("}");
    }

    // === Expressions ===

    pub fn visit_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(lit, _) => self.visit_literal(lit),
            Expr::Identifier(id) => self.write(&id.name),
            Expr::This(_) => self.write("this"),
            Expr::Array(array) => {
                self.write("[");
                for (i, element) in array.elements.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    self.visit_expr(element);
                }
                self.write("]");
            }
            Expr::Object(object) => {
                if object.properties.is_empty() {
                    self.write("{}");
                    return;
                }
                self.write("{ ");
                for (i, property) in object.properties.iter().enumerate() {
                    if i > 0 {
                        self.write(", ");
                    }
                    if is_identifier_name(&property.key) {
                        self.write(&property.key);
                    } else {
                        self.write(&quote(&property.key));
                    }
                    self.write(": ");
                    self.visit_expr(&property.value);
                }
                self.write(" }");
            }
            Expr::Function(func) => self.visit_function(func),
            Expr::Unary(u) => {
                self.write(u.op.as_str());
                // `- -x` must not collapse into `--x`
                if expr_precedence(&u.expr) == PREC_UNARY {
                    self.write("(");
                    self.visit_expr(&u.expr);
                    self.write(")");
                } else {
                    self.visit_operand(&u.expr, PREC_UNARY, false);
                }
            }
            Expr::Binary(b) => {
                let prec = binary_precedence(b.op);
                self.visit_operand(&b.left, prec, false);
                self.write(&format!(" {} ", b.op.as_str()));
                self.visit_operand(&b.right, prec, true);
            }
            Expr::Conditional(c) => {
                self.visit_operand(&c.cond, PREC_CONDITIONAL, true);
                self.write(" ? ");
                self.visit_expr(&c.then_expr);
                self.write(" : ");
                self.visit_expr(&c.else_expr);
            }
            Expr::Call(call) => {
                self.visit_operand(&call.callee, PREC_CALL, false);
                self.write("(");
                self.visit_args(&call.args);
                self.write(")");
            }
            Expr::New(new) => {
                self.write("new ");
                self.visit_operand(&new.callee, PREC_CALL, false);
                self.write("(");
                self.visit_args(&new.args);
                self.write(")");
            }
            Expr::Member(m) => self.visit_member(m),
            Expr::Index(i) => self.visit_index(i),
            Expr::Group(g) => {
                self.write("(");
                self.visit_expr(&g.expr);
                self.write(")");
            }
        }
    }

    fn visit_args(&mut self, args: &[Expr]) {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.visit_expr(arg);
        }
    }

    fn visit_member(&mut self, m: &MemberExpr) {
        self.visit_operand(&m.object, PREC_CALL, false);
        self.write(".");
        self.write(&m.property.name);
    }

    fn visit_index(&mut self, i: &IndexExpr) {
        self.visit_operand(&i.object, PREC_CALL, false);
        self.write("[");
        self.visit_expr(&i.index);
        self.write("]");
    }

    /// Print a child expression, parenthesising it if it binds looser than its parent
    fn visit_operand(&mut self, expr: &Expr, parent: u8, is_right: bool) {
        let child = expr_precedence(expr);
        if child < parent || (is_right && child == parent && parent != PREC_UNARY) {
            self.write("(");
            self.visit_expr(expr);
            self.write(")");
        } else {
            self.visit_expr(expr);
        }
    }

    fn visit_literal(&mut self, lit: &Literal) {
        match lit {
            Literal::Number(n) => self.write(&format_number(*n)),
            Literal::String(s) => self.write(&quote(s)),
            Literal::Bool(b) => self.write(if *b { "true" } else { "false" }),
            Literal::Null => self.write("null"),
            Literal::Undefined => self.write("undefined"),
        }
    }
}

const PREC_LOWEST: u8 = 0;
const PREC_CONDITIONAL: u8 = 1;
const PREC_UNARY: u8 = 8;
const PREC_CALL: u8 = 9;
const PREC_PRIMARY: u8 = 10;

fn binary_precedence(op: BinaryOp) -> u8 {
    match op {
        BinaryOp::Or => 2,
        BinaryOp::And => 3,
        BinaryOp::Eq | BinaryOp::Ne | BinaryOp::StrictEq | BinaryOp::StrictNe => 4,
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => 5,
        BinaryOp::Add | BinaryOp::Sub => 6,
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 7,
    }
}

fn expr_precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Function(_) => PREC_LOWEST,
        Expr::Conditional(_) => PREC_CONDITIONAL,
        Expr::Binary(b) => binary_precedence(b.op),
        Expr::Unary(_) => PREC_UNARY,
        Expr::Call(_) | Expr::Member(_) | Expr::Index(_) | Expr::New(_) => PREC_CALL,
        // Negative numbers print with a leading minus
        Expr::Literal(Literal::Number(n), _) if *n < 0.0 => PREC_UNARY,
        _ => PREC_PRIMARY,
    }
}

fn param_list(params: &[Identifier]) -> String {
    params
        .iter()
        .map(|p| p.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a number the way script source would spell it
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e21 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

fn is_identifier_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use pretty_assertions::assert_eq;

    fn parse(source: &str) -> Program {
        let (tokens, _) = Lexer::new(source).tokenize();
        let (program, diagnostics) = Parser::new(tokens).parse();
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics);
        program
    }

    fn first_expr(source: &str) -> Expr {
        match parse(source).statements.into_iter().next() {
            Some(Stmt::Expr(e)) => e.expr,
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_print_condition_text() {
        insta::assert_snapshot!(print_expr(&first_expr("i<3&&xs[i]!==null;")), @"i < 3 && xs[i] !== null");
    }

    #[test]
    fn test_print_keeps_user_parentheses() {
        insta::assert_snapshot!(print_expr(&first_expr("(a + b) * c;")), @"(a + b) * c");
    }

    #[test]
    fn test_print_strings_are_escaped() {
        assert_eq!(print_expr(&first_expr(r#"'say "hi"\n';"#)), r#""say \"hi\"\n""#);
    }

    #[test]
    fn test_synthetic_nesting_gets_parentheses() {
        let span = crate::span::Span::dummy();
        let sum = Expr::Binary(BinaryExpr {
            op: BinaryOp::Add,
            left: Box::new(Expr::ident("a", span)),
            right: Box::new(Expr::ident("b", span)),
            span,
        });
        let product = Expr::Binary(BinaryExpr {
            op: BinaryOp::Mul,
            left: Box::new(sum.clone()),
            right: Box::new(Expr::ident("c", span)),
            span,
        });
        assert_eq!(print_expr(&product), "(a + b) * c");

        let negated = Expr::Unary(UnaryExpr {
            op: UnaryOp::Not,
            expr: Box::new(sum),
            span,
        });
        assert_eq!(print_expr(&negated), "!(a + b)");
    }

    #[test]
    fn test_print_program_reparses_to_same_tree_shape() {
        let source = "function f(n) {\n  if (n > 1) return n * f(n - 1);\n  else {\n    return 1;\n  }\n}\nfor (let i = 0; i < 3; i++) {\n  total += f(i);\n}\nconst g = x => ({ value: x });\nouter: while (true) {\n  break outer;\n}\n";
        let printed = print_program(&parse(source));
        let reprinted = print_program(&parse(&printed));
        assert_eq!(printed, reprinted);
        assert!(printed.contains("for (let i = 0; i < 3; i++) {"));
        assert!(printed.contains("const g = (x) => ({ value: x });"));
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-2.0), "-2");
        assert_eq!(format_number(0.5), "0.5");
        assert_eq!(format_number(f64::NAN), "NaN");
    }
}
