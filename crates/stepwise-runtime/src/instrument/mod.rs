//! Instrumentation pass
//!
//! Rewrites a parsed program so that running it reports every interesting step
//! through the probe runtime. Observable results and control flow stay as they
//! were: conditions and return values are evaluated exactly once into
//! temporaries and then probed.
//!
//! Each node is rewritten at most once. Rewritten nodes are remembered in a
//! visited set keyed by node kind and source span; nothing is stored on the AST.

mod loops;
mod probes;
mod scan;

pub use scan::{is_reserved, BODY_LABEL_PREFIX, RETURN_TEMP_PREFIX, TEST_TEMP_PREFIX};

use crate::ast::*;
use crate::diagnostic::Diagnostic;
use crate::parser::parse_source;
use crate::printer::{print_expr, print_program};
use crate::span::Span;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, instrument};

/// Name used for functions with no name of their own and no binding
pub const ANONYMOUS: &str = "anonymous";

/// Print-style calls replaced by `stdout` probes
const PRINT_METHODS: [&str; 4] = ["log", "info", "warn", "error"];

/// Source that cannot be instrumented
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", describe(.diagnostics))]
pub struct InstrumentationError {
    pub diagnostics: Vec<Diagnostic>,
}

fn describe(diagnostics: &[Diagnostic]) -> String {
    match diagnostics {
        [] => "instrumentation failed".to_string(),
        [only] => only.to_string(),
        [first, rest @ ..] => format!("{} (and {} more)", first, rest.len()),
    }
}

impl From<Vec<Diagnostic>> for InstrumentationError {
    fn from(diagnostics: Vec<Diagnostic>) -> Self {
        Self { diagnostics }
    }
}

/// Parse, instrument and print `source`
#[instrument(
    name = "instrument::source",
    level = "debug",
    skip(source),
    fields(bytes = source.len())
)]
pub fn instrument_source(source: &str) -> Result<String, InstrumentationError> {
    let mut program = parse_source(source)?;
    Instrumenter::new().instrument(&mut program)?;
    Ok(print_program(&program))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum NodeKind {
    Function,
    Declaration,
    Assignment,
    Branch,
    Loop,
    Return,
    Class,
}

impl NodeKind {
    fn of(stmt: &Stmt) -> Option<NodeKind> {
        match stmt {
            Stmt::VarDecl(_) => Some(NodeKind::Declaration),
            Stmt::Assign(_) | Stmt::Update(_) => Some(NodeKind::Assignment),
            Stmt::If(_) => Some(NodeKind::Branch),
            Stmt::While(_) | Stmt::For(_) | Stmt::ForOf(_) => Some(NodeKind::Loop),
            Stmt::Return(_) => Some(NodeKind::Return),
            Stmt::ClassDecl(_) => Some(NodeKind::Class),
            _ => None,
        }
    }
}

/// Rewrites programs in place
#[derive(Debug, Default)]
pub struct Instrumenter {
    visited: HashSet<(NodeKind, Span)>,
    next_temp: usize,
}

impl Instrumenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Instrument `program` in place
    ///
    /// A program that already calls the probe runtime is left untouched. User
    /// bindings with reserved names are rejected before anything is rewritten.
    pub fn instrument(&mut self, program: &mut Program) -> Result<(), InstrumentationError> {
        let scan = scan::scan(program);
        if scan.has_probes {
            debug!("program already instrumented");
            return Ok(());
        }
        if !scan.reserved.is_empty() {
            return Err(scan.reserved.into());
        }

        let statements = std::mem::take(&mut program.statements);
        program.statements = self.instrument_statements(statements);
        debug!(rewritten = self.visited.len(), temps = self.next_temp, "instrumented program");
        Ok(())
    }

    fn mark(&mut self, kind: NodeKind, span: Span) -> bool {
        self.visited.insert((kind, span))
    }

    fn temp(&mut self, prefix: &str) -> String {
        let id = self.next_temp;
        self.next_temp += 1;
        format!("{}{}", prefix, id)
    }

    fn instrument_statements(&mut self, statements: Vec<Stmt>) -> Vec<Stmt> {
        let mut out = Vec::with_capacity(statements.len());
        for stmt in statements {
            out.extend(self.instrument_stmt(stmt));
        }
        out
    }

    fn instrument_block(&mut self, block: Block) -> Block {
        Block {
            statements: self.instrument_statements(block.statements),
            span: block.span,
        }
    }

    /// Instrument a statement that must stay a single statement
    fn instrument_single(&mut self, stmt: Stmt) -> Stmt {
        let span = stmt.span();
        let mut out = self.instrument_stmt(stmt);
        if out.len() == 1 {
            if let Some(only) = out.pop() {
                return only;
            }
        }
        Stmt::Block(Block {
            statements: out,
            span,
        })
    }

    /// Normalize a branch or loop body into a block and instrument it
    fn instrument_body(&mut self, body: Stmt, prelude: Vec<Stmt>) -> Box<Stmt> {
        let block = body.into_block();
        let mut statements = prelude;
        statements.extend(self.instrument_statements(block.statements));
        Box::new(Stmt::Block(Block {
            statements,
            span: block.span,
        }))
    }

    fn instrument_stmt(&mut self, stmt: Stmt) -> Vec<Stmt> {
        if let Some(kind) = NodeKind::of(&stmt) {
            if !self.mark(kind, stmt.span()) {
                return vec![stmt];
            }
        }

        match stmt {
            Stmt::VarDecl(mut decl) => {
                for declarator in &mut decl.declarators {
                    let Declarator { name, init, .. } = declarator;
                    if let Some(init) = init {
                        self.instrument_expr(init, Some(name.name.as_str()));
                    }
                }
                let probes: Vec<Stmt> = decl
                    .declarators
                    .iter()
                    .map(|d| probes::declare(&d.name.name, decl.span))
                    .collect();
                let mut out = vec![Stmt::VarDecl(decl)];
                out.extend(probes);
                out
            }
            Stmt::FunctionDecl(mut func) => {
                self.instrument_function(&mut func, None, false);
                vec![Stmt::FunctionDecl(func)]
            }
            Stmt::ClassDecl(mut class) => {
                let class_name = class.name.name.clone();
                for method in &mut class.methods {
                    let is_constructor = method.name.name == "constructor";
                    let name = if is_constructor {
                        class_name.clone()
                    } else {
                        method.name.name.clone()
                    };
                    self.instrument_function(&mut method.function, Some(&name), is_constructor);
                }
                vec![probes::class(&class_name, class.span), Stmt::ClassDecl(class)]
            }
            Stmt::Assign(mut assign) => {
                self.instrument_target(&mut assign.target);
                let hint = target_name(&assign.target);
                self.instrument_expr(&mut assign.value, hint.as_deref());
                let probe = assign_probe(&assign.target, assign.span);
                let mut out = vec![Stmt::Assign(assign)];
                out.extend(probe);
                out
            }
            Stmt::Update(mut update) => {
                self.instrument_target(&mut update.target);
                let probe = assign_probe(&update.target, update.span);
                let mut out = vec![Stmt::Update(update)];
                out.extend(probe);
                out
            }
            Stmt::If(if_stmt) => self.instrument_if(if_stmt),
            Stmt::While(mut while_stmt) => {
                self.instrument_expr(&mut while_stmt.cond, None);
                let prelude = vec![probes::looped("while", while_stmt.span)];
                while_stmt.body = self.instrument_body(*while_stmt.body, prelude);
                vec![Stmt::While(while_stmt)]
            }
            Stmt::For(for_stmt) => vec![self.desugar_for(for_stmt, Vec::new())],
            Stmt::ForOf(mut for_of) => {
                self.instrument_expr(&mut for_of.iterable, None);
                let prelude = vec![
                    probes::looped("for-of", for_of.span),
                    probes::declare(&for_of.binding.name, for_of.binding.span),
                ];
                for_of.body = self.instrument_body(*for_of.body, prelude);
                vec![Stmt::ForOf(for_of)]
            }
            Stmt::Return(ret) => self.instrument_return(ret),
            Stmt::Throw(mut throw) => {
                self.instrument_expr(&mut throw.value, None);
                vec![Stmt::Throw(throw)]
            }
            Stmt::Block(block) => vec![Stmt::Block(self.instrument_block(block))],
            Stmt::Labeled(labeled) => vec![self.instrument_labeled(labeled)],
            Stmt::Expr(mut expr_stmt) => {
                self.instrument_expr(&mut expr_stmt.expr, None);
                vec![Stmt::Expr(expr_stmt)]
            }
            other @ (Stmt::Break(_) | Stmt::Continue(_) | Stmt::Empty(_)) => vec![other],
        }
    }

    /// `let __tN = cond; <test probe>; if (__tN) ...`
    fn instrument_if(&mut self, if_stmt: IfStmt) -> Vec<Stmt> {
        let IfStmt {
            mut cond,
            then_branch,
            else_branch,
            span,
        } = if_stmt;

        let text = print_expr(&cond);
        let cond_span = cond.span();
        self.instrument_expr(&mut cond, None);
        let temp = self.temp(TEST_TEMP_PREFIX);

        let then_branch = self.instrument_body(*then_branch, Vec::new());
        let else_branch = else_branch.map(|branch| match *branch {
            nested @ Stmt::If(_) => {
                let nested_span = nested.span();
                Box::new(Stmt::Block(Block {
                    statements: self.instrument_stmt(nested),
                    span: nested_span,
                }))
            }
            other => self.instrument_body(other, Vec::new()),
        });

        vec![
            probes::temp_decl(&temp, cond, cond_span),
            probes::test(&text, &temp, cond_span),
            Stmt::If(IfStmt {
                cond: Expr::ident(&temp, cond_span),
                then_branch,
                else_branch,
                span,
            }),
        ]
    }

    /// `return e;` evaluates `e` once into `__rN` before the probe
    fn instrument_return(&mut self, ret: ReturnStmt) -> Vec<Stmt> {
        let span = ret.span;
        match ret.value {
            Some(mut value) => {
                self.instrument_expr(&mut value, None);
                let temp = self.temp(RETURN_TEMP_PREFIX);
                vec![
                    probes::temp_decl(&temp, value, span),
                    probes::ret(Some(Expr::ident(&temp, span)), span),
                    Stmt::Return(ReturnStmt {
                        value: Some(Expr::ident(&temp, span)),
                        span,
                    }),
                ]
            }
            None => vec![probes::ret(None, span), Stmt::Return(ret)],
        }
    }

    /// Labels stay attached to the loop they name, even through desugaring
    fn instrument_labeled(&mut self, labeled: LabeledStmt) -> Stmt {
        let mut labels = vec![labeled.label];
        let mut body = *labeled.body;
        while let Stmt::Labeled(inner) = body {
            labels.push(inner.label);
            body = *inner.body;
        }

        if let Stmt::For(for_stmt) = body {
            if self.mark(NodeKind::Loop, for_stmt.span) {
                return self.desugar_for(for_stmt, labels);
            }
            body = Stmt::For(for_stmt);
        }

        let mut stmt = self.instrument_single(body);
        for label in labels.into_iter().rev() {
            let span = label.span.merge(stmt.span());
            stmt = Stmt::Labeled(LabeledStmt {
                label,
                body: Box::new(stmt),
                span,
            });
        }
        stmt
    }

    /// Prepend the call probe and append the fall-off return probe
    fn instrument_function(
        &mut self,
        func: &mut Function,
        hint: Option<&str>,
        is_constructor: bool,
    ) {
        if !self.mark(NodeKind::Function, func.span) {
            return;
        }

        let name = func
            .name
            .as_ref()
            .map(|id| id.name.clone())
            .or_else(|| hint.map(str::to_string))
            .unwrap_or_else(|| ANONYMOUS.to_string());

        let placeholder = FunctionBody::Block(Block {
            statements: Vec::new(),
            span: func.span,
        });
        let body = match std::mem::replace(&mut func.body, placeholder) {
            FunctionBody::Block(block) => block,
            FunctionBody::Expr(expr) => {
                let span = expr.span();
                Block {
                    statements: vec![Stmt::Return(ReturnStmt {
                        value: Some(*expr),
                        span,
                    })],
                    span,
                }
            }
        };

        let falls_off = !matches!(body.statements.last(), Some(Stmt::Return(_)));
        let mut statements = vec![probes::call(&name, &func.params, func.span)];
        statements.extend(self.instrument_statements(body.statements));
        if falls_off {
            let end = Span::new(func.span.end, func.span.end, func.span.end_line);
            let value = is_constructor.then(|| Expr::This(end));
            statements.push(probes::ret(value, end));
        }

        func.body = FunctionBody::Block(Block {
            statements,
            span: body.span,
        });
    }

    fn instrument_target(&mut self, target: &mut AssignTarget) {
        match target {
            AssignTarget::Identifier(_) => {}
            AssignTarget::Member(member) => self.instrument_expr(&mut member.object, None),
            AssignTarget::Index(index) => {
                self.instrument_expr(&mut index.object, None);
                self.instrument_expr(&mut index.index, None);
            }
        }
    }

    fn instrument_expr(&mut self, expr: &mut Expr, hint: Option<&str>) {
        if let Expr::Call(call) = expr {
            if is_print_callee(&call.callee) {
                let span = call.span;
                let mut args = std::mem::take(&mut call.args);
                for arg in &mut args {
                    self.instrument_expr(arg, None);
                }
                *expr = probes::stdout(args, span);
                return;
            }
        }

        match expr {
            Expr::Literal(..) | Expr::Identifier(_) | Expr::This(_) => {}
            Expr::Array(array) => {
                for element in &mut array.elements {
                    self.instrument_expr(element, None);
                }
            }
            Expr::Object(object) => {
                for property in &mut object.properties {
                    let Property { key, value, .. } = property;
                    self.instrument_expr(value, Some(key.as_str()));
                }
            }
            Expr::Function(func) => self.instrument_function(func, hint, false),
            Expr::Unary(unary) => self.instrument_expr(&mut unary.expr, None),
            Expr::Binary(binary) => {
                self.instrument_expr(&mut binary.left, None);
                self.instrument_expr(&mut binary.right, None);
            }
            Expr::Conditional(cond) => {
                self.instrument_expr(&mut cond.cond, None);
                self.instrument_expr(&mut cond.then_expr, hint);
                self.instrument_expr(&mut cond.else_expr, hint);
            }
            Expr::Call(call) => {
                self.instrument_expr(&mut call.callee, None);
                for arg in &mut call.args {
                    self.instrument_expr(arg, None);
                }
            }
            Expr::New(new) => {
                self.instrument_expr(&mut new.callee, None);
                for arg in &mut new.args {
                    self.instrument_expr(arg, None);
                }
            }
            Expr::Member(member) => self.instrument_expr(&mut member.object, None),
            Expr::Index(index) => {
                self.instrument_expr(&mut index.object, None);
                self.instrument_expr(&mut index.index, None);
            }
            Expr::Group(group) => self.instrument_expr(&mut group.expr, hint),
        }
    }
}

/// `console.log` and friends
fn is_print_callee(callee: &Expr) -> bool {
    match callee {
        Expr::Member(member) => {
            matches!(member.object.as_ref(), Expr::Identifier(id) if id.name == "console")
                && PRINT_METHODS.contains(&member.property.name.as_str())
        }
        _ => false,
    }
}

/// Name given to a function assigned to `target`
fn target_name(target: &AssignTarget) -> Option<String> {
    match target {
        AssignTarget::Identifier(id) => Some(id.name.clone()),
        AssignTarget::Member(member) => Some(member.property.name.clone()),
        AssignTarget::Index(_) => None,
    }
}

/// Variable an assignment is reported under, and how to read it back
///
/// Writes through a member or index chain report the whole container at the
/// root of the chain. Chains rooted at anything but a name or `this` report
/// nothing.
fn assigned_root(target: &AssignTarget) -> Option<(String, Expr)> {
    fn root(expr: &Expr) -> Option<(String, Expr)> {
        match expr {
            Expr::Identifier(id) => Some((id.name.clone(), expr.clone())),
            Expr::This(span) => Some(("this".to_string(), Expr::This(*span))),
            Expr::Member(member) => root(&member.object),
            Expr::Index(index) => root(&index.object),
            Expr::Group(group) => root(&group.expr),
            _ => None,
        }
    }

    match target {
        AssignTarget::Identifier(id) => Some((id.name.clone(), Expr::Identifier(id.clone()))),
        AssignTarget::Member(member) => root(&member.object),
        AssignTarget::Index(index) => root(&index.object),
    }
}

fn assign_probe(target: &AssignTarget, span: Span) -> Option<Stmt> {
    assigned_root(target).map(|(key, value)| probes::assign(&key, value, span))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn instrumented(source: &str) -> String {
        instrument_source(source).unwrap()
    }

    #[test]
    fn test_declaration_probe_follows_statement() {
        insta::assert_snapshot!(instrumented("let a = 1, b;"), @r#"
        let a = 1, b;
        __record({ kind: "declare", line: 1, vars: { a: __snapshot(a) } });
        __record({ kind: "declare", line: 1, vars: { b: __snapshot(b) } });
        "#);
    }

    #[test]
    fn test_function_gets_call_and_return_probes() {
        insta::assert_snapshot!(instrumented("function add(a, b) {\n  return a + b;\n}"), @r#"
        function add(a, b) {
          __record({ kind: "call", line: 1, name: "add", args: { a: __snapshot(a), b: __snapshot(b) } });
          let __r0 = a + b;
          __record({ kind: "return", line: 2, value: __snapshot(__r0) });
          return __r0;
        }
        "#);
    }

    #[test]
    fn test_fall_off_return_probe() {
        let out = instrumented("function f() {\n  let x = 1;\n}");
        assert!(out.contains(r#"__record({ kind: "return", line: 3 });"#), "{}", out);
    }

    #[test]
    fn test_if_condition_is_evaluated_once() {
        insta::assert_snapshot!(instrumented("if (x > 1) y = 2;"), @r#"
        let __t0 = x > 1;
        __record({ kind: "test", line: 1, test: "x > 1", result: __snapshot(__t0) });
        if (__t0) {
          y = 2;
          __record({ kind: "assign", line: 1, vars: { y: __snapshot(y) } });
        }
        "#);
    }

    #[test]
    fn test_member_write_reports_container() {
        let out = instrumented("o.a.b = 1; this.x = 2; f().y = 3;");
        assert!(out.contains("vars: { o: __snapshot(o) }"), "{}", out);
        assert!(out.contains("vars: { this: __snapshot(this) }"), "{}", out);
        assert_eq!(out.matches(r#"kind: "assign""#).count(), 2);
    }

    #[test]
    fn test_print_call_is_replaced() {
        let out = instrumented(r#"console.log("a", 1 + 2);"#);
        assert!(!out.contains("console"), "{}", out);
        assert!(out.contains(r#"output: [__snapshot("a"), __snapshot(1 + 2)]"#), "{}", out);
    }

    #[test]
    fn test_arrow_expression_body_is_normalized() {
        let out = instrumented("const sq = (n) => n * n;");
        assert!(out.contains(r#"name: "sq""#), "{}", out);
        assert!(out.contains("let __r0 = n * n;"), "{}", out);
    }

    #[test]
    fn test_constructor_returns_this() {
        let out = instrumented("class P {\n  constructor(x) {\n    this.x = x;\n  }\n}");
        assert!(out.starts_with(r#"__record({ kind: "class", line: 1, name: "P" });"#), "{}", out);
        assert!(out.contains(r#"name: "P", args: { x: __snapshot(x) }"#), "{}", out);
        assert!(out.contains("value: __snapshot(this)"), "{}", out);
    }

    #[test]
    fn test_for_loop_is_desugared() {
        let out = instrumented("for (let i = 0; i < 3; i++) {\n  if (i == 1) continue;\n}");
        assert!(out.starts_with("{\n"), "{}", out);
        assert!(out.contains("while (true) {"), "{}", out);
        assert!(out.contains(r#"test: "i < 3""#), "{}", out);
        assert!(out.contains("break __stepwise_body0;"), "{}", out);
        assert!(!out.contains("continue"), "{}", out);
        assert!(!out.contains("for ("), "{}", out);
    }

    #[test]
    fn test_labeled_for_keeps_its_label() {
        let out = instrumented("outer: for (;;) { break outer; }");
        assert!(out.contains("outer: while (true)"), "{}", out);
        assert!(out.contains("break outer;"), "{}", out);
    }

    #[test]
    fn test_instrumented_output_parses() {
        let source = r#"
            let xs = [3, 1, 2];
            function total(list) {
                let sum = 0;
                for (const x of list) { sum += x; }
                return sum;
            }
            let t = total(xs);
            while (t > 0) { t -= 2; }
            console.log(t);
        "#;
        assert!(parse_source(&instrumented(source)).is_ok());
    }

    #[test]
    fn test_already_instrumented_is_unchanged() {
        let once = instrumented("let a = 1;");
        let mut program = parse_source(&once).unwrap();
        Instrumenter::new().instrument(&mut program).unwrap();
        assert_eq!(print_program(&program), once);
    }

    #[test]
    fn test_visited_nodes_are_not_rewritten_twice() {
        let mut program = parse_source("function f(a) { return a; }").unwrap();
        let mut instrumenter = Instrumenter::new();
        instrumenter.instrument(&mut program).unwrap();
        let once = print_program(&program);
        let statements = std::mem::take(&mut program.statements);
        program.statements = instrumenter.instrument_statements(statements);
        assert_eq!(print_program(&program), once);
    }

    #[test]
    fn test_reserved_name_is_rejected() {
        let err = instrument_source("let __r0 = 1;").unwrap_err();
        assert_eq!(err.diagnostics[0].code, "SW3001");
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let err = instrument_source("let = ;").unwrap_err();
        assert!(!err.diagnostics.is_empty());
    }
}
