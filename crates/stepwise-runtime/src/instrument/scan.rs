//! Read-only pre-pass over a parsed program
//!
//! Finds existing probe calls (the program was already instrumented), user
//! identifiers that collide with names the instrumenter generates and
//! whether any function is created inside a statement.

use crate::ast::*;
use crate::diagnostic::Diagnostic;
use crate::probe::{RECORD_FN, SNAPSHOT_FN};

/// Prefix of the temporaries holding tested conditions
pub const TEST_TEMP_PREFIX: &str = "__t";
/// Prefix of the temporaries holding return values
pub const RETURN_TEMP_PREFIX: &str = "__r";
/// Prefix of the labels and copies generated for desugared `for` loops
pub const BODY_LABEL_PREFIX: &str = "__stepwise_";

/// Whether `name` is reserved for instrumentation
pub fn is_reserved(name: &str) -> bool {
    name.starts_with(RECORD_FN)
        || name.starts_with(SNAPSHOT_FN)
        || name.starts_with(BODY_LABEL_PREFIX)
        || is_temp(name, TEST_TEMP_PREFIX)
        || is_temp(name, RETURN_TEMP_PREFIX)
}

fn is_temp(name: &str, prefix: &str) -> bool {
    name.strip_prefix(prefix)
        .map(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
        .unwrap_or(false)
}

#[derive(Debug, Default)]
pub(super) struct Scan {
    pub has_probes: bool,
    pub has_closures: bool,
    pub reserved: Vec<Diagnostic>,
}

pub(super) fn scan(program: &Program) -> Scan {
    let mut scan = Scan::default();
    for stmt in &program.statements {
        scan.stmt(stmt);
    }
    scan
}

pub(super) fn scan_stmt(stmt: &Stmt) -> Scan {
    let mut scan = Scan::default();
    scan.stmt(stmt);
    scan
}

impl Scan {
    fn name(&mut self, id: &Identifier) {
        if is_reserved(&id.name) {
            self.reserved.push(
                Diagnostic::error_with_code(
                    "SW3001",
                    format!("'{}' is reserved for tracing", id.name),
                    id.span,
                )
                .with_label("reserved identifier")
                .with_help("rename this binding"),
            );
        }
    }

    fn block(&mut self, block: &Block) {
        for stmt in &block.statements {
            self.stmt(stmt);
        }
    }

    fn function(&mut self, func: &Function) {
        self.has_closures = true;
        if let Some(name) = &func.name {
            self.name(name);
        }
        for param in &func.params {
            self.name(param);
        }
        match &func.body {
            FunctionBody::Block(block) => self.block(block),
            FunctionBody::Expr(expr) => self.expr(expr),
        }
    }

    fn target(&mut self, target: &AssignTarget) {
        match target {
            AssignTarget::Identifier(id) => self.name(id),
            AssignTarget::Member(member) => self.expr(&member.object),
            AssignTarget::Index(index) => {
                self.expr(&index.object);
                self.expr(&index.index);
            }
        }
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl(decl) => {
                for declarator in &decl.declarators {
                    self.name(&declarator.name);
                    if let Some(init) = &declarator.init {
                        self.expr(init);
                    }
                }
            }
            Stmt::FunctionDecl(func) => self.function(func),
            Stmt::ClassDecl(class) => {
                self.name(&class.name);
                for method in &class.methods {
                    self.function(&method.function);
                }
            }
            Stmt::Assign(assign) => {
                self.target(&assign.target);
                self.expr(&assign.value);
            }
            Stmt::Update(update) => self.target(&update.target),
            Stmt::If(if_stmt) => {
                self.expr(&if_stmt.cond);
                self.stmt(&if_stmt.then_branch);
                if let Some(else_branch) = &if_stmt.else_branch {
                    self.stmt(else_branch);
                }
            }
            Stmt::While(while_stmt) => {
                self.expr(&while_stmt.cond);
                self.stmt(&while_stmt.body);
            }
            Stmt::For(for_stmt) => {
                if let Some(init) = &for_stmt.init {
                    self.stmt(init);
                }
                if let Some(cond) = &for_stmt.cond {
                    self.expr(cond);
                }
                if let Some(update) = &for_stmt.update {
                    self.stmt(update);
                }
                self.stmt(&for_stmt.body);
            }
            Stmt::ForOf(for_of) => {
                self.name(&for_of.binding);
                self.expr(&for_of.iterable);
                self.stmt(&for_of.body);
            }
            Stmt::Return(ret) => {
                if let Some(value) = &ret.value {
                    self.expr(value);
                }
            }
            Stmt::Break(jump) | Stmt::Continue(jump) => {
                if let Some(label) = &jump.label {
                    self.name(label);
                }
            }
            Stmt::Throw(throw) => self.expr(&throw.value),
            Stmt::Block(block) => self.block(block),
            Stmt::Labeled(labeled) => {
                self.name(&labeled.label);
                self.stmt(&labeled.body);
            }
            Stmt::Expr(expr_stmt) => self.expr(&expr_stmt.expr),
            Stmt::Empty(_) => {}
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(..) | Expr::This(_) => {}
            Expr::Identifier(id) => self.name(id),
            Expr::Array(array) => {
                for element in &array.elements {
                    self.expr(element);
                }
            }
            Expr::Object(object) => {
                for property in &object.properties {
                    self.expr(&property.value);
                }
            }
            Expr::Function(func) => self.function(func),
            Expr::Unary(unary) => self.expr(&unary.expr),
            Expr::Binary(binary) => {
                self.expr(&binary.left);
                self.expr(&binary.right);
            }
            Expr::Conditional(cond) => {
                self.expr(&cond.cond);
                self.expr(&cond.then_expr);
                self.expr(&cond.else_expr);
            }
            Expr::Call(call) => {
                if expr.callee_name() == Some(RECORD_FN) {
                    self.has_probes = true;
                } else {
                    self.expr(&call.callee);
                }
                for arg in &call.args {
                    self.expr(arg);
                }
            }
            Expr::New(new) => {
                self.expr(&new.callee);
                for arg in &new.args {
                    self.expr(arg);
                }
            }
            Expr::Member(member) => self.expr(&member.object),
            Expr::Index(index) => {
                self.expr(&index.object);
                self.expr(&index.index);
            }
            Expr::Group(group) => self.expr(&group.expr),
        }
    }
}
