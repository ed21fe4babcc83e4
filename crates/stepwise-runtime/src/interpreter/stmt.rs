//! Statement execution

use crate::ast::*;
use crate::interpreter::{ControlFlow, Env, Environment, Interpreter};
use crate::snapshot::TraceValue;
use crate::value::{RuntimeError, Value};
use std::rc::Rc;

impl Interpreter {
    /// Execute a statement list in the current scope, hoisting function declarations
    pub(super) fn exec_statements(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in statements {
            if let Stmt::FunctionDecl(func) = stmt {
                self.declare_function(func);
            }
        }

        for stmt in statements {
            self.eval_statement(stmt)?;
            if self.control_flow != ControlFlow::None {
                break;
            }
        }
        Ok(())
    }

    /// Execute a statement
    pub(super) fn eval_statement(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        self.tick(stmt.span())?;

        match stmt {
            Stmt::VarDecl(decl) => self.eval_var_decl(decl),
            Stmt::FunctionDecl(func) => {
                let name = func.name.as_ref().map(|n| n.name.as_str()).unwrap_or("");
                if !self.env.borrow().contains_local(name) {
                    self.declare_function(func);
                }
                Ok(())
            }
            Stmt::ClassDecl(class) => {
                let value = self.make_class(&class.name.name, &class.methods);
                self.env
                    .borrow_mut()
                    .declare(class.name.name.clone(), value, true);
                Ok(())
            }
            Stmt::Assign(assign) => self.eval_assign(assign),
            Stmt::Update(update) => self.eval_update(update).map(|_| ()),
            Stmt::If(if_stmt) => self.eval_if(if_stmt),
            Stmt::While(_) | Stmt::For(_) | Stmt::ForOf(_) => self.eval_loop(stmt, None),
            Stmt::Return(ret) => {
                let value = match &ret.value {
                    Some(expr) => self.eval_expr(expr)?,
                    None => Value::Undefined,
                };
                self.control_flow = ControlFlow::Return(value);
                Ok(())
            }
            Stmt::Break(jump) => {
                self.control_flow =
                    ControlFlow::Break(jump.label.as_ref().map(|l| l.name.clone()));
                Ok(())
            }
            Stmt::Continue(jump) => {
                self.control_flow =
                    ControlFlow::Continue(jump.label.as_ref().map(|l| l.name.clone()));
                Ok(())
            }
            Stmt::Throw(throw) => {
                let value = self.eval_expr(&throw.value)?;
                Err(RuntimeError::Thrown {
                    message: describe_thrown(&value),
                    span: throw.span,
                })
            }
            Stmt::Block(block) => self.eval_block(block),
            Stmt::Labeled(labeled) => self.eval_labeled(labeled),
            Stmt::Expr(expr_stmt) => self.eval_expr(&expr_stmt.expr).map(|_| ()),
            Stmt::Empty(_) => Ok(()),
        }
    }

    fn declare_function(&mut self, func: &Function) {
        if let Some(name) = &func.name {
            let closure = self.make_closure(func, name.name.clone());
            self.env.borrow_mut().declare(name.name.clone(), closure, true);
        }
    }

    /// Run `f` with `scope` as the innermost environment
    pub(super) fn in_scope<T>(
        &mut self,
        scope: Env,
        f: impl FnOnce(&mut Self) -> Result<T, RuntimeError>,
    ) -> Result<T, RuntimeError> {
        let saved = std::mem::replace(&mut self.env, scope);
        let result = f(self);
        self.env = saved;
        result
    }

    fn eval_block(&mut self, block: &Block) -> Result<(), RuntimeError> {
        let scope = Environment::child(&self.env);
        self.in_scope(scope, |interp| interp.exec_statements(&block.statements))
    }

    fn eval_var_decl(&mut self, decl: &VarDecl) -> Result<(), RuntimeError> {
        let mutable = decl.kind != DeclKind::Const;
        let scope = match decl.kind {
            DeclKind::Var => Environment::var_scope(&self.env),
            DeclKind::Let | DeclKind::Const => Rc::clone(&self.env),
        };
        for declarator in &decl.declarators {
            let name = &declarator.name.name;
            let value = match &declarator.init {
                Some(init) => self.eval_named(init, name)?,
                // `var x;` keeps an existing value
                None if decl.kind == DeclKind::Var && scope.borrow().contains_local(name) => {
                    continue
                }
                None => Value::Undefined,
            };
            scope.borrow_mut().declare(name.clone(), value, mutable);
        }
        Ok(())
    }

    fn eval_if(&mut self, if_stmt: &IfStmt) -> Result<(), RuntimeError> {
        if self.eval_expr(&if_stmt.cond)?.is_truthy() {
            self.eval_statement(&if_stmt.then_branch)
        } else if let Some(else_branch) = &if_stmt.else_branch {
            self.eval_statement(else_branch)
        } else {
            Ok(())
        }
    }

    fn eval_labeled(&mut self, labeled: &LabeledStmt) -> Result<(), RuntimeError> {
        let label = labeled.label.name.as_str();
        if labeled.body.is_loop() {
            self.eval_loop(&labeled.body, Some(label))?;
        } else {
            self.eval_statement(&labeled.body)?;
        }

        if let ControlFlow::Break(Some(target)) = &self.control_flow {
            if target == label {
                self.control_flow = ControlFlow::None;
            }
        }
        Ok(())
    }

    fn eval_loop(&mut self, stmt: &Stmt, label: Option<&str>) -> Result<(), RuntimeError> {
        match stmt {
            Stmt::While(while_stmt) => self.eval_while(while_stmt, label),
            Stmt::For(for_stmt) => {
                let scope = Environment::child(&self.env);
                self.in_scope(scope, |interp| interp.eval_for(for_stmt, label))
            }
            Stmt::ForOf(for_of) => self.eval_for_of(for_of, label),
            other => self.eval_statement(other),
        }
    }

    fn eval_while(
        &mut self,
        while_stmt: &WhileStmt,
        label: Option<&str>,
    ) -> Result<(), RuntimeError> {
        loop {
            self.tick(while_stmt.span)?;
            if !self.eval_expr(&while_stmt.cond)?.is_truthy() {
                break;
            }
            self.eval_statement(&while_stmt.body)?;
            if self.finish_iteration(label) {
                break;
            }
        }
        Ok(())
    }

    fn eval_for(&mut self, for_stmt: &ForStmt, label: Option<&str>) -> Result<(), RuntimeError> {
        if let Some(init) = &for_stmt.init {
            self.eval_statement(init)?;
        }

        // Each iteration sees its own copy of the head's `let` bindings
        let head = Rc::clone(&self.env);
        let copied = per_iteration_bindings(for_stmt.init.as_deref());
        let mut iteration = copy_bindings(&head, &head, &copied);

        loop {
            self.tick(for_stmt.span)?;
            let finished = self.in_scope(Rc::clone(&iteration), |interp| {
                if let Some(cond) = &for_stmt.cond {
                    if !interp.eval_expr(cond)?.is_truthy() {
                        return Ok(true);
                    }
                }
                interp.eval_statement(&for_stmt.body)?;
                Ok(interp.finish_iteration(label))
            })?;
            if finished {
                break;
            }

            iteration = copy_bindings(&head, &iteration, &copied);
            if let Some(update) = &for_stmt.update {
                self.in_scope(Rc::clone(&iteration), |interp| interp.eval_statement(update))?;
            }
        }
        Ok(())
    }

    fn eval_for_of(
        &mut self,
        for_of: &ForOfStmt,
        label: Option<&str>,
    ) -> Result<(), RuntimeError> {
        let iterable = self.eval_expr(&for_of.iterable)?;
        let mutable = for_of.kind != DeclKind::Const;

        let mut index = 0;
        loop {
            let item = match &iterable {
                Value::Array(items) => items.borrow().get(index).cloned(),
                Value::String(s) => s.chars().nth(index).map(|c| Value::string(c.to_string())),
                other => {
                    return Err(RuntimeError::type_error(
                        format!("{} is not iterable", other.type_name()),
                        for_of.iterable.span(),
                    ))
                }
            };
            let Some(item) = item else {
                break;
            };
            index += 1;

            self.tick(for_of.span)?;
            let scope = Environment::child(&self.env);
            scope
                .borrow_mut()
                .declare(for_of.binding.name.clone(), item, mutable);
            self.in_scope(scope, |interp| interp.eval_statement(&for_of.body))?;
            if self.finish_iteration(label) {
                break;
            }
        }
        Ok(())
    }

    /// Settle break/continue after a loop body; true when the loop has to stop
    fn finish_iteration(&mut self, label: Option<&str>) -> bool {
        let targets_this_loop = |target: &Option<String>| match target {
            None => true,
            Some(name) => Some(name.as_str()) == label,
        };

        match &self.control_flow {
            ControlFlow::None => false,
            ControlFlow::Break(target) if targets_this_loop(target) => {
                self.control_flow = ControlFlow::None;
                true
            }
            ControlFlow::Continue(target) if targets_this_loop(target) => {
                self.control_flow = ControlFlow::None;
                false
            }
            _ => true,
        }
    }

    /// Evaluate an initializer, naming anonymous functions after their binding
    pub(super) fn eval_named(&mut self, expr: &Expr, name: &str) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Function(func) if func.name.is_none() => {
                Ok(self.make_closure(func, name.to_string()))
            }
            Expr::Group(group) => self.eval_named(&group.expr, name),
            other => self.eval_expr(other),
        }
    }
}

/// Message for an uncaught `throw`
/// Bindings a `let` or `const` loop head declares, with their mutability
fn per_iteration_bindings(init: Option<&Stmt>) -> Vec<(String, bool)> {
    match init {
        Some(Stmt::VarDecl(decl)) if decl.kind != DeclKind::Var => decl
            .declarators
            .iter()
            .map(|d| (d.name.name.clone(), decl.kind == DeclKind::Let))
            .collect(),
        _ => Vec::new(),
    }
}

/// Fresh scope under `head` holding the current values of `names`
fn copy_bindings(head: &Env, from: &Env, names: &[(String, bool)]) -> Env {
    let scope = Environment::child(head);
    {
        let mut scope = scope.borrow_mut();
        for (name, mutable) in names {
            let value = Environment::lookup(from, name).unwrap_or(Value::Undefined);
            scope.declare(name.clone(), value, *mutable);
        }
    }
    scope
}

fn describe_thrown(value: &Value) -> String {
    if let Value::Object(object) = value {
        let object = object.borrow();
        if let Some(message) = object.properties.get("message") {
            let name = object
                .properties
                .get("name")
                .map(|n| n.to_js_string())
                .unwrap_or_else(|| "Error".to_string());
            return format!("{}: {}", name, message.to_js_string());
        }
    }
    TraceValue::capture(value, 4).display()
}
