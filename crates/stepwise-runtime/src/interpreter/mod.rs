//! AST interpreter (tree-walking)
//!
//! Runs instrumented programs inside the sandbox. Supports:
//! - Lexically scoped closures over a parent-linked environment chain
//! - Classes with constructors and methods, `new` and `this`
//! - Labeled break/continue, return and throw
//! - A step budget, a wall-clock budget and a call depth limit
//!
//! The only ambient bindings are the small standard library in [`builtins`]
//! and, once installed by the sandbox, the probe runtime.

mod builtins;
mod environment;
mod expr;
mod stmt;

pub use environment::{AssignError, Env, Environment};

use crate::ast::{Function, FunctionBody, Program};
use crate::probe::ProbeRecorder;
use crate::sandbox::{ResourceQuotas, ResourceUsage};
use crate::span::Span;
use crate::value::{Class, Closure, Object, RuntimeError, Value};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Longest string a program may build, in bytes
pub(super) const MAX_STRING_LEN: usize = 1 << 24;

/// Most elements a single array may hold
pub(super) const MAX_ARRAY_LEN: usize = 1 << 20;

/// Control flow signal for handling break, continue, and return
#[derive(Debug, Clone, PartialEq)]
pub(super) enum ControlFlow {
    None,
    Break(Option<String>),
    Continue(Option<String>),
    Return(Value),
}

/// Interpreter state
pub struct Interpreter {
    /// Global scope
    pub(super) globals: Env,
    /// Innermost active scope
    pub(super) env: Env,
    /// Receiver of the running function
    pub(super) this_value: Value,
    /// Current control flow state
    pub(super) control_flow: ControlFlow,
    quotas: ResourceQuotas,
    usage: ResourceUsage,
    recorder: ProbeRecorder,
}

impl Interpreter {
    /// Create an interpreter without resource limits
    pub fn new() -> Self {
        Self::with_quotas(ResourceQuotas::unlimited())
    }

    /// Create an interpreter enforcing `quotas`
    pub fn with_quotas(quotas: ResourceQuotas) -> Self {
        let globals = Environment::global();
        let mut interpreter = Self {
            env: Rc::clone(&globals),
            globals,
            this_value: Value::Undefined,
            control_flow: ControlFlow::None,
            quotas,
            usage: ResourceUsage::new(),
            recorder: ProbeRecorder::default(),
        };
        builtins::install(&mut interpreter);
        interpreter
    }

    /// Define a global binding
    pub fn define_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.borrow_mut().declare(name, value, true);
    }

    /// Read a global binding
    pub fn global(&self, name: &str) -> Option<Value> {
        Environment::lookup(&self.globals, name)
    }

    /// Install the probe runtime, replacing any previous recorder
    pub fn install_probe_runtime(&mut self, recorder: ProbeRecorder) {
        self.recorder = recorder;
        crate::probe::install(self);
    }

    pub fn recorder(&self) -> &ProbeRecorder {
        &self.recorder
    }

    pub fn recorder_mut(&mut self) -> &mut ProbeRecorder {
        &mut self.recorder
    }

    /// Steps executed so far
    pub fn steps(&self) -> u64 {
        self.usage.steps
    }

    /// Run a program to completion or the first uncaught error
    pub fn eval(&mut self, program: &Program) -> Result<(), RuntimeError> {
        self.usage = ResourceUsage::new();
        self.exec_statements(&program.statements)?;

        match std::mem::replace(&mut self.control_flow, ControlFlow::None) {
            ControlFlow::None => Ok(()),
            flow => Err(illegal_jump(&flow, Span::dummy())),
        }
    }

    /// Count one step against the budgets
    pub(super) fn tick(&mut self, span: Span) -> Result<(), RuntimeError> {
        self.usage.steps += 1;

        if let Some(budget) = self.quotas.step_budget {
            if self.usage.steps > budget {
                return Err(RuntimeError::StepBudgetExceeded { budget, span });
            }
        }

        if let Some(limit) = self.quotas.time_limit {
            if self.usage.elapsed() > limit {
                return Err(RuntimeError::TimeLimitExceeded {
                    limit_ms: limit.as_millis() as u64,
                    span,
                });
            }
        }

        Ok(())
    }

    /// Call any callable value
    pub(crate) fn call_function(
        &mut self,
        callee: &Value,
        this: Value,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match callee {
            Value::Function(closure) => self.call_closure(closure, this, args, span),
            Value::Native(native) => (native.func)(self, &this, args, span),
            Value::Class(class) => Err(RuntimeError::type_error(
                format!(
                    "Class constructor {} cannot be invoked without 'new'",
                    class.name
                ),
                span,
            )),
            other => Err(RuntimeError::type_error(
                format!("{} is not a function", other.type_name()),
                span,
            )),
        }
    }

    fn call_closure(
        &mut self,
        closure: &Rc<Closure>,
        this: Value,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        if let Some(limit) = self.quotas.max_call_depth {
            if self.usage.call_depth >= limit {
                return Err(RuntimeError::StackOverflow { limit, span });
            }
        }
        self.usage.call_depth += 1;

        let scope = Environment::function(&closure.env);
        {
            let mut scope = scope.borrow_mut();
            let mut args = args.into_iter();
            for param in &closure.function.params {
                scope.declare(
                    param.name.clone(),
                    args.next().unwrap_or(Value::Undefined),
                    true,
                );
            }
        }

        let this = closure.bound_this.clone().unwrap_or(this);
        let saved_env = std::mem::replace(&mut self.env, scope);
        let saved_this = std::mem::replace(&mut self.this_value, this);

        let result = self.run_function_body(&closure.function.body);

        self.env = saved_env;
        self.this_value = saved_this;
        self.usage.call_depth -= 1;
        result
    }

    fn run_function_body(&mut self, body: &FunctionBody) -> Result<Value, RuntimeError> {
        match body {
            FunctionBody::Expr(expr) => self.eval_expr(expr),
            FunctionBody::Block(block) => {
                self.exec_statements(&block.statements)?;
                match std::mem::replace(&mut self.control_flow, ControlFlow::None) {
                    ControlFlow::None => Ok(Value::Undefined),
                    ControlFlow::Return(value) => Ok(value),
                    flow => Err(illegal_jump(&flow, block.span)),
                }
            }
        }
    }

    /// `new callee(args)`
    pub(super) fn construct(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        span: Span,
    ) -> Result<Value, RuntimeError> {
        match callee {
            Value::Class(class) => {
                let instance = Value::Object(Rc::new(RefCell::new(Object {
                    class: Some(Rc::clone(class)),
                    properties: IndexMap::new(),
                })));
                if let Some(constructor) = &class.constructor {
                    let result = self.call_closure(constructor, instance.clone(), args, span)?;
                    if matches!(result, Value::Object(_) | Value::Array(_)) {
                        return Ok(result);
                    }
                }
                Ok(instance)
            }
            Value::Native(native) => (native.func)(self, &Value::Undefined, args, span),
            Value::Function(closure) if !closure.function.is_arrow => {
                let instance = Value::object(IndexMap::new());
                let result = self.call_closure(closure, instance.clone(), args, span)?;
                if matches!(result, Value::Object(_) | Value::Array(_)) {
                    return Ok(result);
                }
                Ok(instance)
            }
            other => Err(RuntimeError::type_error(
                format!("{} is not a constructor", other.type_name()),
                span,
            )),
        }
    }

    /// Create a closure over the current scope
    pub(super) fn make_closure(&self, function: &Function, name: String) -> Value {
        let bound_this = function.is_arrow.then(|| self.this_value.clone());
        Value::Function(Rc::new(Closure {
            name,
            function: Rc::new(function.clone()),
            env: Rc::clone(&self.env),
            bound_this,
        }))
    }

    /// Create a class value from its methods
    pub(super) fn make_class(&self, name: &str, methods: &[crate::ast::Method]) -> Value {
        let mut constructor = None;
        let mut table = IndexMap::new();
        for method in methods {
            let closure = Rc::new(Closure {
                name: method.name.name.clone(),
                function: Rc::new(method.function.clone()),
                env: Rc::clone(&self.env),
                bound_this: None,
            });
            if method.name.name == "constructor" {
                constructor = Some(closure);
            } else {
                table.insert(method.name.name.clone(), closure);
            }
        }
        Value::Class(Rc::new(Class {
            name: name.to_string(),
            constructor,
            methods: table,
        }))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

pub(super) fn check_string_len(len: usize, span: Span) -> Result<(), RuntimeError> {
    if len > MAX_STRING_LEN {
        return Err(RuntimeError::RangeError {
            msg: "Invalid string length".to_string(),
            span,
        });
    }
    Ok(())
}

pub(super) fn check_array_len(len: usize, span: Span) -> Result<(), RuntimeError> {
    if len > MAX_ARRAY_LEN {
        return Err(RuntimeError::RangeError {
            msg: "Invalid array length".to_string(),
            span,
        });
    }
    Ok(())
}

fn illegal_jump(flow: &ControlFlow, span: Span) -> RuntimeError {
    let msg = match flow {
        ControlFlow::Break(Some(label)) | ControlFlow::Continue(Some(label)) => {
            format!("Undefined label '{}'", label)
        }
        ControlFlow::Break(None) => "Illegal break statement".to_string(),
        ControlFlow::Continue(None) => "Illegal continue statement".to_string(),
        ControlFlow::Return(_) | ControlFlow::None => "Illegal return statement".to_string(),
    };
    RuntimeError::SyntaxError { msg, span }
}
