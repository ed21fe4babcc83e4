//! Runtime values for the sandboxed interpreter
//!
//! Arrays and objects have reference semantics (`Rc<RefCell<_>>`), matching the
//! aliasing behaviour of the traced language. Values never leave the sandbox
//! thread: anything that has to survive execution is captured into a
//! [`TraceValue`](crate::snapshot::TraceValue) first.

use crate::ast::Function;
use crate::interpreter::{Env, Interpreter};
use crate::printer::format_number;
use crate::snapshot::TraceValue;
use crate::span::Span;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

pub type ArrayRef = Rc<RefCell<Vec<Value>>>;
pub type ObjectRef = Rc<RefCell<Object>>;

/// Signature shared by built-in functions: interpreter, receiver, arguments, call site
pub type NativeFn = fn(&mut Interpreter, &Value, Vec<Value>, Span) -> Result<Value, RuntimeError>;

/// Plain object or class instance
#[derive(Default)]
pub struct Object {
    pub class: Option<Rc<Class>>,
    pub properties: IndexMap<String, Value>,
}

impl Object {
    pub fn with_properties(properties: IndexMap<String, Value>) -> Self {
        Self {
            class: None,
            properties,
        }
    }
}

/// A user function together with the environment it closes over
pub struct Closure {
    pub name: String,
    pub function: Rc<Function>,
    pub env: Env,
    /// Arrow functions capture `this` when they are created
    pub bound_this: Option<Value>,
}

/// Class created by a class declaration
pub struct Class {
    pub name: String,
    pub constructor: Option<Rc<Closure>>,
    pub methods: IndexMap<String, Rc<Closure>>,
}

/// Built-in function
pub struct NativeFunction {
    pub name: &'static str,
    pub func: NativeFn,
}

/// Runtime value
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(ArrayRef),
    Object(ObjectRef),
    Function(Rc<Closure>),
    Native(Rc<NativeFunction>),
    Class(Rc<Class>),
    /// Frozen copy produced by the probe runtime's snapshot function
    Snapshot(Rc<TraceValue>),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    pub fn array(values: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(values)))
    }

    pub fn object(properties: IndexMap<String, Value>) -> Self {
        Value::Object(Rc::new(RefCell::new(Object::with_properties(properties))))
    }

    pub fn native(name: &'static str, func: NativeFn) -> Self {
        Value::Native(Rc::new(NativeFunction { name, func }))
    }

    /// Result of the `typeof` operator
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) | Value::Object(_) | Value::Snapshot(_) => "object",
            Value::Function(_) | Value::Native(_) | Value::Class(_) => "function",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Snapshot(snapshot) => snapshot.is_truthy(),
            _ => true,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    /// Numeric conversion used by arithmetic and comparisons
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => parse_numeric_string(s),
            Value::Array(_) => parse_numeric_string(&self.to_js_string()),
            _ => f64::NAN,
        }
    }

    /// String conversion used by concatenation and `String(x)`
    pub fn to_js_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.to_string(),
            Value::Array(items) => items
                .borrow()
                .iter()
                .map(|v| {
                    if v.is_nullish() {
                        String::new()
                    } else {
                        v.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
            Value::Function(closure) => format!("function {}() {{ ... }}", closure.name),
            Value::Native(native) => format!("function {}() {{ [native code] }}", native.name),
            Value::Class(class) => format!("class {} {{ ... }}", class.name),
            Value::Snapshot(snapshot) => snapshot.display(),
        }
    }

    /// `===`
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            (Value::Native(a), Value::Native(b)) => Rc::ptr_eq(a, b),
            (Value::Class(a), Value::Class(b)) => Rc::ptr_eq(a, b),
            (Value::Snapshot(a), Value::Snapshot(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==`
    pub fn loose_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Value::Number(_), Value::String(_))
            | (Value::String(_), Value::Number(_))
            | (Value::Bool(_), _)
            | (_, Value::Bool(_)) => self.to_number() == other.to_number(),
            (Value::Array(_), Value::String(_)) | (Value::Array(_), Value::Number(_)) => {
                Value::string(self.to_js_string()).loose_equals(other)
            }
            (Value::String(_), Value::Array(_)) | (Value::Number(_), Value::Array(_)) => {
                other.loose_equals(self)
            }
            _ => self.strict_equals(other),
        }
    }
}

/// `Number("  12 ")` style parsing: blank is zero, garbage is NaN
pub fn parse_numeric_string(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ => trimmed.parse::<f64>().unwrap_or(f64::NAN),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_js_string())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Array(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            Value::Object(object) => {
                let object = object.borrow();
                let mut map = f.debug_map();
                for (key, value) in &object.properties {
                    map.entry(key, value);
                }
                map.finish()
            }
            other => write!(f, "{}", other.to_js_string()),
        }
    }
}

/// Runtime errors raised while executing a snippet
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Operation applied to a value of the wrong type
    #[error("TypeError: {msg}")]
    TypeError { msg: String, span: Span },
    /// Read or write of a name that was never declared
    #[error("ReferenceError: {name} is not defined")]
    ReferenceError { name: String, span: Span },
    /// Invalid numeric argument (e.g. a negative repeat count)
    #[error("RangeError: {msg}")]
    RangeError { msg: String, span: Span },
    /// `break`/`continue` with no matching target
    #[error("SyntaxError: {msg}")]
    SyntaxError { msg: String, span: Span },
    /// Value thrown by user code and never caught
    #[error("Uncaught {message}")]
    Thrown { message: String, span: Span },
    /// Call depth limit reached
    #[error("RangeError: Maximum call stack size exceeded (limit {limit})")]
    StackOverflow { limit: usize, span: Span },
    /// Step budget used up
    #[error("step budget of {budget} exhausted")]
    StepBudgetExceeded { budget: u64, span: Span },
    /// Wall-clock budget used up
    #[error("time budget of {limit_ms} ms exhausted")]
    TimeLimitExceeded { limit_ms: u64, span: Span },
    /// Too many probe events recorded
    #[error("event limit of {limit} exceeded")]
    EventLimitExceeded { limit: usize, span: Span },
}

impl RuntimeError {
    /// Get the source span for this error
    pub fn span(&self) -> Span {
        match self {
            RuntimeError::TypeError { span, .. }
            | RuntimeError::ReferenceError { span, .. }
            | RuntimeError::RangeError { span, .. }
            | RuntimeError::SyntaxError { span, .. }
            | RuntimeError::Thrown { span, .. }
            | RuntimeError::StackOverflow { span, .. }
            | RuntimeError::StepBudgetExceeded { span, .. }
            | RuntimeError::TimeLimitExceeded { span, .. }
            | RuntimeError::EventLimitExceeded { span, .. } => *span,
        }
    }

    /// Budget errors mean the program did not finish, not that it failed
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            RuntimeError::StepBudgetExceeded { .. }
                | RuntimeError::TimeLimitExceeded { .. }
                | RuntimeError::EventLimitExceeded { .. }
        )
    }

    pub fn type_error(msg: impl Into<String>, span: Span) -> Self {
        RuntimeError::TypeError {
            msg: msg.into(),
            span,
        }
    }
}
