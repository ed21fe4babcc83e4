//! Lexical environments
//!
//! Scopes form a parent-linked chain shared through `Rc<RefCell<_>>` so that
//! closures keep the scope they were created in alive. The global scope and
//! each call's scope are function scopes: `var` declarations land there
//! rather than in the block they are written in.

use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub type Env = Rc<RefCell<Environment>>;

struct Binding {
    value: Value,
    mutable: bool,
}

/// One scope level
#[derive(Default)]
pub struct Environment {
    vars: HashMap<String, Binding>,
    parent: Option<Env>,
    function_scope: bool,
}

/// Why a write to a binding failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignError {
    Undeclared,
    Constant,
}

impl Environment {
    /// Root scope
    pub fn global() -> Env {
        Rc::new(RefCell::new(Environment {
            function_scope: true,
            ..Environment::default()
        }))
    }

    /// New block scope nested in `parent`
    pub fn child(parent: &Env) -> Env {
        Rc::new(RefCell::new(Environment {
            vars: HashMap::new(),
            parent: Some(Rc::clone(parent)),
            function_scope: false,
        }))
    }

    /// Scope of one function call, nested in the closure's scope
    pub fn function(parent: &Env) -> Env {
        Rc::new(RefCell::new(Environment {
            vars: HashMap::new(),
            parent: Some(Rc::clone(parent)),
            function_scope: true,
        }))
    }

    /// Nearest enclosing function scope, where `var` bindings live
    pub fn var_scope(env: &Env) -> Env {
        let mut current = Rc::clone(env);
        loop {
            let parent = {
                let scope = current.borrow();
                if scope.function_scope {
                    break;
                }
                scope.parent.clone()
            };
            match parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// Create or shadow a binding in this scope
    pub fn declare(&mut self, name: impl Into<String>, value: Value, mutable: bool) {
        self.vars.insert(name.into(), Binding { value, mutable });
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// Look a name up along the scope chain
    pub fn lookup(env: &Env, name: &str) -> Option<Value> {
        let mut current = Rc::clone(env);
        loop {
            if let Some(binding) = current.borrow().vars.get(name) {
                return Some(binding.value.clone());
            }
            let parent = current.borrow().parent.clone();
            current = parent?;
        }
    }

    /// Overwrite the nearest binding of `name`
    pub fn assign(env: &Env, name: &str, value: Value) -> Result<(), AssignError> {
        let mut current = Rc::clone(env);
        loop {
            {
                let mut scope = current.borrow_mut();
                if let Some(binding) = scope.vars.get_mut(name) {
                    if !binding.mutable {
                        return Err(AssignError::Constant);
                    }
                    binding.value = value;
                    return Ok(());
                }
            }
            let parent = current.borrow().parent.clone();
            current = parent.ok_or(AssignError::Undeclared)?;
        }
    }
}
