//! Variable environment for cipr
//!
//! A chain of scopes. Blocks and calls push a child scope; closures hold a
//! shared handle to the scope they were declared in, which keeps it alive
//! after the declaring block exits.
//!
//! A function is bound in the scope it captures, so that scope and the
//! function keep each other alive. Such cycles are never freed.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{CiprError, ErrorKind, Result};
use crate::token::Token;
use crate::value::Value;

/// Shared handle to a scope
pub type Env = Rc<RefCell<Environment>>;

/// One lexical scope
#[derive(Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    parent: Option<Env>,
}

impl Environment {
    /// Create a new global environment
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh global scope behind a shared handle
    pub fn global() -> Env {
        Rc::new(RefCell::new(Self::new()))
    }

    /// A fresh scope whose parent is `parent`
    pub fn child(parent: &Env) -> Env {
        Rc::new(RefCell::new(Self {
            values: HashMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }

    /// Bind `name` in this scope, replacing any existing binding here.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Look `name` up through the chain.
    pub fn get(&self, name: &Token) -> Result<Value> {
        self.lookup(&name.lexeme)
            .ok_or_else(|| CiprError::at(ErrorKind::UndefinedVariable(name.lexeme.clone()), name))
    }

    /// Like [`get`](Self::get), by plain name.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            Some(value.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().lookup(name)
        } else {
            None
        }
    }

    /// Overwrite the nearest existing binding of `name`. Never creates one.
    pub fn assign(&mut self, name: &Token, value: Value) -> Result<()> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = value;
            Ok(())
        } else if let Some(parent) = &self.parent {
            parent.borrow_mut().assign(name, value)
        } else {
            Err(CiprError::at(ErrorKind::UndefinedVariable(name.lexeme.clone()), name))
        }
    }

    /// Whether this scope itself (not a parent) binds `name`.
    pub fn defines_locally(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }
}
