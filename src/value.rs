//! Runtime value types for cipr

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::ast::NodeId;
use crate::environment::{Env, Environment};
use crate::error::Result;
use crate::interpreter::{Flow, Interpreter};
use crate::stack::ensure_sufficient_stack;

/// Shared, mutable array storage. Cloning the handle aliases the array.
pub type Array = Rc<RefCell<Vec<Value>>>;

/// Anything the language can call: user functions and host natives.
pub trait Callable {
    /// Exact number of arguments a call must supply.
    fn arity(&self) -> usize;

    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value>;

    /// Text shown when the callable itself is stringified.
    fn describe(&self) -> String;
}

/// Runtime values in cipr
#[derive(Clone)]
pub enum Value {
    Nothing,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Array(Array),
    Callable(Rc<dyn Callable>),
}

impl Value {
    /// A freshly allocated array holding `items`.
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn string(text: impl AsRef<str>) -> Self {
        Value::String(Rc::from(text.as_ref()))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nothing => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Callable(_) => "function",
        }
    }

    /// `null` and `false` are falsy, as is the number `0`. Everything else,
    /// including empty strings and arrays, is truthy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nothing => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Shortest decimal text that round-trips, without a trailing `.0`.
pub fn format_number(n: f64) -> String {
    format!("{}", n)
}

fn write_value(f: &mut fmt::Formatter<'_>, value: &Value, open: &mut Vec<*const ()>) -> fmt::Result {
    match value {
        Value::Nothing => write!(f, "null"),
        Value::Bool(b) => write!(f, "{}", b),
        Value::Number(n) => write!(f, "{}", format_number(*n)),
        Value::String(s) => write!(f, "{}", s),
        Value::Callable(callable) => write!(f, "{}", callable.describe()),
        Value::Array(items) => {
            let ptr = Rc::as_ptr(items) as *const ();
            // An array reachable from itself
            if open.contains(&ptr) {
                return write!(f, "[...]");
            }
            open.push(ptr);
            write!(f, "[")?;
            for (i, item) in items.borrow().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                ensure_sufficient_stack(|| write_value(f, item, open))?;
            }
            open.pop();
            write!(f, "]")
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_value(f, self, &mut Vec::new())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s.as_ref()),
            other => write!(f, "{}", other),
        }
    }
}

/// Values of different types are never equal. Arrays and callables compare
/// by identity: two handles are equal only if they share the same storage.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nothing, Value::Nothing) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Callable(a), Value::Callable(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::array(items)
    }
}

/// User-defined function
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    /// The body block
    pub body: NodeId,
    /// Scope active where the function was declared
    pub closure: Env,
}

impl Callable for Function {
    fn arity(&self) -> usize {
        self.params.len()
    }

    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
        let scope = Environment::child(&self.closure);
        {
            let mut scope = scope.borrow_mut();
            for (param, arg) in self.params.iter().zip(args) {
                scope.define(param.clone(), arg);
            }
        }

        match interpreter.execute_body(self.body, scope)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::Nothing),
        }
    }

    fn describe(&self) -> String {
        format!("<fn {}>", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_print_shortest_form() {
        assert_eq!(Value::Number(5.0).to_string(), "5");
        assert_eq!(Value::Number(3.14).to_string(), "3.14");
        assert_eq!(Value::Number(-0.5).to_string(), "-0.5");
        assert_eq!(Value::Number(0.1 + 0.2).to_string(), "0.30000000000000004");
        assert_eq!(Value::Number(1e21).to_string(), "1000000000000000000000");
    }

    #[test]
    fn stringify_each_variant() {
        assert_eq!(Value::Nothing.to_string(), "null");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::from("hi").to_string(), "hi");
        let nested = Value::array(vec![1.0.into(), "a".into(), Value::array(vec![])]);
        assert_eq!(nested.to_string(), "[1, a, []]");
    }

    #[test]
    fn self_containing_array_prints() {
        let arr = Value::array(vec![1.0.into()]);
        if let Value::Array(items) = &arr {
            items.borrow_mut().push(arr.clone());
        }
        assert_eq!(arr.to_string(), "[1, [...]]");
        // Break the cycle so the test doesn't leak
        if let Value::Array(items) = &arr {
            items.borrow_mut().clear();
        }
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Nothing.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::Number(0.0).is_truthy());
        assert!(!Value::Number(-0.0).is_truthy());
        assert!(Value::Number(0.5).is_truthy());
        assert!(Value::from("").is_truthy());
        assert!(Value::array(vec![]).is_truthy());
    }

    #[test]
    fn equality_rules() {
        assert_eq!(Value::Nothing, Value::Nothing);
        assert_eq!(Value::from("a"), Value::from("a"));
        assert_ne!(Value::Number(1.0), Value::from("1"));
        assert_ne!(Value::Bool(false), Value::Nothing);
        assert_ne!(Value::Number(0.0), Value::Bool(false));

        let a = Value::array(vec![1.0.into()]);
        let b = Value::array(vec![1.0.into()]);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
