//! Tree-walking interpreter for cipr
//!
//! Two mutually recursive dispatches over arena nodes: [`Interpreter::execute`]
//! runs statements and reports whether a `return` is unwinding through it,
//! [`Interpreter::evaluate`] computes expression values. Only the call
//! boundary turns a [`Flow::Return`] back into a plain value.

use std::cell::RefCell;
use std::io::{self, Write};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::ast::{Arena, LiteralValue, Node, NodeId, NodeKind};
use crate::environment::{Env, Environment};
use crate::error::{CiprError, ErrorKind, Result};
use crate::lexer::Lexer;
use crate::natives::{self, NativeFn};
use crate::parser::Parser;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenKind};
use crate::value::{Callable, Function, Value};

/// Default limit on nested calls. The stack itself grows on demand; this
/// only stops runaway recursion.
pub const MAX_CALL_DEPTH: usize = 10_000;

/// How a statement finished
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    /// A `return` is unwinding to the nearest call boundary
    Return(Value),
}

/// An in-memory output sink that stays readable after the interpreter
/// takes ownership of a clone of it.
#[derive(Clone, Default)]
pub struct OutputBuffer(Rc<RefCell<Vec<u8>>>);

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The interpreter
pub struct Interpreter {
    /// Every node parsed by this interpreter, across all inputs
    arena: Arena,
    globals: Env,
    /// Innermost scope of whatever is executing
    environment: Env,
    output: Box<dyn Write>,
    depth: usize,
    /// Call depth of the running program's top level
    base_depth: usize,
    max_depth: usize,
    lib_paths: Vec<PathBuf>,
    started: Instant,
}

impl Interpreter {
    /// An interpreter printing to stdout, with the native library installed.
    pub fn new() -> Self {
        Self::with_output(io::stdout())
    }

    pub fn with_output(output: impl Write + 'static) -> Self {
        let globals = Environment::global();
        let mut interpreter = Self {
            arena: Arena::new(),
            environment: Rc::clone(&globals),
            globals,
            output: Box::new(output),
            depth: 0,
            base_depth: 0,
            max_depth: MAX_CALL_DEPTH,
            lib_paths: Vec::new(),
            started: Instant::now(),
        };
        natives::register_all(&mut interpreter);
        interpreter
    }

    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    /// Directories `include` searches after the path as given
    pub fn set_lib_paths(&mut self, paths: Vec<PathBuf>) {
        self.lib_paths = paths;
    }

    pub fn lib_paths(&self) -> &[PathBuf] {
        &self.lib_paths
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Time since the interpreter was created
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn define_global(&mut self, name: impl Into<String>, value: Value) {
        self.globals.borrow_mut().define(name, value);
    }

    pub fn define_native(&mut self, native: NativeFn) {
        let name = native.name;
        self.define_global(name, Value::Callable(Rc::new(native)));
    }

    /// Lex and parse `source` into this interpreter's arena.
    ///
    /// Returns the root node and every lexical and syntax error found.
    pub fn parse(&mut self, source: &str) -> (NodeId, Vec<CiprError>) {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize();
        let mut errors = lexer.take_errors();

        let mut parser = Parser::new(tokens, &mut self.arena);
        let root = parser.parse();
        errors.extend(parser.take_errors());

        let errors = errors.into_iter().map(|e| e.with_source(source)).collect();
        (root, errors)
    }

    /// Execute a parsed program in the global scope.
    ///
    /// The program's top level is top level even when this runs from inside
    /// a call, as `include` does: a bare `return` there is an error.
    pub fn interpret(&mut self, root: NodeId) -> Result<()> {
        let previous = std::mem::replace(&mut self.environment, Rc::clone(&self.globals));
        let previous_base = std::mem::replace(&mut self.base_depth, self.depth);
        let result = self.execute(root);
        self.base_depth = previous_base;
        self.environment = previous;

        let flushed = self.output.flush();
        if let Err(err) = &result {
            tracing::debug!(error = %err, "runtime error");
        }
        result?;
        flushed.map_err(|e| CiprError::new(ErrorKind::Io(format!("cannot write output: {}", e)), None))
    }

    /// Parse and, if that produced no errors, execute `source`.
    pub fn run_source(&mut self, source: &str) -> std::result::Result<(), Vec<CiprError>> {
        let (root, errors) = self.parse(source);
        if !errors.is_empty() {
            return Err(errors);
        }
        self.interpret(root).map_err(|e| vec![e.with_source(source)])
    }

    // ==================== Statements ====================

    pub fn execute(&mut self, id: NodeId) -> Result<Flow> {
        ensure_sufficient_stack(|| self.execute_node(id))
    }

    fn execute_node(&mut self, id: NodeId) -> Result<Flow> {
        let Some(node) = self.arena.node(id) else {
            return Ok(Flow::Normal);
        };

        match node.kind {
            NodeKind::StmtList => self.execute_all(&node.children),
            NodeKind::VarDecl => {
                let value = self.evaluate(node.child(0))?;
                self.environment.borrow_mut().define(node.name(), value);
                Ok(Flow::Normal)
            }
            NodeKind::Echo => {
                let value = self.evaluate(node.child(0))?;
                writeln!(self.output, "{}", value)
                    .map_err(|e| {
                        CiprError::at(ErrorKind::Io(format!("cannot write output: {}", e)), &node.token)
                    })?;
                Ok(Flow::Normal)
            }
            NodeKind::ExprStmt => {
                self.evaluate(node.child(0))?;
                Ok(Flow::Normal)
            }
            NodeKind::Block => {
                let scope = Environment::child(&self.environment);
                self.execute_block(&node.children, scope)
            }
            NodeKind::If => {
                if self.evaluate(node.child(0))?.is_truthy() {
                    self.execute(node.child(1))
                } else {
                    self.execute(node.child(2))
                }
            }
            NodeKind::While => {
                while self.evaluate(node.child(0))?.is_truthy() {
                    if let Flow::Return(value) = self.execute(node.child(1))? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            NodeKind::Function => {
                self.declare_function(&node);
                Ok(Flow::Normal)
            }
            NodeKind::Return => {
                if self.depth == self.base_depth {
                    return Err(CiprError::at(ErrorKind::ReturnOutsideFunction, &node.token));
                }
                let value = self.evaluate(node.child(0))?;
                Ok(Flow::Return(value))
            }
            _ => {
                self.evaluate(id)?;
                Ok(Flow::Normal)
            }
        }
    }

    fn execute_all(&mut self, statements: &[NodeId]) -> Result<Flow> {
        for &statement in statements {
            if let Flow::Return(value) = self.execute(statement)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    /// Run `statements` with `scope` as the innermost environment, restoring
    /// the previous one afterwards whether or not they fail.
    pub fn execute_block(&mut self, statements: &[NodeId], scope: Env) -> Result<Flow> {
        let previous = std::mem::replace(&mut self.environment, scope);
        let result = self.execute_all(statements);
        self.environment = previous;
        result
    }

    /// Run a function body block in `scope`.
    pub fn execute_body(&mut self, body: NodeId, scope: Env) -> Result<Flow> {
        match self.arena.node(body) {
            Some(block) => self.execute_block(&block.children, scope),
            None => Ok(Flow::Normal),
        }
    }

    fn declare_function(&mut self, node: &Node) {
        let (body, params) = match node.children.split_last() {
            Some((body, params)) => (*body, params),
            None => (NodeId::NONE, &[][..]),
        };
        let params = params
            .iter()
            .filter_map(|&param| self.arena.node(param))
            .map(|param| param.name().to_string())
            .collect();

        let function = Function {
            name: node.name().to_string(),
            params,
            body,
            closure: Rc::clone(&self.environment),
        };
        self.environment
            .borrow_mut()
            .define(node.name(), Value::Callable(Rc::new(function)));
    }

    // ==================== Expressions ====================

    pub fn evaluate(&mut self, id: NodeId) -> Result<Value> {
        ensure_sufficient_stack(|| self.evaluate_node(id))
    }

    fn evaluate_node(&mut self, id: NodeId) -> Result<Value> {
        let Some(node) = self.arena.node(id) else {
            return Ok(Value::Nothing);
        };

        match node.kind {
            NodeKind::Literal => Ok(literal_value(node.literal.as_ref())),
            NodeKind::Grouping => self.evaluate(node.child(0)),
            NodeKind::Variable => self.environment.borrow().get(&node.token),
            NodeKind::Assign => {
                let value = self.evaluate(node.child(0))?;
                self.environment.borrow_mut().assign(&node.token, value.clone())?;
                Ok(value)
            }
            NodeKind::Logical => self.logical(&node),
            NodeKind::Unary => self.unary(&node),
            NodeKind::Binary => self.binary(&node),
            NodeKind::Call => self.call(&node),
            NodeKind::Array => {
                let mut items = Vec::with_capacity(node.children.len());
                for &element in &node.children {
                    items.push(self.evaluate(element)?);
                }
                Ok(Value::array(items))
            }
            NodeKind::Index => self.index(&node),
            NodeKind::Param => Ok(Value::Nothing),
            _ => {
                self.execute(id)?;
                Ok(Value::Nothing)
            }
        }
    }

    /// `and` / `or` yield one of their operands, evaluating the right one
    /// only when the left doesn't decide the result.
    fn logical(&mut self, node: &Node) -> Result<Value> {
        let left = self.evaluate(node.child(0))?;

        let decided = match node.token.kind {
            TokenKind::Or => left.is_truthy(),
            _ => !left.is_truthy(),
        };
        if decided {
            return Ok(left);
        }

        self.evaluate(node.child(1))
    }

    fn unary(&mut self, node: &Node) -> Result<Value> {
        let operand = self.evaluate(node.child(0))?;
        let op = &node.token;

        match op.kind {
            TokenKind::Minus => match operand {
                Value::Number(n) => Ok(Value::Number(-n)),
                _ => Err(CiprError::at(ErrorKind::OperandMustBeNumber, op)),
            },
            TokenKind::Bang => Ok(Value::Bool(!operand.is_truthy())),
            _ => Ok(Value::Nothing),
        }
    }

    fn binary(&mut self, node: &Node) -> Result<Value> {
        let left = self.evaluate(node.child(0))?;
        let right = self.evaluate(node.child(1))?;
        let op = &node.token;

        let value = match op.kind {
            TokenKind::EqualEqual => Value::Bool(left == right),
            TokenKind::BangEqual => Value::Bool(left != right),
            TokenKind::Plus => match (&left, &right) {
                (Value::Number(a), Value::Number(b)) => Value::Number(a + b),
                (Value::String(_), _) | (_, Value::String(_)) => {
                    Value::from(format!("{}{}", left, right))
                }
                _ => return Err(CiprError::at(ErrorKind::InvalidAddOperands, op)),
            },
            TokenKind::Minus => {
                let (a, b) = number_operands(op, &left, &right)?;
                Value::Number(a - b)
            }
            TokenKind::Star => {
                let (a, b) = number_operands(op, &left, &right)?;
                Value::Number(a * b)
            }
            TokenKind::Slash => {
                let (a, b) = number_operands(op, &left, &right)?;
                if b == 0.0 {
                    return Err(CiprError::at(ErrorKind::DivisionByZero, op));
                }
                Value::Number(a / b)
            }
            TokenKind::Greater => {
                let (a, b) = number_operands(op, &left, &right)?;
                Value::Bool(a > b)
            }
            TokenKind::GreaterEqual => {
                let (a, b) = number_operands(op, &left, &right)?;
                Value::Bool(a >= b)
            }
            TokenKind::Less => {
                let (a, b) = number_operands(op, &left, &right)?;
                Value::Bool(a < b)
            }
            TokenKind::LessEqual => {
                let (a, b) = number_operands(op, &left, &right)?;
                Value::Bool(a <= b)
            }
            _ => Value::Nothing,
        };

        Ok(value)
    }

    fn call(&mut self, node: &Node) -> Result<Value> {
        let callee = self.evaluate(node.child(0))?;

        let mut args = Vec::with_capacity(node.children.len().saturating_sub(1));
        for &arg in node.children.iter().skip(1) {
            args.push(self.evaluate(arg)?);
        }

        let Value::Callable(function) = callee else {
            return Err(CiprError::at(ErrorKind::NotCallable, &node.token));
        };

        if args.len() != function.arity() {
            return Err(CiprError::at(
                ErrorKind::WrongArity(function.arity(), args.len()),
                &node.token,
            ));
        }

        self.invoke(&function, args, &node.token)
    }

    /// Cross a call boundary. Errors raised without a location (natives)
    /// are pinned to the call's closing paren.
    #[tracing::instrument(level = "trace", skip_all, fields(callee = %function.describe()))]
    fn invoke(&mut self, function: &Rc<dyn Callable>, args: Vec<Value>, paren: &Token) -> Result<Value> {
        if self.depth >= self.max_depth {
            return Err(CiprError::at(ErrorKind::StackOverflow, paren));
        }

        self.depth += 1;
        let result = function.call(self, args);
        self.depth -= 1;

        result.map_err(|e| e.or_at(paren))
    }

    fn index(&mut self, node: &Node) -> Result<Value> {
        let target = self.evaluate(node.child(0))?;
        let index = self.evaluate(node.child(1))?;
        let bracket = &node.token;

        let Value::Array(items) = &target else {
            return Err(CiprError::at(ErrorKind::NotIndexable(target.type_name()), bracket));
        };
        let Value::Number(n) = index else {
            return Err(CiprError::at(ErrorKind::IndexNotNumber, bracket));
        };

        let items = items.borrow();
        let i = n.trunc() as i64;
        if i < 0 || i as usize >= items.len() {
            return Err(CiprError::at(ErrorKind::IndexOutOfBounds(i, items.len()), bracket));
        }

        Ok(items[i as usize].clone())
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn literal_value(literal: Option<&LiteralValue>) -> Value {
    match literal {
        None | Some(LiteralValue::Null) => Value::Nothing,
        Some(LiteralValue::Bool(b)) => Value::Bool(*b),
        Some(LiteralValue::Number(n)) => Value::Number(*n),
        Some(LiteralValue::String(s)) => Value::String(Rc::clone(s)),
    }
}

fn number_operands(op: &Token, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => Ok((*a, *b)),
        _ => Err(CiprError::at(ErrorKind::OperandsMustBeNumbers, op)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn interpreter() -> (Interpreter, OutputBuffer) {
        let out = OutputBuffer::new();
        (Interpreter::with_output(out.clone()), out)
    }

    fn run(source: &str) -> String {
        let (mut interp, out) = interpreter();
        if let Err(errors) = interp.run_source(source) {
            panic!("run failed: {:?}", errors);
        }
        out.contents()
    }

    fn run_err(source: &str) -> CiprError {
        let (mut interp, _) = interpreter();
        let mut errors = interp.run_source(source).expect_err("expected an error");
        assert_eq!(errors.len(), 1, "{:?}", errors);
        errors.remove(0)
    }

    /// Evaluate the expression of a lone `echo` statement directly.
    fn eval_expr(interp: &mut Interpreter, source: &str) -> (NodeId, Value) {
        let (root, errors) = interp.parse(&format!("echo {};", source));
        assert!(errors.is_empty());
        let echo = interp.arena().get(root).child(0);
        let expr = interp.arena().get(echo).child(0);
        let value = interp.evaluate(expr).unwrap();
        (expr, value)
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(run("echo 2 + 3 * 4; echo (2 + 3) * 4; echo 10 / 4; echo -3 - -1;"), "14\n20\n2.5\n-2\n");
    }

    #[test]
    fn pure_expression_is_idempotent() {
        let (mut interp, _) = interpreter();
        let (expr, first) = eval_expr(&mut interp, "2 + 3 * 4");
        let second = interp.evaluate(expr).unwrap();
        assert_eq!(first, Value::Number(14.0));
        assert_eq!(first, second);
    }

    #[test]
    fn division() {
        assert_eq!(run("echo 10 / 2;"), "5\n");
        let err = run_err("echo 10 / 0;");
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
        assert_eq!(err.lexeme.as_deref(), Some("/"));
        let err = run_err("let z = 1 - 1; echo 3 / z;");
        assert_eq!(err.kind, ErrorKind::DivisionByZero);
    }

    #[test]
    fn string_concatenation_coerces() {
        assert_eq!(run("echo \"a\" + 1;"), "a1\n");
        assert_eq!(run("echo 2.50 + \"b\";"), "2.5b\n");
        assert_eq!(run("echo \"x\" + null + true;"), "xnulltrue\n");
        assert_eq!(run("echo \"\" + [1, \"two\"];"), "[1, two]\n");
    }

    #[test]
    fn invalid_operands() {
        assert_eq!(run_err("echo true + 1;").kind, ErrorKind::InvalidAddOperands);
        assert_eq!(run_err("echo 1 - \"1\";").kind, ErrorKind::OperandsMustBeNumbers);
        assert_eq!(run_err("echo null < 1;").kind, ErrorKind::OperandsMustBeNumbers);
        assert_eq!(run_err("echo -\"x\";").kind, ErrorKind::OperandMustBeNumber);
    }

    #[test]
    fn comparison_and_equality() {
        assert_eq!(
            run("echo 1 < 2; echo 2 <= 2; echo 3 > 4; echo 1 == 1; echo 1 == \"1\"; echo null == null; echo !0;"),
            "true\ntrue\nfalse\ntrue\nfalse\ntrue\ntrue\n"
        );
    }

    #[test]
    fn logical_operators_return_operands() {
        assert_eq!(run("echo null or \"x\"; echo 0 and 1; echo 1 and 2; echo false or false;"), "x\n0\n2\nfalse\n");
    }

    #[test]
    fn logical_operators_short_circuit() {
        assert_eq!(run("echo false and (1 / 0); echo true or (1 / 0);"), "false\ntrue\n");
    }

    #[test]
    fn uninitialized_variable_is_null() {
        assert_eq!(run("let x; echo x;"), "null\n");
    }

    #[test]
    fn block_shadowing() {
        assert_eq!(run("let a = 1; { let a = 2; echo a; } echo a;"), "2\n1\n");
    }

    #[test]
    fn block_local_is_gone_after_block() {
        let err = run_err("{ let inner = 1; } echo inner;");
        assert_eq!(err.kind, ErrorKind::UndefinedVariable("inner".into()));
    }

    #[test]
    fn assignment_reaches_outer_scope() {
        assert_eq!(run("let a = 1; { { a = a + 1; } } echo a;"), "2\n");
        assert_eq!(run_err("ghost = 1;").kind, ErrorKind::UndefinedVariable("ghost".into()));
    }

    #[test]
    fn if_else_and_while() {
        assert_eq!(
            run("let i = 0; let s = 0; while (i < 5) { s = s + i; i = i + 1; } if (s == 10) echo \"ten\"; else echo s;"),
            "ten\n"
        );
        assert_eq!(run("if (null) echo 1; else if (0) echo 2; else echo 3;"), "3\n");
    }

    #[test]
    fn functions_and_return() {
        assert_eq!(run("fn add(a, b) { return a + b; } echo add(2, 3);"), "5\n");
        assert_eq!(run("fn nothing() { } echo nothing();"), "null\n");
        assert_eq!(run("fn bare() { return; } echo bare();"), "null\n");
        assert_eq!(run("fn f() {} echo f;"), "<fn f>\n");
    }

    #[test]
    fn return_unwinds_nested_blocks_and_loops() {
        let source = r#"
            fn find(xs, target) {
                let i = 0;
                while (i < size(xs)) {
                    {
                        if (xs[i] == target) { return i; }
                    }
                    i = i + 1;
                }
                return -1;
            }
            echo find([5, 6, 7], 7);
            echo find([5, 6, 7], 9);
        "#;
        assert_eq!(run(source), "2\n-1\n");
    }

    #[test]
    fn recursion() {
        assert_eq!(
            run("fn fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } echo fib(15);"),
            "610\n"
        );
    }

    #[test]
    fn arity_is_checked() {
        let err = run_err("fn f(a) { } f(1, 2);");
        assert_eq!(err.kind, ErrorKind::WrongArity(1, 2));
        assert_eq!(err.lexeme.as_deref(), Some(")"));
        assert_eq!(run_err("size();").kind, ErrorKind::WrongArity(1, 0));
    }

    #[test]
    fn calling_a_non_callable() {
        assert_eq!(run_err("let x = 1; x();").kind, ErrorKind::NotCallable);
        assert_eq!(run_err("\"s\"(1);").kind, ErrorKind::NotCallable);
    }

    #[test]
    fn arrays_and_indexing() {
        assert_eq!(run("let xs = [1, 2, 3]; echo xs[1]; echo xs[2.9]; echo xs;"), "2\n3\n[1, 2, 3]\n");
        assert_eq!(run("echo [[1, 2], [3]][0][1];"), "2\n");

        let err = run_err("echo [1, 2, 3][5];");
        assert_eq!(err.kind, ErrorKind::IndexOutOfBounds(5, 3));
        assert_eq!(run_err("echo [1][-1];").kind, ErrorKind::IndexOutOfBounds(-1, 1));
        assert_eq!(run_err("echo \"abc\"[0];").kind, ErrorKind::NotIndexable("string"));
        assert_eq!(run_err("echo [1][\"0\"];").kind, ErrorKind::IndexNotNumber);
    }

    #[test]
    fn arrays_are_shared_by_reference() {
        let source = r#"
            let a = [1];
            let b = a;
            push(b, 2);
            echo a;
            echo a == b;
            echo a == [1, 2];
        "#;
        assert_eq!(run(source), "[1, 2]\ntrue\nfalse\n");
    }

    #[test]
    fn array_literal_allocates_fresh_each_time() {
        let source = r#"
            fn make() { return [0]; }
            let a = make();
            let b = make();
            push(a, 1);
            echo b;
            echo a == b;
        "#;
        assert_eq!(run(source), "[0]\nfalse\n");
    }

    #[test]
    fn return_at_top_level_is_an_error() {
        let err = run_err("echo 1; return 2;");
        assert_eq!(err.kind, ErrorKind::ReturnOutsideFunction);
    }

    #[test]
    fn runaway_recursion_is_a_runtime_error() {
        let (mut interp, _) = interpreter();
        interp.set_max_depth(16);
        let errors = interp.run_source("fn down(n) { return down(n + 1); } down(0);").unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::StackOverflow);
    }

    #[test]
    fn runtime_error_restores_global_scope() {
        let (mut interp, out) = interpreter();
        assert!(interp.run_source("let g = 1; { let g = 2; echo 1 / 0; }").is_err());
        interp.run_source("echo g;").unwrap();
        assert_eq!(out.contents(), "1\n");
    }

    #[test]
    fn output_before_runtime_error_is_kept() {
        let (mut interp, out) = interpreter();
        let errors = interp.run_source("echo 1; echo missing; echo 3;").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line(), Some(1));
        assert_eq!(out.contents(), "1\n");
    }

    #[test]
    fn syntax_errors_prevent_execution() {
        let (mut interp, out) = interpreter();
        let errors = interp.run_source("echo 1; echo ;").unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(out.contents(), "");
    }

    #[test]
    fn deep_recursion_runs() {
        let source = "fn sum(n) { if (n == 0) return 0; return n + sum(n - 1); } echo sum(100); echo sum(5000);";
        assert_eq!(run(source), "5050\n12502500\n");
    }

    #[test]
    fn default_depth_limit_stops_runaway_recursion() {
        let err = run_err("fn forever(n) { return forever(n + 1); } forever(0);");
        assert_eq!(err.kind, ErrorKind::StackOverflow);
    }

    #[test]
    fn deeply_nested_expression_evaluates() {
        let depth = 5000;
        let source = format!("echo {}1{};", "-(".repeat(depth), ")".repeat(depth));
        assert_eq!(run(&source), "1\n");
    }

    struct UnflushableOutput;

    impl Write for UnflushableOutput {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn runtime_error_wins_over_flush_failure() {
        let mut interp = Interpreter::with_output(UnflushableOutput);
        let errors = interp.run_source("echo missing;").unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::UndefinedVariable("missing".into()));

        let errors = interp.run_source("echo 1;").unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::Io("cannot write output: closed".into()));
    }

    #[test]
    fn declared_function_holds_its_scope() {
        let (mut interp, _) = interpreter();
        let before = Rc::strong_count(&interp.globals);
        interp.run_source("fn f() { return 1; }").unwrap();
        assert_eq!(Rc::strong_count(&interp.globals), before + 1);
    }
}
