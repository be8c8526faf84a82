//! Built-in functions available to every cipr program

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CiprError, ErrorKind, Result};
use crate::interpreter::Interpreter;
use crate::value::{Callable, Value};

/// Native function type
pub type NativeFnPtr = fn(&mut Interpreter, &[Value]) -> std::result::Result<Value, String>;

/// Native/built-in function
#[derive(Clone)]
pub struct NativeFn {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFnPtr,
}

impl NativeFn {
    pub fn new(name: &'static str, arity: usize, func: NativeFnPtr) -> Self {
        Self { name, arity, func }
    }
}

impl Callable for NativeFn {
    fn arity(&self) -> usize {
        self.arity
    }

    fn call(&self, interpreter: &mut Interpreter, args: Vec<Value>) -> Result<Value> {
        (self.func)(interpreter, &args)
            .map_err(|msg| CiprError::new(ErrorKind::Native(format!("{}(): {}", self.name, msg)), None))
    }

    fn describe(&self) -> String {
        format!("<native fn {}>", self.name)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

/// Bind every built-in into the interpreter's global scope.
pub fn register_all(interpreter: &mut Interpreter) {
    for native in natives() {
        interpreter.define_native(native);
    }
}

fn natives() -> Vec<NativeFn> {
    vec![
        // clock() - seconds since the interpreter started
        NativeFn::new("clock", 0, |vm, _| Ok(Value::Number(vm.elapsed().as_secs_f64()))),
        // env(name) - environment variable, or null when unset
        NativeFn::new("env", 1, |_vm, args| match &args[0] {
            Value::String(name) => Ok(std::env::var(&**name).map(Value::from).unwrap_or(Value::Nothing)),
            _ => Ok(Value::Nothing),
        }),
        // size(val)
        NativeFn::new("size", 1, |_vm, args| {
            let len = match &args[0] {
                Value::String(s) => s.chars().count(),
                Value::Array(items) => items.borrow().len(),
                _ => 0,
            };
            Ok(Value::Number(len as f64))
        }),
        // trim(s)
        NativeFn::new("trim", 1, |_vm, args| match &args[0] {
            Value::String(s) => Ok(Value::string(s.trim())),
            other => Ok(other.clone()),
        }),
        // split(s, sep)
        NativeFn::new("split", 2, |_vm, args| {
            let (Value::String(s), Value::String(sep)) = (&args[0], &args[1]) else {
                return Ok(Value::array(Vec::new()));
            };
            let parts = if sep.is_empty() {
                s.chars().map(|c| Value::from(c.to_string())).collect()
            } else {
                s.split(&**sep).map(Value::from).collect()
            };
            Ok(Value::array(parts))
        }),
        // push(xs, val) - append in place
        NativeFn::new("push", 2, |_vm, args| match &args[0] {
            Value::Array(items) => {
                items.borrow_mut().push(args[1].clone());
                Ok(args[0].clone())
            }
            other => Err(format!("expected an array, got {}", other.type_name())),
        }),
        // str(val)
        NativeFn::new("str", 1, |_vm, args| Ok(Value::from(args[0].to_string()))),
        // type(val)
        NativeFn::new("type", 1, |_vm, args| Ok(Value::from(args[0].type_name()))),
        // read_file(path)
        NativeFn::new("read_file", 1, |_vm, args| {
            let path = string_arg(&args[0], "path")?;
            fs::read_to_string(path)
                .map(Value::from)
                .map_err(|e| format!("cannot read '{}': {}", path, e))
        }),
        // write_file(path, text)
        NativeFn::new("write_file", 2, |_vm, args| {
            let path = string_arg(&args[0], "path")?;
            fs::write(path, args[1].to_string())
                .map(|_| Value::Bool(true))
                .map_err(|e| format!("cannot write '{}': {}", path, e))
        }),
        // include(path) - run another source file in the global scope
        NativeFn::new("include", 1, |vm, args| {
            let path = string_arg(&args[0], "path")?;
            let resolved = resolve_include(path, vm.lib_paths())
                .ok_or_else(|| format!("cannot find '{}'", path))?;
            let source = fs::read_to_string(&resolved)
                .map_err(|e| format!("cannot read '{}': {}", resolved.display(), e))?;

            tracing::debug!(path = %resolved.display(), "including file");
            vm.run_source(&source).map_err(|errors| {
                let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                format!("in '{}':\n{}", resolved.display(), messages.join("\n"))
            })?;
            Ok(Value::Nothing)
        }),
    ]
}

fn string_arg<'v>(value: &'v Value, what: &str) -> std::result::Result<&'v str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("{} must be a string, got {}", what, value.type_name()))
}

/// `path` as given if it exists, otherwise the first library directory
/// containing it.
fn resolve_include(path: &str, lib_paths: &[PathBuf]) -> Option<PathBuf> {
    let direct = Path::new(path);
    if direct.is_file() {
        return Some(direct.to_path_buf());
    }
    if direct.is_absolute() {
        return None;
    }
    lib_paths
        .iter()
        .map(|dir| dir.join(path))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::OutputBuffer;
    use pretty_assertions::assert_eq;

    fn run(source: &str) -> String {
        let out = OutputBuffer::new();
        let mut interp = Interpreter::with_output(out.clone());
        interp.run_source(source).unwrap();
        out.contents()
    }

    #[test]
    fn natives_describe_themselves() {
        assert_eq!(run("echo clock; echo size;"), "<native fn clock>\n<native fn size>\n");
    }

    #[test]
    fn string_helpers() {
        assert_eq!(
            run("echo size(\"héllo\"); echo trim(\"  x \"); echo split(\"a,b,,c\", \",\"); echo split(\"ab\", \"\");"),
            "5\nx\n[a, b, , c]\n[a, b]\n"
        );
        assert_eq!(run("echo trim(4); echo split(1, 2); echo size(null);"), "4\n[]\n0\n");
    }

    #[test]
    fn type_and_str() {
        assert_eq!(
            run("echo type(1); echo type(\"s\"); echo type([]); echo type(type); echo type(null); echo str(2.0) + \"!\";"),
            "number\nstring\narray\nfunction\nnull\n2!\n"
        );
    }

    #[test]
    fn clock_is_a_number() {
        assert_eq!(run("echo type(clock());"), "number\n");
    }

    #[test]
    fn native_errors_become_runtime_errors() {
        let mut interp = Interpreter::with_output(OutputBuffer::new());
        let errors = interp.run_source("push(1, 2);").unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::Native("push(): expected an array, got number".into()));
        assert_eq!(errors[0].lexeme.as_deref(), Some(")"));
    }

    #[test]
    fn files_and_include() {
        let dir = std::env::temp_dir().join(format!("cipr-natives-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let lib = dir.join("lib.cipr");
        fs::write(&lib, "fn twice(x) { return x * 2; }\nlet loaded = true;").unwrap();

        let out = OutputBuffer::new();
        let mut interp = Interpreter::with_output(out.clone());
        interp.set_lib_paths(vec![dir.clone()]);
        interp
            .run_source("fn load() { include(\"lib.cipr\"); } load(); echo twice(21); echo loaded;")
            .unwrap();
        assert_eq!(out.contents(), "42\ntrue\n");

        let data = dir.join("data.txt");
        let source = format!(
            "write_file(\"{0}\", [1, 2]); echo read_file(\"{0}\");",
            data.display()
        );
        let out = OutputBuffer::new();
        let mut interp = Interpreter::with_output(out.clone());
        interp.run_source(&source).unwrap();
        assert_eq!(out.contents(), "[1, 2]\n");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn include_missing_file() {
        let mut interp = Interpreter::with_output(OutputBuffer::new());
        let errors = interp.run_source("include(\"no/such/file.cipr\");").unwrap_err();
        assert!(errors[0].to_string().contains("include(): cannot find 'no/such/file.cipr'"));
    }

    #[test]
    fn return_at_top_of_included_file_is_an_error() {
        let dir = std::env::temp_dir().join(format!("cipr-include-return-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("early.cipr"), "echo 1; return 5; echo 2;").unwrap();

        let out = OutputBuffer::new();
        let mut interp = Interpreter::with_output(out.clone());
        interp.set_lib_paths(vec![dir.clone()]);
        let errors = interp
            .run_source("fn load() { include(\"early.cipr\"); } load(); echo 3;")
            .unwrap_err();

        assert!(errors[0].to_string().contains("return outside of function"));
        assert_eq!(out.contents(), "1\n");

        // Functions defined by an included file still return normally
        fs::write(dir.join("lib.cipr"), "fn one() { return 1; }").unwrap();
        interp.run_source("include(\"lib.cipr\"); echo one();").unwrap();
        assert_eq!(out.contents(), "1\n1\n");

        fs::remove_dir_all(&dir).unwrap();
    }
}
