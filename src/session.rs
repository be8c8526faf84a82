//! A long-lived host driver
//!
//! One interpreter, and so one arena and one global scope, shared by every
//! input a session runs. REPL lines see what earlier lines defined.

use std::fs;
use std::io::Write;

use crate::config::Config;
use crate::error::{CiprError, ErrorKind};
use crate::interpreter::Interpreter;
use crate::printer::AstPrinter;

pub struct Session {
    interpreter: Interpreter,
    config: Config,
    had_error: bool,
}

impl Session {
    /// A session printing to stdout.
    pub fn new(config: Config) -> Self {
        Self::from_interpreter(Interpreter::new(), config)
    }

    pub fn with_output(config: Config, output: impl Write + 'static) -> Self {
        Self::from_interpreter(Interpreter::with_output(output), config)
    }

    fn from_interpreter(mut interpreter: Interpreter, config: Config) -> Self {
        interpreter.set_max_depth(config.max_depth);
        interpreter.set_lib_paths(config.lib_paths.clone());
        Self {
            interpreter,
            config,
            had_error: false,
        }
    }

    /// Lex, parse and, if both were clean, execute `source`.
    ///
    /// Returns every lexical and syntax error, or the single runtime error
    /// that stopped execution.
    pub fn run(&mut self, source: &str) -> Result<(), Vec<CiprError>> {
        let (root, errors) = self.interpreter.parse(source);

        if self.config.print_ast {
            eprintln!("AST: {}", AstPrinter::new(self.interpreter.arena()).print(root));
        }

        if !errors.is_empty() {
            tracing::debug!(count = errors.len(), "not executing input with errors");
            self.had_error = true;
            return Err(errors);
        }

        self.interpreter.interpret(root).map_err(|err| {
            self.had_error = true;
            vec![err.with_source(source)]
        })
    }

    /// Run the configured startup script, if there is one.
    pub fn run_startup(&mut self) -> Result<(), Vec<CiprError>> {
        let Some(path) = self.config.startup_script.clone() else {
            return Ok(());
        };
        tracing::debug!(path = %path.display(), "running startup script");

        let source = fs::read_to_string(&path).map_err(|e| {
            let message = format!("cannot read startup script '{}': {}", path.display(), e);
            vec![CiprError::new(ErrorKind::Io(message), None)]
        })?;
        self.run(&source)
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn reset_error(&mut self) {
        self.had_error = false;
    }
}
