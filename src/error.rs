//! Error types for cipr
//!
//! Lexical and syntax errors are accumulated and reported together; runtime
//! errors abort the current execution and are reported once.

use crate::token::{Span, Token, TokenKind};
use std::fmt;

/// The phase of the pipeline an error belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Lexical,
    Syntax,
    Runtime,
}

/// Error kinds in cipr
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Lexer errors
    UnexpectedCharacter(char),
    UnterminatedString,

    // Parser errors
    Expected(String),
    ExpectedExpression,
    InvalidAssignmentTarget,

    // Runtime errors
    UndefinedVariable(String),
    OperandMustBeNumber,
    OperandsMustBeNumbers,
    InvalidAddOperands,
    DivisionByZero,
    NotCallable,
    WrongArity(usize, usize),
    NotIndexable(&'static str),
    IndexNotNumber,
    IndexOutOfBounds(i64, usize),
    ReturnOutsideFunction,
    StackOverflow,

    /// Reading a script or writing program output failed
    Io(String),

    /// Raised by a native function
    Native(String),
}

impl ErrorKind {
    pub fn stage(&self) -> Stage {
        match self {
            ErrorKind::UnexpectedCharacter(_) | ErrorKind::UnterminatedString => Stage::Lexical,
            ErrorKind::Expected(_)
            | ErrorKind::ExpectedExpression
            | ErrorKind::InvalidAssignmentTarget => Stage::Syntax,
            _ => Stage::Runtime,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::UnexpectedCharacter(c) => write!(f, "unexpected character '{}'", c),
            ErrorKind::UnterminatedString => write!(f, "unterminated string"),
            ErrorKind::Expected(message) => write!(f, "{}", message),
            ErrorKind::ExpectedExpression => write!(f, "expected expression"),
            ErrorKind::InvalidAssignmentTarget => write!(f, "invalid assignment target"),
            ErrorKind::UndefinedVariable(name) => write!(f, "undefined variable '{}'", name),
            ErrorKind::OperandMustBeNumber => write!(f, "operand must be a number"),
            ErrorKind::OperandsMustBeNumbers => write!(f, "operands must be numbers"),
            ErrorKind::InvalidAddOperands => {
                write!(f, "operands must be two numbers or include a string")
            }
            ErrorKind::DivisionByZero => write!(f, "division by zero"),
            ErrorKind::NotCallable => write!(f, "can only call functions"),
            ErrorKind::WrongArity(expected, got) => {
                write!(f, "expected {} arguments but got {}", expected, got)
            }
            ErrorKind::NotIndexable(type_name) => {
                write!(f, "only arrays can be indexed, not {}", type_name)
            }
            ErrorKind::IndexNotNumber => write!(f, "index must be a number"),
            ErrorKind::IndexOutOfBounds(index, len) => {
                write!(f, "index out of bounds: index {} but length is {}", index, len)
            }
            ErrorKind::ReturnOutsideFunction => write!(f, "return outside of function"),
            ErrorKind::StackOverflow => write!(f, "stack overflow"),
            ErrorKind::Io(msg) => write!(f, "{}", msg),
            ErrorKind::Native(msg) => write!(f, "{}", msg),
        }
    }
}

/// A cipr error with location information
#[derive(Debug, Clone)]
pub struct CiprError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
    /// Source text of the offending token, if any
    pub lexeme: Option<String>,
    pub source_line: Option<String>,
}

impl CiprError {
    pub fn new(kind: ErrorKind, span: Option<Span>) -> Self {
        Self {
            kind,
            span,
            lexeme: None,
            source_line: None,
        }
    }

    /// An error located at `token`.
    pub fn at(kind: ErrorKind, token: &Token) -> Self {
        let lexeme = if token.kind == TokenKind::Eof {
            None
        } else {
            Some(token.lexeme.clone())
        };
        Self {
            kind,
            span: Some(token.span),
            lexeme,
            source_line: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.kind.stage()
    }

    pub fn line(&self) -> Option<usize> {
        self.span.map(|span| span.line)
    }

    /// Attach `token`'s location unless the error already has one.
    pub fn or_at(self, token: &Token) -> Self {
        if self.span.is_some() {
            self
        } else {
            Self::at(self.kind, token)
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        if let Some(span) = &self.span {
            let lines: Vec<&str> = source.lines().collect();
            if span.line > 0 && span.line <= lines.len() {
                self.source_line = Some(lines[span.line - 1].to_string());
            }
        }
        self
    }
}

impl fmt::Display for CiprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.stage() {
            Stage::Runtime => "Runtime error",
            Stage::Lexical | Stage::Syntax => "Error",
        };

        let Some(span) = &self.span else {
            return write!(f, "{}: {}", label, self.kind);
        };

        write!(f, "[line {}:{}] {}", span.line, span.column, label)?;
        match (&self.lexeme, self.stage()) {
            (Some(lexeme), _) => write!(f, " at '{}'", lexeme)?,
            (None, Stage::Syntax) => write!(f, " at end")?,
            (None, _) => {}
        }
        write!(f, ": {}", self.kind)?;

        if let Some(ref line) = self.source_line {
            write!(f, "\n  | {}", line)?;
            write!(f, "\n  | {}^", " ".repeat(span.column.saturating_sub(1)))?;
        }
        Ok(())
    }
}

impl std::error::Error for CiprError {}

/// Result type for cipr operations
pub type Result<T> = std::result::Result<T, CiprError>;
