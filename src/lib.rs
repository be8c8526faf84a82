//! cipr - a small dynamic scripting language
//!
//! Source text is lexed into tokens, parsed into an arena of nodes and
//! executed by a tree-walking interpreter.

pub mod token;
pub mod lexer;
pub mod parser;
pub mod ast;
pub mod printer;
pub mod value;
pub mod environment;
pub mod interpreter;
pub mod natives;
pub mod error;
pub mod config;
pub mod session;
mod stack;

pub use ast::{Arena, NodeId};
pub use config::Config;
pub use error::{CiprError, ErrorKind, Result, Stage};
pub use interpreter::{Interpreter, OutputBuffer};
pub use lexer::Lexer;
pub use parser::Parser;
pub use printer::AstPrinter;
pub use session::Session;
pub use value::{Callable, Value};

/// Run cipr code in a fresh session and return everything it echoed
pub fn run(source: &str) -> std::result::Result<String, Vec<CiprError>> {
    let output = OutputBuffer::new();
    let mut session = Session::with_output(Config::default(), output.clone());
    session.run(source)?;
    Ok(output.contents())
}

/// Version of cipr
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
