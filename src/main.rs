//! cipr CLI and REPL
//!
//! Usage:
//!   cipr run <file.cipr>   - Execute a cipr file
//!   cipr repl              - Start interactive REPL
//!   cipr help              - Show help message

use std::env;
use std::fs;
use std::process;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use cipr::{CiprError, Config, Session, Stage, VERSION};

/// Exit status for lexical and syntax errors
const EXIT_DATA_ERR: i32 = 65;
/// Exit status for runtime errors
const EXIT_SOFTWARE: i32 = 70;
/// Exit status when the script can't be read
const EXIT_IO_ERR: i32 = 74;

fn main() {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        run_repl();
        return;
    }

    match args[1].as_str() {
        "run" => {
            if args.len() < 3 {
                eprintln!("{}: missing file argument", "error".red());
                eprintln!("Usage: cipr run <file.cipr>");
                process::exit(1);
            }
            run_file(&args[2]);
        }
        "repl" => run_repl(),
        "help" | "--help" | "-h" => print_help(),
        "version" | "--version" | "-v" => println!("cipr {}", VERSION),
        _ => {
            // Assume it's a file
            if args[1].ends_with(".cipr") {
                run_file(&args[1]);
            } else {
                eprintln!("{}: unknown command '{}'", "error".red(), args[1]);
                print_help();
                process::exit(1);
            }
        }
    }
}

/// Diagnostics go through `tracing`, enabled with e.g. `RUST_LOG=cipr=debug`.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn print_help() {
    println!("{}", "cipr".cyan().bold());
    println!("A small dynamic scripting language");
    println!("{} {}\n", "Version".cyan(), VERSION);
    println!("{}", "USAGE:".yellow());
    println!("  cipr run <file.cipr>     Execute a cipr file");
    println!("  cipr repl                Start interactive REPL");
    println!("  cipr help                Show this help message");
    println!("  cipr version             Show version\n");
    println!("{}", "ENVIRONMENT:".yellow());
    println!("  CIPR_PATH                Directories searched by include()");
    println!("  CIPR_STARTUP             Script run first (default ~/.ciprrc)");
    println!("  CIPR_PRINT_AST           Print the AST of every input");
    println!("  CIPR_MAX_DEPTH           Call depth limit\n");
    println!("{}", "LANGUAGE FEATURES:".yellow());
    println!("  let x = 10;              Variable declaration");
    println!("  echo x + 1;              Print a value");
    println!("  fn f(a) {{ return a; }}    Function definition");
    println!("  let xs = [1, 2]; xs[0];  Arrays and indexing");
    println!("  if (x > 1) echo x; else echo 0;");
    println!("  while (x > 0) x = x - 1;");
}

fn report(errors: &[CiprError]) {
    for err in errors {
        eprintln!("{}", err.to_string().red());
    }
}

fn new_session() -> Session {
    let mut session = Session::new(Config::from_env());
    if let Err(errors) = session.run_startup() {
        report(&errors);
        session.reset_error();
    }
    session
}

fn run_file(path: &str) {
    let source = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("{}: cannot read file '{}': {}", "error".red(), path, e);
            process::exit(EXIT_IO_ERR);
        }
    };

    let mut session = new_session();

    if let Err(errors) = session.run(&source) {
        report(&errors);
        let runtime = errors.iter().any(|e| e.stage() == Stage::Runtime);
        process::exit(if runtime { EXIT_SOFTWARE } else { EXIT_DATA_ERR });
    }
}

fn run_repl() {
    println!("{} {} - {}",
        "cipr".cyan().bold(),
        VERSION.cyan(),
        "A small dynamic scripting language".dimmed()
    );
    println!("Type {} to exit, {} for help\n",
        "exit".yellow(),
        "help".yellow()
    );

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("{}: cannot start REPL: {}", "error".red(), e);
            process::exit(1);
        }
    };

    // Globals persist across REPL inputs
    let mut session = new_session();
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() {
            format!("{} ", "cipr>".green().bold())
        } else {
            format!("{} ", "...>".dimmed())
        };

        match rl.readline(&prompt) {
            Ok(line) => {
                if buffer.is_empty() {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    // Handle special commands
                    match trimmed {
                        "exit" | "quit" => {
                            let _ = rl.add_history_entry(trimmed);
                            println!("{}", "Goodbye!".cyan());
                            break;
                        }
                        "help" => {
                            let _ = rl.add_history_entry(trimmed);
                            print_repl_help();
                            continue;
                        }
                        "clear" => {
                            let _ = rl.add_history_entry(trimmed);
                            session = new_session();
                            println!("{}", "State cleared.".dimmed());
                            continue;
                        }
                        _ => {}
                    }
                }

                buffer.push_str(&line);
                buffer.push('\n');

                // Keep reading until every block is closed
                if open_braces(&buffer) > 0 {
                    continue;
                }

                let input = std::mem::take(&mut buffer);
                let _ = rl.add_history_entry(input.trim_end());

                if let Err(errors) = session.run(&input) {
                    report(&errors);
                }
                session.reset_error();
            }
            Err(ReadlineError::Interrupted) => {
                // Drop any partially typed block
                buffer.clear();
                println!("{}", "^C".dimmed());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "Goodbye!".cyan());
                break;
            }
            Err(err) => {
                eprintln!("{}: {:?}", "error".red(), err);
                break;
            }
        }
    }
}

/// Net count of `{` over `}` outside strings and line comments.
fn open_braces(source: &str) -> i64 {
    let mut depth = 0;
    let mut in_string = false;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        if in_string {
            if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '/' if chars.peek() == Some(&'/') => {
                while chars.next_if(|&c| c != '\n').is_some() {}
            }
            '{' => depth += 1,
            '}' => depth -= 1,
            _ => {}
        }
    }

    depth
}

fn print_repl_help() {
    println!("{}", "REPL Commands:".yellow());
    println!("  exit, quit   Exit the REPL");
    println!("  clear        Forget every definition");
    println!("  help         Show this help\n");
    println!("{}", "Input:".yellow());
    println!("  Statements end with ';'. An unclosed '{{' continues on the next line.\n");
    println!("{}", "Language Examples:".yellow());
    println!("  let x = 10;");
    println!("  echo x * 2;");
    println!("  fn double(n) {{ return n * 2; }}");
    println!("  echo double(x);");
}

#[cfg(test)]
mod tests {
    use super::open_braces;

    #[test]
    fn counts_unclosed_blocks() {
        assert_eq!(open_braces("fn f() {"), 1);
        assert_eq!(open_braces("fn f() { if (x) {\n"), 2);
        assert_eq!(open_braces("fn f() { return 1; }"), 0);
        assert_eq!(open_braces("}"), -1);
    }

    #[test]
    fn ignores_strings_and_comments() {
        assert_eq!(open_braces("echo \"{\";"), 0);
        assert_eq!(open_braces("let s = \"}}\"; {"), 1);
        assert_eq!(open_braces("// {\necho 1;"), 0);
        assert_eq!(open_braces("fn f() { // }\n"), 1);
        assert_eq!(open_braces("echo 4 / 2; {"), 1);
    }
}
