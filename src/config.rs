//! Host configuration for cipr
//!
//! Defaults overridden by environment variables:
//!
//! - `CIPR_PATH` - library directories searched by `include`
//! - `CIPR_STARTUP` - script run before the REPL or a file
//!   (default: `$HOME/.ciprrc` if it exists)
//! - `CIPR_PRINT_AST` - print the AST of every parsed input
//! - `CIPR_MAX_DEPTH` - call-depth limit

use std::ffi::OsString;
use std::path::PathBuf;

use crate::interpreter::MAX_CALL_DEPTH;

/// Startup script looked for in the home directory
pub const STARTUP_FILE: &str = ".ciprrc";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub print_ast: bool,
    pub startup_script: Option<PathBuf>,
    pub lib_paths: Vec<PathBuf>,
    pub max_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            print_ast: false,
            startup_script: None,
            lib_paths: Vec::new(),
            max_depth: MAX_CALL_DEPTH,
        }
    }
}

impl Config {
    /// Configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    /// Configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<OsString>) -> Self {
        let mut config = Self::default();

        if let Some(paths) = lookup("CIPR_PATH") {
            config.lib_paths = std::env::split_paths(&paths)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }

        config.startup_script = match lookup("CIPR_STARTUP") {
            Some(path) if !path.is_empty() => Some(PathBuf::from(path)),
            Some(_) => None,
            None => lookup("HOME")
                .map(|home| PathBuf::from(home).join(STARTUP_FILE))
                .filter(|path| path.is_file()),
        };

        config.print_ast = lookup("CIPR_PRINT_AST").is_some_and(|v| is_enabled(&v));

        if let Some(depth) = lookup("CIPR_MAX_DEPTH") {
            match depth.to_str().and_then(|s| s.trim().parse::<usize>().ok()) {
                Some(n) if n > 0 => config.max_depth = n,
                _ => tracing::warn!(value = ?depth, "ignoring invalid CIPR_MAX_DEPTH"),
            }
        }

        tracing::debug!(?config, "loaded configuration");
        config
    }
}

fn is_enabled(value: &OsString) -> bool {
    !matches!(value.to_str(), Some("" | "0" | "false" | "off"))
}
