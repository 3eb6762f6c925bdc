//! Execution context for shell commands
//!
//! The context carries what every command of a task needs: where to run,
//! which interpreter to run through and which environment to add.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Default interpreter commands are handed to
pub const DEFAULT_INTERPRETER: &[&str] = &["sh", "-c"];

/// Environment shared by the commands of one task
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    /// Directory commands run in
    pub working_dir: PathBuf,

    /// Extra environment variables
    pub env: HashMap<String, String>,

    /// Interpreter and its leading arguments (e.g., ["bash", "-c"])
    pub interpreter: Vec<String>,
}

impl Context {
    /// Create a new context with default settings
    pub fn new() -> Self {
        Context {
            working_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env: HashMap::new(),
            interpreter: DEFAULT_INTERPRETER.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a context with a specific working directory
    pub fn with_working_dir(mut self, dir: PathBuf) -> Self {
        self.working_dir = dir;
        self
    }

    /// Set environment variables
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Set the interpreter
    pub fn with_interpreter(mut self, interpreter: Vec<String>) -> Self {
        self.interpreter = interpreter;
        self
    }

    /// Resolve a directory relative to the working directory
    pub fn resolve_dir(&self, dir: Option<&str>) -> PathBuf {
        match dir {
            Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
            Some(dir) => self.working_dir.join(dir),
            None => self.working_dir.clone(),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
