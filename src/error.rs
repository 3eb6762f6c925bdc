//! Error types for Slurp

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for Slurp operations
pub type Result<T> = std::result::Result<T, SlurpError>;

/// Main error type for Slurp
#[derive(Error, Debug)]
pub enum SlurpError {
    /// Task file errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task graph construction errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Task run errors
    #[error("{0}")]
    Task(#[from] TaskError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// YAML parsing errors
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Task file parsing and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to find task file (searched: {0})")]
    NotFound(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to include file '{path}': {error}")]
    IncludeFile { path: PathBuf, error: String },
}

/// Errors raised while building a task graph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Task name must not be empty")]
    EmptyName,

    #[error("Task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency { task: String, dependency: String },

    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    Cycle(Vec<String>),
}

/// Errors produced by running a task
///
/// Cloneable so a memoized result can be handed to every caller that
/// reaches the same node.
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    #[error("Task '{0}' is not defined")]
    NotFound(String),

    #[error("{0}")]
    DependencyFailure(DependencyFailure),

    /// The task's own action failed; displayed verbatim
    #[error(transparent)]
    Action(Arc<dyn std::error::Error + Send + Sync + 'static>),

    #[error("Task '{task}' panicked: {message}")]
    Panicked { task: String, message: String },
}

impl TaskError {
    /// Wrap an action's error
    pub fn action(err: anyhow::Error) -> Self {
        let boxed: Box<dyn std::error::Error + Send + Sync + 'static> = err.into();
        TaskError::Action(Arc::from(boxed))
    }

    /// Names of the failed direct dependencies, if this is a dependency failure
    pub fn failed_dependencies(&self) -> Vec<&str> {
        match self {
            TaskError::DependencyFailure(failure) => failure.names(),
            _ => Vec::new(),
        }
    }
}

/// One or more direct dependencies of a task failed
///
/// The display form only names the dependencies. The underlying errors are
/// kept alongside so callers can walk the whole failure chain.
#[derive(Debug, Clone)]
pub struct DependencyFailure {
    task: String,
    failures: Vec<(String, TaskError)>,
}

impl DependencyFailure {
    pub fn new(task: impl Into<String>, failures: Vec<(String, TaskError)>) -> Self {
        DependencyFailure {
            task: task.into(),
            failures,
        }
    }

    /// The task whose action was skipped
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Names of the failed dependencies, in the order they were observed
    pub fn names(&self) -> Vec<&str> {
        self.failures.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Every failed dependency with its own error
    pub fn failures(&self) -> &[(String, TaskError)] {
        &self.failures
    }

    /// The error a given dependency failed with
    pub fn cause(&self, dependency: &str) -> Option<&TaskError> {
        self.failures
            .iter()
            .find(|(name, _)| name == dependency)
            .map(|(_, err)| err)
    }
}

impl fmt::Display for DependencyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Task '{}' cancelled: failed dependency ({})",
            self.task,
            self.names().join(", ")
        )
    }
}

/// Errors raised by shell command actions
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to start '{command}': {error}")]
    Spawn { command: String, error: String },

    #[error("Command '{command}' failed with exit code {code:?}")]
    CommandFailed { command: String, code: Option<i32> },
}

/// Specialized result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Specialized result type for registry operations
pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

/// Specialized result type for task runs
pub type TaskResult<T> = std::result::Result<T, TaskError>;

/// Specialized result type for command execution
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;
