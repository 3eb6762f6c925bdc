//! Slurp - a small build-style task runner
//!
//! Tasks are named units of work that may depend on other tasks. Slurp
//! resolves the dependency graph once, runs every dependency of a task
//! concurrently and only runs a task's own action when all of its
//! dependencies succeeded.
//!
//! ```no_run
//! use slurp::engine::{self, action, Registry};
//! use slurp::log::{ConsoleSink, Logger};
//!
//! # async fn example() -> slurp::Result<()> {
//! let mut registry = Registry::new();
//! registry.register("fmt", &[], action::from_fn(|log: Logger| async move {
//!     log.info("formatting");
//!     Ok(())
//! }))?;
//! registry.register("default", &["fmt"], action::noop())?;
//!
//! let log = Logger::new(ConsoleSink::default());
//! engine::run(&registry, "default", &log).await?;
//! # Ok(())
//! # }
//! ```

// Public modules
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod log;
pub mod runner;

// Re-export commonly used types
pub use engine::{run, run_all, run_with, Registry, RegistryBuilder, RunOptions};
pub use error::{Result, SlurpError, TaskError};

/// Current version of Slurp
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
