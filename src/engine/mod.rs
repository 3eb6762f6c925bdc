//! Dependency-aware task execution engine
//!
//! This module holds the task graph and the algorithm that runs it: every
//! dependency of a task runs concurrently, results converge bottom-up and a
//! task's own action runs only when all of its dependencies succeeded.

pub mod action;
pub mod node;
pub mod registry;
pub mod run;

// Re-export main types
pub use action::{blocking, from_fn, noop, Action};
pub use node::{TaskNode, DEFAULT_TASK};
pub use registry::{Registry, RegistryBuilder};
pub use run::{run, run_all, run_with, RunOptions};
