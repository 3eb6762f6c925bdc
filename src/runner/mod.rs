//! Shell command tasks
//!
//! This module turns task file definitions into engine actions that run
//! shell commands.

pub mod command;
pub mod context;
pub mod task;

// Re-export main types
pub use command::*;
pub use context::*;
pub use task::*;
