//! CLI interface and argument parsing
//!
//! This module handles command-line parsing and wires the task file, the
//! registry and the console logger together.

pub mod app;

// Re-export main types
pub use app::*;
