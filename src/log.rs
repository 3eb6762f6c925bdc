//! Scoped logging for task runs
//!
//! A [`Logger`] is a cheap, cloneable handle carrying a label and a shared
//! [`Sink`]. Every task run derives a child logger labelled with the task's
//! name, so lines written by concurrently running tasks stay attributable.
//! Sinks are shared between all running tasks and must be `Send + Sync`.

use colored::*;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Error,
    Info,
    Debug,
}

/// Verbosity levels for console output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Silent = 0,
    Quiet = 1,
    Normal = 2,
    Verbose = 3,
}

impl Verbosity {
    /// Whether a line of the given level should be shown
    pub fn allows(self, level: Level) -> bool {
        match level {
            Level::Error => self >= Verbosity::Quiet,
            Level::Info => self >= Verbosity::Normal,
            Level::Debug => self >= Verbosity::Verbose,
        }
    }
}

/// Destination for log lines
pub trait Sink: Send + Sync {
    /// Write one line. `label` is empty for unlabelled contexts.
    fn write(&self, level: Level, label: &str, message: &str);
}

/// Scoped logging handle passed to every task and action
#[derive(Clone)]
pub struct Logger {
    sink: Arc<dyn Sink>,
    label: String,
}

impl Logger {
    /// Create an unlabelled root logger
    pub fn new(sink: impl Sink + 'static) -> Self {
        Logger {
            sink: Arc::new(sink),
            label: String::new(),
        }
    }

    /// Create a root logger over an already shared sink
    pub fn from_shared(sink: Arc<dyn Sink>) -> Self {
        Logger {
            sink,
            label: String::new(),
        }
    }

    /// A logger that discards everything
    pub fn discard() -> Self {
        Logger::new(DiscardSink)
    }

    /// Derive a logger writing to the same sink under a new label
    pub fn child(&self, label: &str) -> Logger {
        Logger {
            sink: Arc::clone(&self.sink),
            label: label.to_string(),
        }
    }

    /// The label lines from this logger carry
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn info(&self, message: impl fmt::Display) {
        self.sink.write(Level::Info, &self.label, &message.to_string());
    }

    /// Formatted info line, e.g. `log.infof(format_args!("Waiting for {}", name))`
    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.info(args);
    }

    pub fn debug(&self, message: impl fmt::Display) {
        self.sink.write(Level::Debug, &self.label, &message.to_string());
    }

    pub fn error(&self, err: &(dyn std::error::Error + 'static)) {
        self.sink.write(Level::Error, &self.label, &err.to_string());
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("label", &self.label).finish()
    }
}

/// Colored, verbosity-filtered output on stderr
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    verbosity: Verbosity,
}

impl ConsoleSink {
    pub fn new(verbosity: Verbosity) -> Self {
        ConsoleSink { verbosity }
    }

    /// Format one console line
    fn render(level: Level, label: &str, message: &str) -> String {
        let body = match level {
            Level::Error => format!("{} {}", "error:".red().bold(), message.red()),
            Level::Info => message.to_string(),
            Level::Debug => message.bright_black().to_string(),
        };

        if label.is_empty() {
            body
        } else {
            format!("{} {}", format!("{}:", label).cyan().bold(), body)
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new(Verbosity::Normal)
    }
}

impl Sink for ConsoleSink {
    fn write(&self, level: Level, label: &str, message: &str) {
        if self.verbosity.allows(level) {
            // eprintln! holds the stderr lock for the whole line
            eprintln!("{}", Self::render(level, label, message));
        }
    }
}

/// Forwards lines to `tracing` with the label as the `task` field
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn write(&self, level: Level, label: &str, message: &str) {
        match level {
            Level::Error => tracing::error!(task = label, "{}", message),
            Level::Info => tracing::info!(task = label, "{}", message),
            Level::Debug => tracing::debug!(task = label, "{}", message),
        }
    }
}

/// A single captured line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub level: Level,
    pub label: String,
    pub message: String,
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.label.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.label, self.message)
        }
    }
}

/// Keeps every line in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<Record>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far
    pub fn records(&self) -> Vec<Record> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Every line rendered as `label: message`
    pub fn lines(&self) -> Vec<String> {
        self.records().iter().map(ToString::to_string).collect()
    }

    /// Whether a line with exactly this label and message was written
    pub fn contains(&self, label: &str, message: &str) -> bool {
        self.records()
            .iter()
            .any(|r| r.label == label && r.message == message)
    }

    /// Count lines with this label and message
    pub fn count(&self, label: &str, message: &str) -> usize {
        self.records()
            .iter()
            .filter(|r| r.label == label && r.message == message)
            .count()
    }
}

impl Sink for MemorySink {
    fn write(&self, level: Level, label: &str, message: &str) {
        let record = Record {
            level,
            label: label.to_string(),
            message: message.to_string(),
        };
        match self.records.lock() {
            Ok(mut records) => records.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
    }
}

/// Drops every line
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardSink;

impl Sink for DiscardSink {
    fn write(&self, _level: Level, _label: &str, _message: &str) {}
}
