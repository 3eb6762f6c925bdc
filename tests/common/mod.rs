//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use slurp::engine::Action;
use slurp::log::{Logger, MemorySink};
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Create a temporary directory with a slurp.yml file
pub fn create_test_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("slurp.yml");
    fs::write(&config_path, content).unwrap();
    (temp_dir, config_path)
}

/// Create a test config with an empty subdirectory next to it
pub fn create_test_config_in_subdir(content: &str) -> (TempDir, PathBuf, PathBuf) {
    let (temp_dir, config_path) = create_test_config(content);
    let sub_dir = temp_dir.path().join("subdir");
    fs::create_dir(&sub_dir).unwrap();
    (temp_dir, config_path, sub_dir)
}

/// A root logger writing into memory
pub fn capture() -> (MemorySink, Logger) {
    let sink = MemorySink::new();
    let log = Logger::new(sink.clone());
    (sink, log)
}

/// Counts how often the actions it hands out were invoked
#[derive(Clone, Default)]
pub struct Probe {
    calls: Arc<AtomicUsize>,
}

impl Probe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// An action that succeeds
    pub fn succeed(&self) -> ProbeAction {
        self.action(Outcome::Succeed)
    }

    /// An action that fails with `message`
    pub fn fail(&self, message: &str) -> ProbeAction {
        self.action(Outcome::Fail(message.to_string()))
    }

    /// An action that panics with "boom"
    pub fn panic(&self) -> ProbeAction {
        self.action(Outcome::Panic)
    }

    fn action(&self, outcome: Outcome) -> ProbeAction {
        ProbeAction {
            calls: Arc::clone(&self.calls),
            outcome,
        }
    }
}

enum Outcome {
    Succeed,
    Fail(String),
    Panic,
}

pub struct ProbeAction {
    calls: Arc<AtomicUsize>,
    outcome: Outcome,
}

#[async_trait]
impl Action for ProbeAction {
    async fn call(&self, _log: &Logger) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.outcome {
            Outcome::Succeed => Ok(()),
            Outcome::Fail(message) => Err(anyhow::anyhow!("{}", message)),
            Outcome::Panic => panic!("boom"),
        }
    }
}
