//! Entry point: run a named task from a registry

use crate::engine::registry::Registry;
use crate::error::TaskResult;
use crate::log::Logger;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

/// Options for a single run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Execute each task at most once per run. Later callers that reach an
    /// in-flight or finished task share its result.
    pub memoize: bool,
}

impl RunOptions {
    pub fn memoized() -> Self {
        RunOptions { memoize: true }
    }
}

type Slot = Arc<OnceCell<TaskResult<()>>>;

/// State shared by every node reached during one run
#[derive(Default)]
pub(crate) struct Session {
    options: RunOptions,
    results: Mutex<HashMap<String, Slot>>,
}

impl Session {
    pub(crate) fn new(options: RunOptions) -> Self {
        Session {
            options,
            results: Mutex::new(HashMap::new()),
        }
    }

    /// The shared result cell for a task, when memoizing
    pub(crate) fn slot(&self, name: &str) -> Option<Slot> {
        if !self.options.memoize {
            return None;
        }

        let mut results = match self.results.lock() {
            Ok(results) => results,
            Err(poisoned) => poisoned.into_inner(),
        };
        Some(Arc::clone(results.entry(name.to_string()).or_default()))
    }
}

/// Run the named task and everything it depends on
///
/// Fails with `TaskError::NotFound` straight away if the name is not
/// registered.
pub async fn run(registry: &Registry, name: &str, log: &Logger) -> TaskResult<()> {
    run_with(registry, name, log, RunOptions::default()).await
}

/// Like [`run`], with explicit options
pub async fn run_with(
    registry: &Registry,
    name: &str,
    log: &Logger,
    options: RunOptions,
) -> TaskResult<()> {
    let node = registry.lookup(name)?;
    tracing::debug!(task = name, memoize = options.memoize, "run requested");

    let session = Arc::new(Session::new(options));
    node.run_in(log, &session).await
}

/// Run several tasks one after another within a single run
///
/// Every name is looked up before anything starts. The first failure stops
/// the sequence. With `memoize` the tasks share one session, so a task
/// reached from several of them still executes once.
pub async fn run_all<S>(
    registry: &Registry,
    names: &[S],
    log: &Logger,
    options: RunOptions,
) -> TaskResult<()>
where
    S: AsRef<str>,
{
    let nodes = names
        .iter()
        .map(|name| registry.lookup(name.as_ref()))
        .collect::<TaskResult<Vec<_>>>()?;

    let session = Arc::new(Session::new(options));
    for node in nodes {
        tracing::debug!(task = node.name(), memoize = options.memoize, "run requested");
        node.run_in(log, &session).await?;
    }

    Ok(())
}
