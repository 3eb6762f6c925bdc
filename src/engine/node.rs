//! Task nodes and the recursive, concurrent run algorithm

use crate::engine::action::Action;
use crate::engine::run::Session;
use crate::error::{DependencyFailure, TaskError, TaskResult};
use crate::log::Logger;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, Instrument};

/// Name of the task run when none is given; its log lines carry no label
pub const DEFAULT_TASK: &str = "default";

type RunFuture = BoxFuture<'static, TaskResult<()>>;

/// A registered task: a name, its resolved dependencies and its action
///
/// Nodes are immutable once registered. The guard serializes concurrent
/// runs of the same node; it does not deduplicate them.
pub struct TaskNode {
    name: String,
    deps: Vec<Arc<TaskNode>>,
    action: Box<dyn Action>,
    guard: Mutex<()>,
}

impl TaskNode {
    pub(crate) fn new(name: String, deps: Vec<Arc<TaskNode>>, action: Box<dyn Action>) -> Self {
        TaskNode {
            name,
            deps,
            action,
            guard: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the direct dependencies, in declaration order
    pub fn dependencies(&self) -> impl Iterator<Item = &str> {
        self.deps.iter().map(|dep| dep.name())
    }

    /// Label for this node's log lines
    fn label(&self) -> &str {
        if self.name == DEFAULT_TASK {
            ""
        } else {
            &self.name
        }
    }

    /// Run this node's dependencies concurrently, then its own action
    ///
    /// The action runs only if every direct dependency succeeded. Otherwise
    /// the returned error names each failed dependency and carries its
    /// error. A panicking action is reported as `TaskError::Panicked`. A
    /// node reachable through several paths runs once per path.
    pub fn run(self: &Arc<Self>, parent: &Logger) -> RunFuture {
        let session = Arc::new(Session::default());
        self.run_in(parent, &session)
    }

    pub(crate) fn run_in(self: &Arc<Self>, parent: &Logger, session: &Arc<Session>) -> RunFuture {
        let node = Arc::clone(self);
        let parent = parent.clone();
        let session = Arc::clone(session);

        Box::pin(async move {
            match session.slot(&node.name) {
                Some(slot) => {
                    slot.get_or_init(|| node.execute(parent, Arc::clone(&session)))
                        .await
                        .clone()
                }
                None => node.execute(parent, session).await,
            }
        })
    }

    fn execute(self: Arc<Self>, parent: Logger, session: Arc<Session>) -> RunFuture {
        let span = debug_span!("task", name = %self.name);

        Box::pin(
            async move {
                let log = parent.child(self.label());
                let _guard = self.guard.lock().await;

                log.info("Starting.");

                let cancel = CancellationToken::new();
                let (tx, rx) = mpsc::unbounded_channel();

                let ((), failures) = tokio::join!(
                    dispatch(&self.deps, &log, &session, &cancel, tx),
                    collect(rx, &log, &cancel),
                );

                if !failures.is_empty() {
                    debug!(failed = failures.len(), "skipping action");
                    return Err(TaskError::DependencyFailure(DependencyFailure::new(
                        self.name.clone(),
                        failures,
                    )));
                }

                // Panics become errors here so a memo slot is always filled
                match AssertUnwindSafe(self.action.call(&log)).catch_unwind().await {
                    Ok(Ok(())) => {
                        log.info("Done.");
                        Ok(())
                    }
                    Ok(Err(err)) => Err(TaskError::action(err)),
                    Err(payload) => Err(TaskError::Panicked {
                        task: self.name.clone(),
                        message: panic_message(payload),
                    }),
                }
            }
            .instrument(span),
        )
    }
}

type Outcome = (String, TaskResult<()>);

/// Spawn one worker per dependency and wait for all of them
///
/// Dependencies not yet dispatched when `cancel` fires are skipped. Workers
/// already running are left to finish.
async fn dispatch(
    deps: &[Arc<TaskNode>],
    log: &Logger,
    session: &Arc<Session>,
    cancel: &CancellationToken,
    tx: mpsc::UnboundedSender<Outcome>,
) {
    let mut workers = JoinSet::new();

    for dep in deps {
        if cancel.is_cancelled() {
            log.debug(format_args!("Skipping {}", dep.name()));
            debug!(dependency = %dep.name(), "cancelled before dispatch");
            continue;
        }

        log.infof(format_args!("Waiting for {}", dep.name()));

        let tx = tx.clone();
        let run = dep.run_in(log, session);
        let name = dep.name().to_string();
        workers.spawn(async move {
            let result = match AssertUnwindSafe(run).catch_unwind().await {
                Ok(result) => result,
                Err(payload) => Err(TaskError::Panicked {
                    task: name.clone(),
                    message: panic_message(payload),
                }),
            };
            // The receiver outlives every sender
            let _ = tx.send((name, result));
        });

        // Let outcomes that are already in flight reach the collector
        tokio::task::yield_now().await;
    }

    drop(tx);
    while workers.join_next().await.is_some() {}
}

/// Receive dependency outcomes until every worker has reported
async fn collect(
    mut rx: mpsc::UnboundedReceiver<Outcome>,
    log: &Logger,
    cancel: &CancellationToken,
) -> Vec<(String, TaskError)> {
    let mut failures = Vec::new();

    while let Some((name, result)) = rx.recv().await {
        if let Err(err) = result {
            cancel.cancel();
            log.error(&err);
            failures.push((name, err));
        }
    }

    failures
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("name", &self.name)
            .field("deps", &self.dependencies().collect::<Vec<_>>())
            .finish()
    }
}
