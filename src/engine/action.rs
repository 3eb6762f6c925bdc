//! Actions: the work a task performs once its dependencies succeeded

use crate::log::Logger;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// A unit of work attached to a task
///
/// Actions receive the task's logger and report success or failure. They are
/// shared between concurrently running tasks, so any state they mutate is
/// their own responsibility to synchronize.
#[async_trait]
pub trait Action: Send + Sync {
    async fn call(&self, log: &Logger) -> anyhow::Result<()>;
}

/// Action backed by an async closure, see [`from_fn`]
pub struct FnAction<F> {
    f: F,
}

/// Build an action from an async closure
///
/// ```
/// use slurp::engine::action;
/// use slurp::log::Logger;
///
/// let fmt = action::from_fn(|log: Logger| async move {
///     log.info("formatting");
///     Ok(())
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> FnAction<F>
where
    F: Fn(Logger) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    FnAction { f }
}

#[async_trait]
impl<F, Fut> Action for FnAction<F>
where
    F: Fn(Logger) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    async fn call(&self, log: &Logger) -> anyhow::Result<()> {
        (self.f)(log.clone()).await
    }
}

/// Action backed by a synchronous closure, see [`blocking`]
pub struct BlockingAction<F> {
    f: Arc<F>,
}

/// Build an action from a synchronous closure
///
/// The closure runs on tokio's blocking thread pool so it never stalls the
/// workers driving other tasks.
pub fn blocking<F>(f: F) -> BlockingAction<F>
where
    F: Fn(&Logger) -> anyhow::Result<()> + Send + Sync + 'static,
{
    BlockingAction { f: Arc::new(f) }
}

#[async_trait]
impl<F> Action for BlockingAction<F>
where
    F: Fn(&Logger) -> anyhow::Result<()> + Send + Sync + 'static,
{
    async fn call(&self, log: &Logger) -> anyhow::Result<()> {
        let f = Arc::clone(&self.f);
        let log = log.clone();
        match tokio::task::spawn_blocking(move || f(&log)).await {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => {
                std::panic::resume_unwind(join_err.into_panic())
            }
            Err(join_err) => Err(anyhow::anyhow!("blocking action was cancelled: {}", join_err)),
        }
    }
}

/// Action that does nothing; used for tasks that only group dependencies
#[derive(Debug, Clone, Copy, Default)]
pub struct Noop;

pub fn noop() -> Noop {
    Noop
}

#[async_trait]
impl Action for Noop {
    async fn call(&self, _log: &Logger) -> anyhow::Result<()> {
        Ok(())
    }
}
