//! Turning task file definitions into registered tasks

use crate::config::{self, Command, Config};
use crate::engine::{noop, Action, Registry, RegistryBuilder};
use crate::error::RegistryResult;
use crate::log::Logger;
use crate::runner::{execute_command, Context};
use async_trait::async_trait;
use std::path::Path;

/// Runs a task's commands one after another; the first failure stops it
#[derive(Debug, Clone)]
pub struct CommandAction {
    commands: Vec<Command>,
    ctx: Context,
}

impl CommandAction {
    pub fn new(commands: Vec<Command>, ctx: Context) -> Self {
        CommandAction { commands, ctx }
    }

    /// Create the action for a configured task
    ///
    /// The task's `dir` is resolved against `base`'s working directory and
    /// its `env` is layered over `base`'s environment.
    pub fn from_config(task: &config::Task, base: &Context) -> Self {
        let mut env = base.env.clone();
        env.extend(task.env.clone());

        let ctx = base
            .clone()
            .with_working_dir(base.resolve_dir(task.dir.as_deref()))
            .with_env(env);

        CommandAction::new(task.run.clone(), ctx)
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

#[async_trait]
impl Action for CommandAction {
    async fn call(&self, log: &Logger) -> anyhow::Result<()> {
        for cmd in &self.commands {
            execute_command(cmd, &self.ctx, log).await?;
        }
        Ok(())
    }
}

/// Build the task graph described by a task file
///
/// Commands run relative to `config_dir`, the directory holding the file.
/// Tasks without commands only group their dependencies.
pub fn build_registry(config: &Config, config_dir: &Path) -> RegistryResult<Registry> {
    let mut base = Context::new().with_working_dir(config_dir.to_path_buf());
    if let Some(interpreter) = &config.interpreter {
        base = base.with_interpreter(interpreter.clone());
    }

    let mut builder = RegistryBuilder::new();
    for (name, task) in &config.tasks {
        if task.run.is_empty() {
            builder.add(name.clone(), task.deps.clone(), noop());
        } else {
            builder.add(
                name.clone(),
                task.deps.clone(),
                CommandAction::from_config(task, &base),
            );
        }
    }

    builder.build()
}
