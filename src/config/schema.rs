//! Configuration validation
//!
//! Checks what the task file itself can get wrong. Dependency resolution and
//! cycle detection happen when the registry is built.

use crate::config::types::{Config, Task};
use crate::error::{ConfigError, ConfigResult};

/// Validate a complete configuration
pub fn validate_config(config: &Config) -> ConfigResult<()> {
    if let Some(interpreter) = &config.interpreter {
        if interpreter.is_empty() || interpreter[0].trim().is_empty() {
            return Err(ConfigError::Invalid(
                "interpreter must name a program".to_string(),
            ));
        }
    }

    for (name, task) in &config.tasks {
        validate_task(name, task)?;
    }

    Ok(())
}

/// Validate a single task
pub fn validate_task(name: &str, task: &Task) -> ConfigResult<()> {
    validate_task_name(name)?;

    for dep in &task.deps {
        if dep.trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "Task '{}' has an empty dependency name",
                name
            )));
        }
    }

    for cmd in &task.run {
        if cmd.exec().trim().is_empty() {
            return Err(ConfigError::Invalid(format!(
                "Task '{}' has an empty command",
                name
            )));
        }
    }

    Ok(())
}

/// Task names are used on the command line, so no blanks or leading dashes
fn validate_task_name(name: &str) -> ConfigResult<()> {
    if name.is_empty() {
        return Err(ConfigError::Invalid("Task name must not be empty".to_string()));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(ConfigError::Invalid(format!(
            "Task name '{}' must not contain whitespace",
            name
        )));
    }
    if name.starts_with('-') {
        return Err(ConfigError::Invalid(format!(
            "Task name '{}' must not start with '-'",
            name
        )));
    }
    Ok(())
}
