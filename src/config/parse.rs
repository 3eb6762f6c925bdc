//! Task file parsing and discovery

use crate::config::types::{Config, Task};
use crate::error::{ConfigError, ConfigResult, SlurpError};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default task file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["slurp.yml", "slurp.yaml"];

/// Find the task file by searching current and parent directories
pub fn find_config_file() -> ConfigResult<PathBuf> {
    find_config_file_from(env::current_dir().map_err(|e| {
        ConfigError::Invalid(format!("Failed to get current directory: {}", e))
    })?)
}

/// Find the task file starting from a specific directory
pub fn find_config_file_from(start_dir: PathBuf) -> ConfigResult<PathBuf> {
    let mut current_dir = start_dir;
    let mut searched_paths = Vec::new();

    loop {
        for file_name in CONFIG_FILE_NAMES {
            let config_path = current_dir.join(file_name);
            searched_paths.push(config_path.display().to_string());

            if config_path.is_file() {
                return Ok(config_path);
            }
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => return Err(ConfigError::NotFound(searched_paths.join(", "))),
        }
    }
}

/// Parse a task file from a path
pub fn parse_config_file(path: &Path) -> Result<Config, SlurpError> {
    let contents = fs::read_to_string(path).map_err(|e| {
        ConfigError::Invalid(format!("Failed to read {}: {}", path.display(), e))
    })?;

    parse_config(&contents, Some(path))
}

/// Parse configuration from a string
///
/// Includes are resolved relative to `config_path` when one is given.
pub fn parse_config(yaml: &str, config_path: Option<&Path>) -> Result<Config, SlurpError> {
    let mut config: Config = serde_yaml::from_str(yaml)?;

    if let Some(base_path) = config_path {
        process_includes(&mut config, base_path)?;
    }

    Ok(config)
}

/// Replace tasks carrying an `include` with the task read from that file
///
/// The included file supplies the commands, directory and environment.
/// `deps`, `usage` and `private` declared next to the include are merged in.
fn process_includes(config: &mut Config, config_path: &Path) -> ConfigResult<()> {
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));

    for (name, task) in config.tasks.iter_mut() {
        if let Some(include_path) = task.include.take() {
            // Commands and where they run come from the included file only
            if !task.run.is_empty() || task.dir.is_some() || !task.env.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Task '{}' sets 'include' together with 'run', 'dir' or 'env'",
                    name
                )));
            }

            let mut included = load_included_task(&base_dir.join(&include_path))?;

            // Dependencies declared next to the include are kept
            for dep in task.deps.drain(..) {
                if !included.deps.contains(&dep) {
                    included.deps.push(dep);
                }
            }
            if task.usage.is_some() {
                included.usage = task.usage.take();
            }
            included.private |= task.private;
            *task = included;
        }
    }

    Ok(())
}

/// Load a task from an included file
fn load_included_task(path: &Path) -> ConfigResult<Task> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::IncludeFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    let task: Task = serde_yaml::from_str(&contents).map_err(|e| ConfigError::IncludeFile {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    if task.include.is_some() {
        return Err(ConfigError::IncludeFile {
            path: path.to_path_buf(),
            error: "included tasks cannot include further files".to_string(),
        });
    }

    Ok(task)
}

/// Parse the task file with automatic discovery
pub fn parse_config_auto() -> Result<(Config, PathBuf), SlurpError> {
    let config_path = find_config_file()?;
    let config = parse_config_file(&config_path)?;
    Ok((config, config_path))
}
