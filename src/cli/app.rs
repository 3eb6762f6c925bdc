//! Main CLI application

use crate::config::{parse_config_auto, parse_config_file, validate_config, Config};
use crate::engine::{run_all, RunOptions, DEFAULT_TASK};
use crate::error::SlurpError;
use crate::log::{ConsoleSink, Logger, Verbosity};
use crate::runner::build_registry;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the tracing filter
pub const LOG_ENV: &str = "SLURP_LOG";

/// Options taken from the command line
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Tasks to run, in order
    pub tasks: Vec<String>,
    /// Explicit task file
    pub file: Option<PathBuf>,
    pub verbosity: Verbosity,
    /// Print the task list instead of running
    pub list: bool,
    /// Run each task at most once
    pub once: bool,
}

impl Options {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let tasks = matches
            .get_many::<String>("tasks")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();

        Options {
            tasks,
            file: matches.get_one::<String>("file").map(PathBuf::from),
            verbosity: get_verbosity(matches),
            list: matches.get_flag("list"),
            once: matches.get_flag("once"),
        }
    }

    /// Requested tasks, or the default task when none were named
    pub fn tasks_or_default(&self) -> Vec<String> {
        if self.tasks.is_empty() {
            vec![DEFAULT_TASK.to_string()]
        } else {
            self.tasks.clone()
        }
    }
}

/// CLI application
pub struct App {
    /// Parsed configuration
    config: Config,
    /// Task file path
    config_path: PathBuf,
}

impl App {
    /// Create a new app from the discovered task file
    pub fn new() -> Result<Self, SlurpError> {
        let (config, config_path) = parse_config_auto()?;
        Self::from_config(config, config_path)
    }

    /// Create app with a specific task file
    pub fn with_config_file(path: PathBuf) -> Result<Self, SlurpError> {
        let config = parse_config_file(&path)?;
        Self::from_config(config, path)
    }

    fn from_config(config: Config, config_path: PathBuf) -> Result<Self, SlurpError> {
        validate_config(&config)?;
        Ok(App {
            config,
            config_path,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Directory commands run relative to
    fn config_dir(&self) -> &Path {
        match self.config_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    /// Run the requested tasks one after another, stopping at the first failure
    pub async fn run(&self, options: &Options) -> Result<(), SlurpError> {
        if options.list {
            print!("{}", self.task_list());
            return Ok(());
        }

        let registry = build_registry(&self.config, self.config_dir())?;
        let log = Logger::new(ConsoleSink::new(options.verbosity));
        let run_options = RunOptions {
            memoize: options.once || self.config.once,
        };

        let names = options.tasks_or_default();
        run_all(&registry, names.as_slice(), &log, run_options).await?;
        Ok(())
    }

    /// Public tasks with their usage and dependencies
    pub fn task_list(&self) -> String {
        let title = self.config.name.clone().unwrap_or_else(|| "slurp".to_string());
        let mut out = format!("{}\n", title.bold());

        if let Some(usage) = &self.config.usage {
            out.push_str(&format!("{}\n", usage));
        }
        out.push('\n');

        let width = self
            .config
            .tasks
            .iter()
            .filter(|(_, task)| !task.private)
            .map(|(name, _)| name.len())
            .max()
            .unwrap_or(0);

        for (name, task) in &self.config.tasks {
            if task.private {
                continue;
            }

            let padded = format!("{:<width$}", name, width = width);
            let mut line = format!("  {}", padded.green());
            if let Some(usage) = &task.usage {
                line.push_str(&format!("  {}", usage));
            }
            if !task.deps.is_empty() {
                line.push_str(&format!(
                    "  {}",
                    format!("[{}]", task.deps.join(", ")).bright_black()
                ));
            }
            out.push_str(line.trim_end());
            out.push('\n');
        }

        out
    }
}

/// Build the clap command
pub fn build_command() -> Command {
    Command::new("slurp")
        .version(env!("CARGO_PKG_VERSION"))
        .about("A small build-style task runner")
        .arg(
            Arg::new("tasks")
                .value_name("TASK")
                .help("Tasks to run (defaults to 'default')")
                .num_args(0..)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Path to slurp.yml task file"),
        )
        .arg(
            Arg::new("list")
                .short('l')
                .long("list")
                .help("List available tasks")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .help("Run each task at most once per invocation, even when several tasks depend on it")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Only print errors")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("silent")
                .short('s')
                .long("silent")
                .help("Print no output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Print verbose output")
                .action(ArgAction::SetTrue),
        )
}

/// Get verbosity level from matches
fn get_verbosity(matches: &ArgMatches) -> Verbosity {
    if matches.get_flag("silent") {
        Verbosity::Silent
    } else if matches.get_flag("quiet") {
        Verbosity::Quiet
    } else if matches.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    }
}

/// Install the stderr tracing subscriber, filtered by `SLURP_LOG`
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    // A subscriber may already be installed when embedded
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the CLI application with the process arguments
pub async fn run() -> Result<(), SlurpError> {
    run_from(std::env::args_os()).await
}

/// Run the CLI application with provided arguments
pub async fn run_from<I, T>(args: I) -> Result<(), SlurpError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_command().get_matches_from(args);
    let options = Options::from_matches(&matches);

    init_tracing();

    let app = match &options.file {
        Some(path) => App::with_config_file(path.clone())?,
        None => App::new()?,
    };

    app.run(&options).await
}
