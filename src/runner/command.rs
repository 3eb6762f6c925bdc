//! Command execution
//!
//! This module handles executing shell commands. Output is read line by line
//! and written through the task's logger so concurrent tasks don't garble
//! each other's lines.

use crate::config::Command;
use crate::error::{ExecutionError, ExecutionResult};
use crate::log::Logger;
use crate::runner::Context;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command as TokioCommand;

/// Execute a command in the given context
pub async fn execute_command(cmd: &Command, ctx: &Context, log: &Logger) -> ExecutionResult<()> {
    let quiet = cmd.is_quiet();
    if !quiet {
        log.infof(format_args!("$ {}", cmd.print()));
    }

    let (program, interpreter_args) =
        ctx.interpreter
            .split_first()
            .ok_or_else(|| ExecutionError::Spawn {
                command: cmd.print().to_string(),
                error: "no interpreter configured".to_string(),
            })?;

    let mut command = TokioCommand::new(program);
    command
        .args(interpreter_args)
        .arg(cmd.exec())
        .current_dir(ctx.resolve_dir(cmd.dir()))
        .envs(&ctx.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| ExecutionError::Spawn {
        command: cmd.print().to_string(),
        error: e.to_string(),
    })?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (status, (), ()) = tokio::join!(
        child.wait(),
        forward(stdout, log, quiet),
        forward(stderr, log, quiet),
    );

    let status = status.map_err(|e| ExecutionError::Spawn {
        command: cmd.print().to_string(),
        error: e.to_string(),
    })?;

    if !status.success() {
        return Err(ExecutionError::CommandFailed {
            command: cmd.print().to_string(),
            code: status.code(),
        });
    }

    Ok(())
}

/// Copy lines from a child's pipe into the logger
///
/// Lines are read as raw bytes; invalid UTF-8 is replaced rather than
/// ending the copy, so the pipe is drained until the child closes it.
async fn forward<R>(pipe: Option<R>, log: &Logger, quiet: bool)
where
    R: AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return;
    };

    let mut reader = BufReader::new(pipe);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if !quiet {
                    log.info(String::from_utf8_lossy(trim_newline(&buf)));
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "stopped reading command output");
                break;
            }
        }
    }
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
