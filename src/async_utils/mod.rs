//! Asynchronous utilities for use with Tokio.
//!
//! Everything that talks to an external process goes through here, so that
//! tool output is logged the same way no matter who ran the tool.

use std::process::Output;

use tokio::process::Command;

use crate::prelude::*;

pub mod io;

/// Wrapper around [`tokio::task::spawn_blocking`] that propagates panics from
/// the background task.
pub async fn spawn_blocking_propagating_panics<F, T>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(value) => value,
        // Propagate any panics from the blocking task.
        Err(err) => std::panic::resume_unwind(err.into_panic()),
    }
}

/// Log the standard output and standard error of a finished command.
///
/// Standard error is only logged as a warning if the command failed, because
/// most of the tools we run are chatty even when everything went fine.
pub fn log_command_output(command_name: &str, output: &Output) {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stdout.trim().is_empty() {
        debug!(
            command_name = command_name,
            output = %stdout,
            "Standard output from command"
        );
    }
    if stderr.trim().is_empty() {
        return;
    }
    if output.status.success() {
        debug!(
            command_name = command_name,
            output = %stderr,
            "Standard error from command",
        );
    } else {
        warn!(
            command_name = command_name,
            output = %stderr,
            "Standard error from command",
        );
    }
}

/// Run a child in its own process group, so that Ctrl-C in the terminal only
/// reaches us. Stopping the child is then up to `kill_on_drop`.
pub fn detach_from_terminal_signals(cmd: &mut Command) -> &mut Command {
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

/// Report any command failures, and include any error output.
pub fn check_for_command_failure(command_name: &str, output: &Output) -> Result<()> {
    log_command_output(command_name, output);
    let stderr = String::from_utf8_lossy(&output.stderr);
    if output.status.success() {
        Ok(())
    } else if let Some(exit_code) = output.status.code() {
        Err(anyhow!(
            "{} failed with exit code {} and error output:\n{}",
            command_name,
            exit_code,
            stderr,
        ))
    } else {
        Err(anyhow!(
            "{} failed with error output:\n{}",
            command_name,
            stderr,
        ))
    }
}
