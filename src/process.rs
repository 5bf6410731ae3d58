//! External process execution
//!
//! Everything that shells out goes through [`ProcessRunner`] so failures are
//! reported the same way and tests can substitute a fake.

use crate::error::FetchError;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Result of running an external program
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// Exit code, `None` when killed by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// File the program was asked to produce, if any
    pub produced: Option<PathBuf>,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// What the program said about a failure: stderr, or stdout if stderr is empty
    pub fn diagnostics(&self) -> &str {
        match self.stderr.trim() {
            "" => self.stdout.trim(),
            err => err,
        }
    }
}

/// Runs a program to completion with a timeout
#[allow(async_fn_in_trait)]
pub trait ProcessRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, FetchError>;
}

/// Runs real processes via `tokio::process`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> Result<ProcessOutput, FetchError> {
        tracing::debug!(program, ?args, "spawning");

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FetchError::io(program, e))?;

        // dropping the future on timeout kills the child
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| FetchError::io(program, e))?,
            Err(_) => return Err(FetchError::Timeout(timeout)),
        };

        Ok(ProcessOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            produced: None,
        })
    }
}
