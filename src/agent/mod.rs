//! The external generative agent.
//!
//! The engine only needs to hand the agent an instruction and learn whether
//! it exited successfully. [`Agent`] is that seam; [`ProcessAgent`] is the
//! real implementation that runs a configured command as a child process.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::AgentError;

#[cfg(test)]
pub mod mock;

/// Per-invocation options.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Upper bound on one invocation. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Discard the agent's stdout/stderr instead of inheriting the terminal.
    pub quiet: bool,
}

/// Result of an invocation that ran to completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    /// Process exit code; -1 when terminated by a signal.
    pub exit_code: i32,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Abstraction over agent invocation for testability.
/// Real implementation: `ProcessAgent`. Tests use scripted doubles.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn execute(
        &self,
        instruction: &str,
        options: &ExecOptions,
    ) -> Result<ExecResult, AgentError>;
}

/// Runs `<command> <args…> <instruction>` in the project directory.
pub struct ProcessAgent {
    command: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl ProcessAgent {
    pub fn new(command: impl Into<String>, args: Vec<String>, working_dir: PathBuf) -> Self {
        Self {
            command: command.into(),
            args,
            working_dir,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl Agent for ProcessAgent {
    async fn execute(
        &self,
        instruction: &str,
        options: &ExecOptions,
    ) -> Result<ExecResult, AgentError> {
        let mut cmd = Command::new(&self.command);
        cmd.args(&self.args)
            .arg(instruction)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if options.quiet {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        } else {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }

        debug!(command = %self.command, instruction, "spawning agent");
        let mut child = cmd.spawn().map_err(|source| AgentError::Spawn {
            command: self.command.clone(),
            source,
        })?;

        let status = match options.timeout {
            Some(limit) => match timeout(limit, child.wait()).await {
                Ok(result) => result.map_err(AgentError::Wait)?,
                Err(_) => {
                    warn!(secs = limit.as_secs(), "agent timed out, killing process");
                    if let Err(e) = child.kill().await {
                        warn!(error = %e, "failed to kill timed-out agent");
                    }
                    return Err(AgentError::Timeout(limit));
                }
            },
            None => child.wait().await.map_err(AgentError::Wait)?,
        };

        let exit_code = status.code().unwrap_or(-1);
        debug!(exit_code, "agent exited");
        Ok(ExecResult { exit_code })
    }
}
