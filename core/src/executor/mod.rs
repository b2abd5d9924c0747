//! Command executor module
//!
//! Runs one command string through a shell and captures both streams.
//! Execution never fails past this boundary: spawn errors, timeouts and
//! non-zero exits all come back as a [`CommandResult`] with `failed` set.

use crate::config::ExecutorConfig;
use async_trait::async_trait;
use std::time::Duration;
use tokio::process::Command;

/// Outcome of running one command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Whether the command (or the attempt to run it) failed
    pub failed: bool,
}

impl CommandResult {
    /// A failed result carrying only a diagnostic.
    pub fn failure(diagnostic: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: diagnostic.into(),
            failed: true,
        }
    }
}

/// Anything that can run a command string for the agent.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run `command` to completion. Must not panic or error; faults are
    /// reported through [`CommandResult::failed`].
    async fn run(&self, command: &str) -> CommandResult;
}

/// Runs commands through a configured shell using `tokio::process`.
#[derive(Debug, Clone)]
pub struct ShellExecutor {
    /// Shell program and the flags that precede the command string
    program: String,
    args: &'static [&'static str],
    timeout: Duration,
    max_output_chars: usize,
}

impl ShellExecutor {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            program: config.shell.program().to_string(),
            args: config.shell.args(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
            max_output_chars: config.max_output_chars,
        }
    }

    fn build(&self, command: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args)
            .arg(command)
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn clip(&self, stream: &[u8]) -> String {
        let text = String::from_utf8_lossy(stream);
        match text.char_indices().nth(self.max_output_chars) {
            Some((idx, _)) if self.max_output_chars > 0 => format!(
                "{}\n... (output truncated after {} characters)",
                &text[..idx],
                self.max_output_chars
            ),
            _ => text.into_owned(),
        }
    }
}

#[async_trait]
impl CommandExecutor for ShellExecutor {
    async fn run(&self, command: &str) -> CommandResult {
        crate::info_log!("Executing via {}: {}", self.program, command);

        let output = match tokio::time::timeout(self.timeout, self.build(command).output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                crate::error_log!("Failed to start {}: {}", self.program, e);
                return CommandResult::failure(format!(
                    "An unexpected error occurred during command execution: failed to start '{}': {}",
                    self.program,
                    e
                ));
            }
            Err(_) => {
                crate::error_log!("Command timed out after {:?}: {}", self.timeout, command);
                return CommandResult::failure(format!(
                    "Command execution timed out after {} seconds.",
                    self.timeout.as_secs()
                ));
            }
        };

        let mut result = CommandResult {
            stdout: self.clip(&output.stdout),
            stderr: self.clip(&output.stderr),
            failed: !output.status.success(),
        };
        if result.failed && result.stderr.trim().is_empty() {
            result.stderr = match output.status.code() {
                Some(code) => format!("Command exited with status {}.", code),
                None => "Command was terminated by a signal.".to_string(),
            };
        }

        crate::debug_log!(
            "Command finished: failed={} stdout={}B stderr={}B",
            result.failed,
            result.stdout.len(),
            result.stderr.len()
        );
        result
    }
}
