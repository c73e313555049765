//! Subprocess runner.
//!
//! All external actions share one invocation shape: spawn a command from
//! the configured working directory, capture combined stdout/stderr, and
//! map the exit status. The child is killed if its future is dropped, so
//! a timed-out or cancelled invocation never leaks a process.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

/// Errors from a single external-action invocation.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// The command could not be spawned or waited on.
    #[error("failed to run {action}: {source}")]
    Spawn {
        /// Action label.
        action: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The command exited non-zero.
    #[error("{action} exited with status {code:?}")]
    Failed {
        /// Action label.
        action: String,
        /// Exit code, if the process was not signal-killed.
        code: Option<i32>,
    },
    /// The command exceeded its per-invocation timeout.
    #[error("{action} timed out after {secs}s")]
    TimedOut {
        /// Action label.
        action: String,
        /// Configured limit.
        secs: u64,
    },
}

/// One concrete invocation.
#[derive(Debug, Clone)]
pub struct ActionCommand {
    /// Short label for logs and errors (usually the script name).
    pub label: String,
    /// Program to execute.
    pub program: String,
    /// Arguments, already rendered.
    pub args: Vec<String>,
    /// Per-invocation timeout; `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Runs action commands from a fixed working directory.
#[derive(Debug, Clone)]
pub struct ScriptRunner {
    work_dir: PathBuf,
}

impl ScriptRunner {
    /// Creates a runner rooted at `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
        }
    }

    /// Runs `cmd` to completion and returns its combined output.
    ///
    /// The collaborator's output is mirrored to the log sink whether the
    /// invocation succeeds or not.
    ///
    /// # Errors
    /// Returns an error on spawn failure, non-zero exit, or timeout.
    pub async fn run(&self, cmd: &ActionCommand) -> Result<String, ActionError> {
        debug!(
            action = %cmd.label,
            command = %format!("{} {}", cmd.program, cmd.args.join(" ")),
            "Invoking external action"
        );

        let child = Command::new(&cmd.program)
            .args(&cmd.args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ActionError::Spawn {
                action: cmd.label.clone(),
                source,
            })?;

        let waited = match cmd.timeout {
            Some(limit) => match timeout(limit, child.wait_with_output()).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(ActionError::TimedOut {
                        action: cmd.label.clone(),
                        secs: limit.as_secs(),
                    });
                }
            },
            None => child.wait_with_output().await,
        };

        let output = waited.map_err(|source| ActionError::Spawn {
            action: cmd.label.clone(),
            source,
        })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        if !combined.trim().is_empty() {
            info!(action = %cmd.label, "{}", combined.trim_end());
        }

        if output.status.success() {
            Ok(combined)
        } else {
            Err(ActionError::Failed {
                action: cmd.label.clone(),
                code: output.status.code(),
            })
        }
    }
}
