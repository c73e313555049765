//! Lifecycle supervisor and signal handling.
//!
//! Two states: running, and shutting down (terminal). A termination
//! signal cancels the shared token; every task observes it at its next
//! sleep or item boundary and exits, and the supervisor blocks until all
//! of them have. Cancellation only prevents starting new work — an
//! external action already in flight finishes or hits its own timeout.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Owns process-wide cancellation and the long-lived task handles.
pub struct Supervisor {
    shutdown: CancellationToken,
    exit_on_second_signal: bool,
    tasks: Vec<(String, JoinHandle<()>)>,
}

impl Supervisor {
    /// Creates a supervisor.
    pub fn new(exit_on_second_signal: bool) -> Self {
        Self {
            shutdown: CancellationToken::new(),
            exit_on_second_signal,
            tasks: Vec::new(),
        }
    }

    /// The shared cancellation token.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Spawns a named long-lived task.
    pub fn spawn<F>(&mut self, name: &str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!(task = name, "Starting task");
        self.tasks.push((name.to_string(), tokio::spawn(task)));
    }

    /// Blocks until a termination signal (or an external cancel of the
    /// token), then drains every task before returning.
    pub async fn run(mut self) {
        let shutdown = self.shutdown.clone();
        let exit_on_second = self.exit_on_second_signal;
        tokio::spawn(async move {
            wait_for_signal().await;
            info!("Termination signal received, shutting down gracefully");
            shutdown.cancel();
            if exit_on_second {
                wait_for_signal().await;
                warn!("Second termination signal, exiting immediately");
                std::process::exit(130);
            }
        });

        self.shutdown.cancelled().await;
        info!(tasks = self.tasks.len(), "Waiting for tasks to stop");
        for (name, handle) in self.tasks.drain(..) {
            match handle.await {
                Ok(()) => debug!(task = %name, "Task stopped"),
                Err(e) if e.is_cancelled() => {}
                Err(e) => error!(task = %name, error = %e, "Task ended abnormally"),
            }
        }
        info!("Keeper shut down cleanly");
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            warn!(error = %e, "Failed to install SIGTERM handler, listening for ctrl-c only");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
