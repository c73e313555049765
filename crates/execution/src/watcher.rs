//! Filesystem event loop.
//!
//! One `notify` watcher covers both inputs: write events on the ledger
//! file feed the tailer, create events in the store directory feed the
//! provisioning dispatcher. Events are bridged from the watcher's own
//! thread into a tokio channel; watcher errors are logged and never fatal
//! once the watches are established.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use dlmm_keeper_data::store::DOCUMENT_EXT;
use dlmm_keeper_data::{DocumentStore, LedgerTailer};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dispatcher::ProvisionDispatcher;

/// Owns the filesystem watcher and multiplexes its events.
pub struct WatchHub {
    store: DocumentStore,
    tailer: LedgerTailer,
    dispatcher: ProvisionDispatcher,
    ledger_path: PathBuf,
    ledger_settle: Duration,
    shutdown: CancellationToken,
    // Dropping the watcher stops event delivery.
    watcher: RecommendedWatcher,
    events: mpsc::Receiver<notify::Result<Event>>,
}

impl WatchHub {
    /// Establishes watches on the ledger file and the store directory.
    ///
    /// # Errors
    /// Returns an error if either watch cannot be established — fatal at
    /// startup, the keeper would otherwise run blind.
    pub fn new(
        store: DocumentStore,
        tailer: LedgerTailer,
        dispatcher: ProvisionDispatcher,
        ledger_settle: Duration,
        shutdown: CancellationToken,
    ) -> anyhow::Result<Self> {
        let (tx, events) = mpsc::channel(256);
        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            // Runs on the notify thread; the channel bridges into tokio.
            let _ = tx.blocking_send(result);
        })
        .context("create filesystem watcher")?;

        watcher
            .watch(tailer.path(), RecursiveMode::NonRecursive)
            .with_context(|| format!("watch ledger file {}", tailer.path().display()))?;
        watcher
            .watch(store.dir(), RecursiveMode::NonRecursive)
            .with_context(|| format!("watch store directory {}", store.dir().display()))?;

        // Events report absolute paths; compare against the resolved one.
        let ledger_path = tailer
            .path()
            .canonicalize()
            .unwrap_or_else(|_| tailer.path().to_path_buf());

        Ok(Self {
            store,
            tailer,
            dispatcher,
            ledger_path,
            ledger_settle,
            shutdown,
            watcher,
            events,
        })
    }

    /// Runs the event loop until cancellation, then drains in-flight
    /// dispatches.
    pub async fn run(self) {
        let WatchHub {
            store,
            mut tailer,
            dispatcher,
            ledger_path,
            ledger_settle,
            shutdown,
            watcher,
            mut events,
        } = self;

        info!(
            ledger = %ledger_path.display(),
            dir = %store.dir().display(),
            "Watching ledger and store directory"
        );

        let mut tasks = JoinSet::new();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown signalled, stopping filesystem watch");
                    break;
                }
                maybe = events.recv() => {
                    match maybe {
                        Some(Ok(event)) => {
                            handle_event(
                                &store,
                                &mut tailer,
                                &dispatcher,
                                &ledger_path,
                                ledger_settle,
                                event,
                                &mut tasks,
                            )
                            .await;
                        }
                        Some(Err(e)) => warn!(error = %e, "Filesystem watcher error"),
                        None => {
                            warn!("Filesystem watcher channel closed");
                            break;
                        }
                    }
                }
            }
            // Reap finished dispatches as we go.
            while tasks.try_join_next().is_some() {}
        }

        // Stop accepting new events, let in-flight dispatches finish.
        drop(watcher);
        if !tasks.is_empty() {
            info!(in_flight = tasks.len(), "Draining in-flight provisioning dispatches");
        }
        while tasks.join_next().await.is_some() {}
        info!("Filesystem watcher stopped");
    }
}

async fn handle_event(
    store: &DocumentStore,
    tailer: &mut LedgerTailer,
    dispatcher: &ProvisionDispatcher,
    ledger_path: &Path,
    ledger_settle: Duration,
    event: Event,
    tasks: &mut JoinSet<()>,
) {
    if event.kind.is_modify() && event.paths.iter().any(|p| p.as_path() == ledger_path) {
        // Let the writer finish the line before counting it.
        sleep(ledger_settle).await;
        if let Err(e) = tailer.drain_new(store) {
            warn!(error = %e, "Ledger scan failed, will retry on next write");
        }
        return;
    }

    if event.kind.is_create() {
        for path in event.paths {
            if path.extension().and_then(|e| e.to_str()) == Some(DOCUMENT_EXT) {
                dispatcher.dispatch(path, tasks).await;
            }
        }
    }
}
