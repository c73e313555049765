//! Bounded provisioning fan-out.
//!
//! Turns "a new document appeared" into "the provisioning action ran for
//! it", at most once per path and never more than the permit ceiling in
//! flight. The permit is acquired *before* the task is spawned so a burst
//! of documents backpressures the event loop instead of piling up tasks.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dlmm_keeper_actions::{PositionActions, ProvisionRequest};
use dlmm_keeper_data::DocumentStore;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::sleep;
use tracing::{error, info};

use crate::registry::DispatchRegistry;

/// Fans newly discovered documents out to the provisioning action.
pub struct ProvisionDispatcher {
    store: DocumentStore,
    actions: Arc<dyn PositionActions>,
    registry: Arc<DispatchRegistry>,
    permits: Arc<Semaphore>,
    settle: Duration,
}

impl ProvisionDispatcher {
    /// Creates a dispatcher with `max_concurrent` permits.
    pub fn new(
        store: DocumentStore,
        actions: Arc<dyn PositionActions>,
        max_concurrent: usize,
        settle: Duration,
    ) -> Self {
        Self {
            store,
            actions,
            registry: Arc::new(DispatchRegistry::new()),
            permits: Arc::new(Semaphore::new(max_concurrent)),
            settle,
        }
    }

    /// The dedup registry.
    pub fn registry(&self) -> &Arc<DispatchRegistry> {
        &self.registry
    }

    /// Dispatches `path` unless it was already claimed this run.
    ///
    /// Blocks until a permit is free, then spawns the dispatch body into
    /// `tasks`; the permit is released when the body finishes, success or
    /// failure.
    pub async fn dispatch(&self, path: PathBuf, tasks: &mut JoinSet<()>) {
        if !self.registry.try_claim(&path) {
            return;
        }
        info!(path = %path.display(), "New document detected");

        let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
            // Semaphore closed only happens on teardown.
            return;
        };

        let store = self.store.clone();
        let actions = Arc::clone(&self.actions);
        let settle = self.settle;
        tasks.spawn(async move {
            let _permit = permit;
            sleep(settle).await;
            run_provision(&store, actions.as_ref(), &path).await;
        });
    }
}

async fn run_provision(store: &DocumentStore, actions: &dyn PositionActions, path: &Path) {
    let doc = match store.load_path(path) {
        Ok(doc) => doc,
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to read new document");
            return;
        }
    };

    if doc.pool_address.is_empty() {
        error!(path = %path.display(), "Document has no poolAddress, not provisioning");
        return;
    }

    let request = ProvisionRequest {
        pool: doc.pool_address.clone(),
        token: doc.token_contract().map(str::to_string),
        last_updated_first: doc.last_updated_first().map(str::to_string),
    };

    info!(pool = %request.pool, "Provisioning new pool");
    match actions.provision(&request).await {
        Ok(()) => info!(pool = %request.pool, "Provisioning succeeded, pool joins the periodic schedules"),
        // The document stays unprovisioned; schedulers keep skipping it.
        Err(e) => error!(pool = %request.pool, error = %e, "Provisioning failed"),
    }
}
