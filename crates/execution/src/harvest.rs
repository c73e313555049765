//! Reward-harvest scheduler.
//!
//! Twice a minute, claim accumulated rewards for every provisioned pool.
//! Unprovisioned documents are not an error, they just are not ready yet.

use std::sync::Arc;

use dlmm_keeper_actions::PositionActions;
use dlmm_keeper_data::DocumentStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::schedule::{MinuteOffsets, run_aligned};

/// The reward-harvest schedule.
pub struct RewardHarvest {
    store: DocumentStore,
    actions: Arc<dyn PositionActions>,
    shutdown: CancellationToken,
}

impl RewardHarvest {
    /// Creates the schedule.
    pub fn new(
        store: DocumentStore,
        actions: Arc<dyn PositionActions>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            actions,
            shutdown,
        }
    }

    /// Runs until cancellation.
    pub async fn run(self, offsets: MinuteOffsets) {
        let shutdown = self.shutdown.clone();
        run_aligned("reward-harvest", &offsets, &shutdown, || self.run_pass()).await;
    }

    /// One full pass over every provisioned pool, sequentially.
    pub async fn run_pass(&self) {
        info!("Starting reward harvest pass");
        let mut harvested = 0usize;
        for (pool, _doc) in self.store.provisioned() {
            if self.shutdown.is_cancelled() {
                info!("Harvest pass interrupted by shutdown");
                return;
            }
            harvested += 1;
            info!(pool = %pool, "Claiming rewards");
            if let Err(e) = self.actions.harvest(&pool).await {
                // Keep going; the next pool is unrelated to this failure.
                error!(pool = %pool, error = %e, "Harvest action failed");
            }
        }
        info!(pools = harvested, "Reward harvest pass complete");
    }
}
