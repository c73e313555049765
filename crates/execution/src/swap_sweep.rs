//! Swap-sweep scheduler.
//!
//! Once a minute: list current wallet holdings, parse the token addresses
//! out of the listing, drop anything on the freshly reloaded blacklist,
//! and swap the rest back to the base asset one at a time. Swaps are best
//! effort — a failure or timeout on one token never blocks the next — but
//! cancellation short-circuits the remaining items immediately.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dlmm_keeper_actions::{HoldingsDesk, parse};
use dlmm_keeper_data::Blacklist;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::schedule::{MinuteOffsets, run_aligned};

/// The swap-sweep schedule.
pub struct SwapSweep {
    desk: Arc<dyn HoldingsDesk>,
    blacklist_path: PathBuf,
    fee_ceiling: u64,
    item_delay: Duration,
    shutdown: CancellationToken,
}

impl SwapSweep {
    /// Creates the schedule.
    pub fn new(
        desk: Arc<dyn HoldingsDesk>,
        blacklist_path: PathBuf,
        fee_ceiling: u64,
        item_delay: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            desk,
            blacklist_path,
            fee_ceiling,
            item_delay,
            shutdown,
        }
    }

    /// One full sweep over current holdings.
    pub async fn run_pass(&self) {
        let raw = match self.desk.list_holdings().await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Holdings listing failed, skipping sweep");
                return;
            }
        };

        let held = parse::parse_holdings(&raw);
        if held.is_empty() {
            info!("No held tokens reported, nothing to sweep");
            return;
        }

        let blacklist = Blacklist::load(&self.blacklist_path);
        let targets: Vec<String> = held
            .into_iter()
            .filter(|token| {
                if blacklist.contains(token) {
                    info!(token = %token, "Token blacklisted, skipping");
                    false
                } else {
                    true
                }
            })
            .collect();
        info!(
            tokens = targets.len(),
            blacklisted = blacklist.len(),
            "Starting swap sweep"
        );

        for (i, token) in targets.iter().enumerate() {
            if self.shutdown.is_cancelled() {
                info!("Swap sweep interrupted by shutdown");
                return;
            }
            match self.desk.swap(token, self.fee_ceiling).await {
                Ok(()) => info!(token = %token, "Swap succeeded"),
                Err(e) => warn!(token = %token, error = %e, "Swap failed"),
            }
            if i + 1 < targets.len() {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("Swap sweep interrupted by shutdown");
                        return;
                    }
                    _ = sleep(self.item_delay) => {}
                }
            }
        }
        info!("Swap sweep complete");
    }

    /// Runs until cancellation.
    pub async fn run(self, offsets: MinuteOffsets) {
        let shutdown = self.shutdown.clone();
        run_aligned("swap-sweep", &offsets, &shutdown, || self.run_pass()).await;
    }
}
