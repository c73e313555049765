//! Price-refresh scheduler and threshold monitoring.
//!
//! Once a minute, fetch the current price for every pool with a token
//! contract address — sequentially, with a fixed delay between items, to
//! respect the oracle's rate limit — and feed each price through the
//! monitoring state machine. Price persistence itself is the oracle
//! collaborator's concern; the only thing written here is the per-pool
//! monitoring flag, and a timed-out drawdown triggers the removal action.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dlmm_keeper_actions::{PositionActions, PriceOracle};
use dlmm_keeper_data::DocumentStore;
use dlmm_keeper_domain::document::PoolDocument;
use dlmm_keeper_domain::monitor::{MonitorConfig, MonitorState, MonitorTransition};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::schedule::{MinuteOffsets, run_aligned};

/// The price-refresh schedule.
pub struct PriceRefresh {
    store: DocumentStore,
    oracle: Arc<dyn PriceOracle>,
    actions: Arc<dyn PositionActions>,
    monitor: MonitorConfig,
    item_delay: Duration,
    shutdown: CancellationToken,
}

impl PriceRefresh {
    /// Creates the schedule.
    pub fn new(
        store: DocumentStore,
        oracle: Arc<dyn PriceOracle>,
        actions: Arc<dyn PositionActions>,
        monitor: MonitorConfig,
        item_delay: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            store,
            oracle,
            actions,
            monitor,
            item_delay,
            shutdown,
        }
    }

    /// Runs until cancellation.
    pub async fn run(self, offsets: MinuteOffsets) {
        let shutdown = self.shutdown.clone();
        run_aligned("price-refresh", &offsets, &shutdown, || self.run_pass()).await;
    }

    /// One full pass over every pool with a token contract address.
    pub async fn run_pass(&self) {
        let docs = self.store.with_token();
        if docs.is_empty() {
            info!("No token contract addresses found, skipping price refresh");
            return;
        }
        info!(pools = docs.len(), "Starting price refresh pass");

        for (i, (pool, doc)) in docs.iter().enumerate() {
            if self.shutdown.is_cancelled() {
                info!("Price refresh pass interrupted by shutdown");
                return;
            }
            let Some(token) = doc.token_contract() else {
                continue;
            };
            self.refresh_one(pool, doc, token).await;

            if i + 1 < docs.len() {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {
                        info!("Price refresh pass interrupted by shutdown");
                        return;
                    }
                    _ = sleep(self.item_delay) => {}
                }
            }
        }
        info!("Price refresh pass complete");
    }

    async fn refresh_one(&self, pool: &str, doc: &PoolDocument, token: &str) {
        let name = doc.pool_name().unwrap_or("unknown");
        let price = match self.oracle.fetch_price(pool, token).await {
            Ok(Some(price)) => {
                info!(pool = %pool, name = %name, token = %token, price = %price, "Price fetched");
                price
            }
            Ok(None) => {
                warn!(pool = %pool, name = %name, token = %token, "Oracle produced no parsable price");
                return;
            }
            Err(e) => {
                warn!(pool = %pool, name = %name, token = %token, error = %e, "Price fetch failed");
                return;
            }
        };

        // Threshold math needs the ledger's reference close.
        let Some(reference) = doc.reference_close() else {
            return;
        };

        let (next, transition) =
            doc.monitor_state()
                .evaluate(price, reference, &self.monitor, Utc::now());
        match transition {
            MonitorTransition::Hold => {}
            MonitorTransition::Entered { target } => {
                warn!(
                    pool = %pool,
                    price = %price,
                    reference = %reference,
                    target = %target,
                    "Price drawdown detected, watching for recovery"
                );
                self.persist_monitor(pool, next);
            }
            MonitorTransition::Recovered => {
                info!(pool = %pool, price = %price, "Price recovered, keeping position");
                self.persist_monitor(pool, next);
            }
            MonitorTransition::TimedOut => {
                warn!(pool = %pool, price = %price, "Recovery window elapsed");
                self.persist_monitor(pool, next);
                self.remove_position(pool, doc).await;
            }
        }
    }

    async fn remove_position(&self, pool: &str, doc: &PoolDocument) {
        let Some(position) = doc.position_address() else {
            warn!(pool = %pool, "Pool never provisioned, nothing to remove");
            return;
        };
        info!(pool = %pool, position = %position, "Removing liquidity");
        match self.actions.remove(pool, position).await {
            Ok(()) => info!(pool = %pool, "Removal action succeeded"),
            Err(e) => error!(pool = %pool, error = %e, "Removal action failed"),
        }
    }

    fn persist_monitor(&self, pool: &str, state: MonitorState) {
        if let Err(e) = self.store.update_monitor(pool, state) {
            warn!(pool = %pool, error = %e, "Failed to persist monitor state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dlmm_keeper_actions::runner::ActionError;
    use dlmm_keeper_actions::ProvisionRequest;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use serde_json::Value;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct FixedOracle {
        price: Option<Decimal>,
        fetched: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PriceOracle for FixedOracle {
        async fn fetch_price(
            &self,
            pool: &str,
            _token: &str,
        ) -> Result<Option<Decimal>, ActionError> {
            self.fetched.lock().unwrap().push(pool.to_string());
            Ok(self.price)
        }
    }

    #[derive(Default)]
    struct RecordingActions {
        removed: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl PositionActions for RecordingActions {
        async fn provision(&self, _request: &ProvisionRequest) -> Result<(), ActionError> {
            Ok(())
        }

        async fn harvest(&self, _pool: &str) -> Result<(), ActionError> {
            Ok(())
        }

        async fn remove(&self, pool: &str, position: &str) -> Result<(), ActionError> {
            self.removed
                .lock()
                .unwrap()
                .push((pool.to_string(), position.to_string()));
            Ok(())
        }
    }

    fn seed_doc(store: &DocumentStore, pool: &str, reference: &str, position: Option<&str>) {
        let headers = vec![
            "poolAddress".to_string(),
            "ca".to_string(),
            "c".to_string(),
        ];
        let record = vec![
            pool.to_string(),
            format!("TOK-{pool}"),
            reference.to_string(),
        ];
        let mut doc = PoolDocument::from_row(&headers, &record);
        if let Some(position) = position {
            doc.extra.insert(
                "positionAddress".to_string(),
                Value::String(position.to_string()),
            );
        }
        store.save(&doc).unwrap();
    }

    fn refresh(
        store: DocumentStore,
        oracle: Arc<FixedOracle>,
        actions: Arc<RecordingActions>,
    ) -> PriceRefresh {
        PriceRefresh::new(
            store,
            oracle,
            actions,
            MonitorConfig::default(),
            Duration::from_millis(1),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_pass_fetches_every_pool_with_token() {
        let tmp = TempDir::new().unwrap();
        let store = DocumentStore::open(tmp.path()).unwrap();
        seed_doc(&store, "POOLA", "1.0", None);
        seed_doc(&store, "POOLB", "1.0", None);
        // No token column at all: skipped by enumeration.
        let headers = vec!["poolAddress".to_string()];
        store
            .save(&PoolDocument::from_row(&headers, &["NOTOKEN".to_string()]))
            .unwrap();

        let oracle = Arc::new(FixedOracle {
            price: Some(dec!(0.95)),
            fetched: Mutex::new(Vec::new()),
        });
        let actions = Arc::new(RecordingActions::default());
        refresh(store, Arc::clone(&oracle), Arc::clone(&actions))
            .run_pass()
            .await;

        assert_eq!(*oracle.fetched.lock().unwrap(), ["POOLA", "POOLB"]);
        assert!(actions.removed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drawdown_enters_monitoring() {
        let tmp = TempDir::new().unwrap();
        let store = DocumentStore::open(tmp.path()).unwrap();
        seed_doc(&store, "POOLA", "1.0", Some("POS1"));

        let oracle = Arc::new(FixedOracle {
            price: Some(dec!(0.50)),
            fetched: Mutex::new(Vec::new()),
        });
        let actions = Arc::new(RecordingActions::default());
        refresh(store.clone(), oracle, Arc::clone(&actions))
            .run_pass()
            .await;

        let doc = store.load("POOLA").unwrap();
        assert!(matches!(
            doc.monitor_state(),
            MonitorState::Monitoring { target, .. } if target == dec!(0.90)
        ));
        assert!(actions.removed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timed_out_monitoring_removes_position() {
        let tmp = TempDir::new().unwrap();
        let store = DocumentStore::open(tmp.path()).unwrap();
        seed_doc(&store, "POOLA", "1.0", Some("POS1"));
        // Monitoring since well past the timeout window.
        store
            .update_monitor(
                "POOLA",
                MonitorState::Monitoring {
                    since: Utc::now() - chrono::Duration::hours(2),
                    target: dec!(0.90),
                },
            )
            .unwrap();

        let oracle = Arc::new(FixedOracle {
            price: Some(dec!(0.40)),
            fetched: Mutex::new(Vec::new()),
        });
        let actions = Arc::new(RecordingActions::default());
        refresh(store.clone(), oracle, Arc::clone(&actions))
            .run_pass()
            .await;

        assert_eq!(
            *actions.removed.lock().unwrap(),
            [("POOLA".to_string(), "POS1".to_string())]
        );
        assert_eq!(store.load("POOLA").unwrap().monitor_state(), MonitorState::Idle);
    }

    #[tokio::test]
    async fn test_recovery_clears_flag_without_removal() {
        let tmp = TempDir::new().unwrap();
        let store = DocumentStore::open(tmp.path()).unwrap();
        seed_doc(&store, "POOLA", "1.0", Some("POS1"));
        store
            .update_monitor(
                "POOLA",
                MonitorState::Monitoring {
                    since: Utc::now(),
                    target: dec!(0.90),
                },
            )
            .unwrap();

        let oracle = Arc::new(FixedOracle {
            price: Some(dec!(0.95)),
            fetched: Mutex::new(Vec::new()),
        });
        let actions = Arc::new(RecordingActions::default());
        refresh(store.clone(), oracle, Arc::clone(&actions))
            .run_pass()
            .await;

        assert!(actions.removed.lock().unwrap().is_empty());
        assert_eq!(store.load("POOLA").unwrap().monitor_state(), MonitorState::Idle);
    }
}
