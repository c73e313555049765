//! Keeper configuration.

use std::path::PathBuf;

use dlmm_keeper_domain::monitor::MonitorConfig;

/// Configuration for the orchestration core.
#[derive(Debug, Clone)]
pub struct KeeperConfig {
    /// Append-only opportunity ledger CSV.
    pub ledger_path: PathBuf,
    /// State-store directory of per-pool documents.
    pub data_dir: PathBuf,
    /// Token blacklist for the swap sweep.
    pub blacklist_path: PathBuf,
    /// Log directory, one timestamped file per run.
    pub log_dir: PathBuf,
    /// Maximum concurrent provisioning dispatches.
    pub max_concurrent_dispatch: usize,
    /// Settle delay after a ledger write event, in milliseconds.
    pub ledger_settle_ms: u64,
    /// Settle delay after a document create event, in milliseconds.
    pub document_settle_ms: u64,
    /// Second-of-minute offsets for the price refresh.
    pub price_offsets: Vec<u32>,
    /// Second-of-minute offsets for the reward harvest.
    pub harvest_offsets: Vec<u32>,
    /// Second-of-minute offsets for the swap sweep.
    pub sweep_offsets: Vec<u32>,
    /// Delay between price fetches within one pass, in milliseconds.
    pub price_item_delay_ms: u64,
    /// Delay between swaps within one pass, in milliseconds.
    pub swap_item_delay_ms: u64,
    /// Fee ceiling handed to the swap executable, in lamports.
    pub swap_fee_ceiling: u64,
    /// Price-threshold monitoring thresholds.
    pub monitor: MonitorConfig,
    /// Whether a second termination signal exits immediately.
    pub exit_on_second_signal: bool,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            ledger_path: PathBuf::from("auto_profit.csv"),
            data_dir: PathBuf::from("data"),
            blacklist_path: PathBuf::from("blacklist.txt"),
            log_dir: PathBuf::from("data/log"),
            max_concurrent_dispatch: 20,
            ledger_settle_ms: 200,
            document_settle_ms: 100,
            price_offsets: vec![1],        // second 01 of each minute
            harvest_offsets: vec![2, 32],  // twice per minute
            sweep_offsets: vec![6],        // second 06 of each minute
            price_item_delay_ms: 1100,     // oracle rate limit
            swap_item_delay_ms: 2000,
            swap_fee_ceiling: 10_000,
            monitor: MonitorConfig::default(),
            exit_on_second_signal: true,
        }
    }
}
