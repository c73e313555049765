//! Orchestration core of the DLMM keeper.
//!
//! A small, fixed set of long-lived tokio tasks sharing the document
//! store: the filesystem watcher (ledger tailing + provisioning fan-out)
//! and three wall-clock-aligned schedulers (price refresh, reward
//! harvest, swap sweep). The supervisor owns process-wide cancellation;
//! everything observes it cooperatively at sleep and item boundaries.

/// Keeper configuration.
pub mod config;
/// Bounded provisioning fan-out.
pub mod dispatcher;
/// Reward-harvest scheduler.
pub mod harvest;
/// Price-refresh scheduler and threshold monitoring.
pub mod price_refresh;
/// Dispatch dedup registry.
pub mod registry;
/// Wall-clock-aligned scheduling.
pub mod schedule;
/// Lifecycle supervisor and signal handling.
pub mod supervisor;
/// Swap-sweep scheduler.
pub mod swap_sweep;
/// Filesystem event loop.
pub mod watcher;

pub use config::KeeperConfig;
pub use dispatcher::ProvisionDispatcher;
pub use harvest::RewardHarvest;
pub use price_refresh::PriceRefresh;
pub use registry::DispatchRegistry;
pub use schedule::MinuteOffsets;
pub use supervisor::Supervisor;
pub use swap_sweep::SwapSweep;
pub use watcher::WatchHub;
