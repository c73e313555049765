//! DLMM keeper daemon.
//!
//! Tails the opportunity ledger, provisions newly discovered pools, and
//! runs the periodic price/harvest/sweep schedules until a termination
//! signal arrives.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use dlmm_keeper_actions::{
    HoldingsDesk, PositionActions, PriceOracle, ScriptActions, ScriptsConfig,
};
use dlmm_keeper_data::{DocumentStore, LedgerTailer};
use dlmm_keeper_execution::{
    KeeperConfig, MinuteOffsets, PriceRefresh, ProvisionDispatcher, RewardHarvest, Supervisor,
    SwapSweep, WatchHub,
};
use dotenv::dotenv;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "dlmm-keeper")]
#[command(about = "Automated liquidity keeper for Meteora DLMM positions", long_about = None)]
struct Cli {
    /// Append-only opportunity ledger CSV
    #[arg(long, default_value = "auto_profit.csv")]
    ledger: PathBuf,

    /// State-store directory of per-pool documents
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Token blacklist consulted by the swap sweep
    #[arg(long, default_value = "blacklist.txt")]
    blacklist: PathBuf,

    /// Log directory, one timestamped file per run
    #[arg(long, default_value = "data/log")]
    log_dir: PathBuf,

    /// Directory the external action scripts run from
    #[arg(long, default_value = ".")]
    scripts_dir: PathBuf,

    /// Maximum concurrent provisioning dispatches
    #[arg(long, default_value_t = 20)]
    max_concurrent: usize,

    /// Fee ceiling for the swap executable, in lamports
    #[arg(long, default_value_t = 10_000)]
    swap_fee_ceiling: u64,

    /// Exit immediately when a second termination signal arrives
    #[arg(long, action = clap::ArgAction::Set, default_value_t = true)]
    exit_on_second_signal: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();

    let config = KeeperConfig {
        ledger_path: cli.ledger,
        data_dir: cli.data_dir,
        blacklist_path: cli.blacklist,
        log_dir: cli.log_dir,
        max_concurrent_dispatch: cli.max_concurrent,
        swap_fee_ceiling: cli.swap_fee_ceiling,
        exit_on_second_signal: cli.exit_on_second_signal,
        ..KeeperConfig::default()
    };

    let _log_guard = init_logging(&config.log_dir).context("initialize log sink")?;

    // Fatal startup checks: without the ledger and the store directory the
    // keeper has no operating contract.
    let store = DocumentStore::open(&config.data_dir).context("create state store directory")?;
    let tailer = LedgerTailer::open(&config.ledger_path).context("open opportunity ledger")?;
    info!(
        ledger = %config.ledger_path.display(),
        columns = tailer.headers().len(),
        lines = tailer.line_count(),
        "Ledger opened"
    );

    let scripts = Arc::new(ScriptActions::new(ScriptsConfig {
        work_dir: cli.scripts_dir,
        ..ScriptsConfig::default()
    }));
    let position_actions: Arc<dyn PositionActions> = scripts.clone();
    let oracle: Arc<dyn PriceOracle> = scripts.clone();
    let desk: Arc<dyn HoldingsDesk> = scripts;

    let mut supervisor = Supervisor::new(config.exit_on_second_signal);
    let shutdown = supervisor.shutdown_token();

    let dispatcher = ProvisionDispatcher::new(
        store.clone(),
        position_actions.clone(),
        config.max_concurrent_dispatch,
        Duration::from_millis(config.document_settle_ms),
    );
    let hub = WatchHub::new(
        store.clone(),
        tailer,
        dispatcher,
        Duration::from_millis(config.ledger_settle_ms),
        shutdown.clone(),
    )
    .context("establish filesystem watches")?;
    supervisor.spawn("watcher", hub.run());

    let price = PriceRefresh::new(
        store.clone(),
        oracle,
        position_actions.clone(),
        config.monitor.clone(),
        Duration::from_millis(config.price_item_delay_ms),
        shutdown.clone(),
    );
    supervisor.spawn(
        "price-refresh",
        price.run(MinuteOffsets::new(config.price_offsets.clone())),
    );

    let harvest = RewardHarvest::new(store.clone(), position_actions, shutdown.clone());
    supervisor.spawn(
        "reward-harvest",
        harvest.run(MinuteOffsets::new(config.harvest_offsets.clone())),
    );

    let sweep = SwapSweep::new(
        desk,
        config.blacklist_path.clone(),
        config.swap_fee_ceiling,
        Duration::from_millis(config.swap_item_delay_ms),
        shutdown,
    );
    supervisor.spawn(
        "swap-sweep",
        sweep.run(MinuteOffsets::new(config.sweep_offsets.clone())),
    );

    supervisor.run().await;
    Ok(())
}

/// Installs the process-wide log sink: console plus a timestamped,
/// ANSI-free file in `log_dir`. The guard must stay alive for the process
/// lifetime or buffered lines are lost on shutdown.
fn init_logging(log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("create log directory {}", log_dir.display()))?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    let path = log_dir.join(format!("keeper_{timestamp}.log"));
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("create log file {}", path.display()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console_layer = tracing_subscriber::fmt::layer().with_target(true);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    println!("📝 Logging to: {}", path.display());
    Ok(guard)
}
