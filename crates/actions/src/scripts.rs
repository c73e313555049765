//! Production implementation shelling out to the action scripts.
//!
//! The TypeScript position scripts run through `npx ts-node` from the
//! script directory; holdings listing and swapping are standalone
//! executables. Flags are only appended when the corresponding input is
//! present.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::parse;
use crate::runner::{ActionCommand, ActionError, ScriptRunner};
use crate::traits::{HoldingsDesk, PositionActions, PriceOracle, ProvisionRequest};

/// Locations and names of the external action scripts.
#[derive(Debug, Clone)]
pub struct ScriptsConfig {
    /// Working directory the scripts expect to run from.
    pub work_dir: PathBuf,
    /// Runner program for the TypeScript scripts.
    pub runner_program: String,
    /// Arguments inserted before the script name.
    pub runner_prefix: Vec<String>,
    /// One-time position-opening script.
    pub provision_script: String,
    /// Reward-claiming script.
    pub harvest_script: String,
    /// Liquidity-removal script.
    pub removal_script: String,
    /// Price oracle script.
    pub price_script: String,
    /// Holdings-listing executable, invoked with no arguments.
    pub holdings_program: String,
    /// Swap executable, invoked with token and fee ceiling positionally.
    pub swap_program: String,
    /// Per-swap timeout in seconds.
    pub swap_timeout_secs: u64,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            runner_program: "npx".to_string(),
            runner_prefix: vec!["ts-node".to_string()],
            provision_script: "addLiquidity.ts".to_string(),
            harvest_script: "claimAllRewards.ts".to_string(),
            removal_script: "removeLiquidity.ts".to_string(),
            price_script: "fetchPrice.ts".to_string(),
            holdings_program: "./holdings".to_string(),
            swap_program: "./swap".to_string(),
            swap_timeout_secs: 30,
        }
    }
}

/// Shells out to the configured scripts for every collaborator seam.
pub struct ScriptActions {
    runner: ScriptRunner,
    config: ScriptsConfig,
}

impl ScriptActions {
    /// Creates the script-backed collaborator set.
    pub fn new(config: ScriptsConfig) -> Self {
        Self {
            runner: ScriptRunner::new(config.work_dir.clone()),
            config,
        }
    }

    fn ts_command(&self, script: &str, args: Vec<String>) -> ActionCommand {
        let mut full = self.config.runner_prefix.clone();
        full.push(script.to_string());
        full.extend(args);
        ActionCommand {
            label: script.to_string(),
            program: self.config.runner_program.clone(),
            args: full,
            timeout: None,
        }
    }
}

#[async_trait]
impl PositionActions for ScriptActions {
    async fn provision(&self, request: &ProvisionRequest) -> Result<(), ActionError> {
        let mut args = vec![format!("--pool={}", request.pool)];
        if let Some(token) = &request.token {
            args.push(format!("--token={token}"));
        }
        if let Some(ts) = &request.last_updated_first {
            args.push(format!("--last_updated_first={ts}"));
        }
        self.runner
            .run(&self.ts_command(&self.config.provision_script, args))
            .await
            .map(|_| ())
    }

    async fn harvest(&self, pool: &str) -> Result<(), ActionError> {
        let args = vec![format!("--pool={pool}")];
        self.runner
            .run(&self.ts_command(&self.config.harvest_script, args))
            .await
            .map(|_| ())
    }

    async fn remove(&self, pool: &str, position: &str) -> Result<(), ActionError> {
        let args = vec![format!("--pool={pool}"), format!("--position={position}")];
        self.runner
            .run(&self.ts_command(&self.config.removal_script, args))
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl PriceOracle for ScriptActions {
    async fn fetch_price(&self, pool: &str, token: &str) -> Result<Option<Decimal>, ActionError> {
        let args = vec![format!("--pool={pool}"), format!("--token={token}")];
        let output = self
            .runner
            .run(&self.ts_command(&self.config.price_script, args))
            .await?;
        Ok(parse::parse_price(&output))
    }
}

#[async_trait]
impl HoldingsDesk for ScriptActions {
    async fn list_holdings(&self) -> Result<String, ActionError> {
        let cmd = ActionCommand {
            label: self.config.holdings_program.clone(),
            program: self.config.holdings_program.clone(),
            args: Vec::new(),
            timeout: None,
        };
        self.runner.run(&cmd).await
    }

    async fn swap(&self, token: &str, fee_ceiling: u64) -> Result<(), ActionError> {
        let cmd = ActionCommand {
            label: self.config.swap_program.clone(),
            program: self.config.swap_program.clone(),
            args: vec![token.to_string(), fee_ceiling.to_string()],
            timeout: Some(Duration::from_secs(self.config.swap_timeout_secs)),
        };
        self.runner.run(&cmd).await.map(|_| ())
    }
}
