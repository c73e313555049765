//! Collaborator traits.
//!
//! The orchestration core only ever talks to these seams; the production
//! implementation is [`crate::scripts::ScriptActions`], tests substitute
//! hand-rolled mocks.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::runner::ActionError;

/// Inputs for the one-time provisioning action.
///
/// Optional fields that are absent must not be passed through to the
/// collaborator at all.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    /// Pool identifier (required).
    pub pool: String,
    /// Token contract address, when the ledger row carried one.
    pub token: Option<String>,
    /// Reference timestamp string, when the ledger row carried one.
    pub last_updated_first: Option<String>,
}

/// Position lifecycle actions: open, harvest, remove.
#[async_trait]
pub trait PositionActions: Send + Sync {
    /// Opens a position for a newly discovered pool.
    async fn provision(&self, request: &ProvisionRequest) -> Result<(), ActionError>;

    /// Claims accumulated rewards. Absence of rewards is a success.
    async fn harvest(&self, pool: &str) -> Result<(), ActionError>;

    /// Removes liquidity and closes the position.
    async fn remove(&self, pool: &str, position: &str) -> Result<(), ActionError>;
}

/// Price oracle collaborator.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Fetches the current price for a pool's token.
    ///
    /// `Ok(None)` means the collaborator ran but produced no parsable
    /// price — a per-item failure, not an invocation error.
    async fn fetch_price(&self, pool: &str, token: &str) -> Result<Option<Decimal>, ActionError>;
}

/// Wallet holdings listing and token swapping.
#[async_trait]
pub trait HoldingsDesk: Send + Sync {
    /// Lists current holdings; returns the collaborator's raw textual
    /// output for the core to parse.
    async fn list_holdings(&self) -> Result<String, ActionError>;

    /// Swaps one held token back to the base asset, best effort.
    async fn swap(&self, token: &str, fee_ceiling: u64) -> Result<(), ActionError>;
}
