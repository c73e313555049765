//! Price-threshold monitoring state machine.
//!
//! A pool enters `Monitoring` when its fetched price drops to a fraction
//! of the ledger's reference close, and exits either by recovering to a
//! target price or by timing out. The transition function is pure so the
//! rules stay auditable in isolation; persistence of the state is the
//! caller's concern.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Thresholds for entering and leaving the monitoring state.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Enter monitoring when `price <= reference * entry_ratio`.
    pub entry_ratio: Decimal,
    /// Recovery target as `reference * recovery_ratio`.
    pub recovery_ratio: Decimal,
    /// Seconds in `Monitoring` before the drawdown counts as permanent.
    pub timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            entry_ratio: Decimal::new(70, 2),    // 0.70
            recovery_ratio: Decimal::new(90, 2), // 0.90
            timeout_secs: 1800,                  // 30 minutes
        }
    }
}

/// Per-pool monitoring state, persisted in the pool document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum MonitorState {
    /// Price is healthy; nothing to watch.
    Idle,
    /// Watching for recovery since `since`, until `target` is reached.
    Monitoring {
        /// When the drawdown was first observed.
        since: DateTime<Utc>,
        /// Price at which the pool counts as recovered.
        target: Decimal,
    },
}

/// Outcome of one evaluation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorTransition {
    /// No state change.
    Hold,
    /// Drawdown detected; monitoring started.
    Entered {
        /// Recovery target derived from the reference close.
        target: Decimal,
    },
    /// Price came back to the target; flag cleared, position kept.
    Recovered,
    /// Timeout elapsed without recovery; the position should be removed.
    TimedOut,
}

impl MonitorState {
    /// Advances the state machine one step.
    ///
    /// Returns the next state together with the transition taken. A
    /// non-positive `reference` never enters monitoring.
    pub fn evaluate(
        &self,
        price: Decimal,
        reference: Decimal,
        config: &MonitorConfig,
        now: DateTime<Utc>,
    ) -> (MonitorState, MonitorTransition) {
        match self {
            MonitorState::Idle => {
                if reference > Decimal::ZERO && price <= reference * config.entry_ratio {
                    let target = reference * config.recovery_ratio;
                    (
                        MonitorState::Monitoring { since: now, target },
                        MonitorTransition::Entered { target },
                    )
                } else {
                    (MonitorState::Idle, MonitorTransition::Hold)
                }
            }
            MonitorState::Monitoring { since, target } => {
                if price >= *target {
                    (MonitorState::Idle, MonitorTransition::Recovered)
                } else if (now - *since).num_seconds() >= config.timeout_secs as i64 {
                    (MonitorState::Idle, MonitorTransition::TimedOut)
                } else {
                    (self.clone(), MonitorTransition::Hold)
                }
            }
        }
    }
}
