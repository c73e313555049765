//! The per-pool state-store document.
//!
//! One JSON document per tracked pool, named `<poolAddress>.json`. Created
//! from a ledger row (or dropped in manually), enriched by the external
//! provisioning action (which adds `positionAddress`), and re-read from
//! disk by every scheduler pass — the filesystem is the durable source of
//! truth.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::monitor::MonitorState;
use rust_decimal::Decimal;

/// A tracked pool's accumulated state.
///
/// `headers` and `record` preserve the raw ledger row; `data` is the
/// positional header-to-value map. Fields written later by external
/// actions (for example `positionAddress`) may land at the top level or
/// inside `data`; accessors check both, top level winning. Unknown
/// top-level fields round-trip through `extra` untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PoolDocument {
    /// Stable identity, also the document's file stem.
    #[serde(rename = "poolAddress", default)]
    pub pool_address: String,
    /// Ledger column headers as captured at process startup.
    #[serde(default)]
    pub headers: Vec<String>,
    /// Raw ledger record, positionally aligned with `headers`.
    #[serde(default)]
    pub record: Vec<String>,
    /// Header-to-value map, raw strings only.
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Keeper-owned price-monitoring flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor: Option<MonitorState>,
    /// Any other top-level fields, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PoolDocument {
    /// Builds a document from a ledger row.
    ///
    /// Headers and fields are zipped positionally; ragged rows are
    /// tolerated (extra headers map to nothing, extra fields survive in
    /// `record`). Values stay raw strings, no coercion.
    pub fn from_row(headers: &[String], record: &[String]) -> Self {
        let mut data = Map::new();
        for (i, value) in record.iter().enumerate() {
            if let Some(header) = headers.get(i) {
                data.insert(header.clone(), Value::String(value.clone()));
            }
        }

        let pool_address = data
            .get("poolAddress")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            pool_address,
            headers: headers.to_vec(),
            record: record.to_vec(),
            data,
            monitor: None,
            extra: Map::new(),
        }
    }

    /// Resolves a named field, top level first, then `data`.
    ///
    /// Empty strings count as absent.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.extra
            .get(name)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.data
                    .get(name)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
            })
    }

    /// On-chain position address, set once the pool is provisioned.
    pub fn position_address(&self) -> Option<&str> {
        self.field("positionAddress")
    }

    /// Token contract address (the ledger's `ca` column).
    pub fn token_contract(&self) -> Option<&str> {
        self.field("ca")
    }

    /// Human-readable pool name, if any.
    pub fn pool_name(&self) -> Option<&str> {
        self.field("poolName")
    }

    /// Externally supplied reference timestamp string.
    pub fn last_updated_first(&self) -> Option<&str> {
        self.field("last_updated_first")
    }

    /// Reference price (the ledger's `c` column) for threshold math.
    ///
    /// `None` when the field is missing or not a parsable decimal.
    pub fn reference_close(&self) -> Option<Decimal> {
        self.field("c").and_then(|raw| raw.trim().parse().ok())
    }

    /// Whether the pool is actionable for harvesting and removal.
    pub fn is_provisioned(&self) -> bool {
        self.position_address().is_some()
    }

    /// Current monitoring state, `Idle` when the flag was never written.
    pub fn monitor_state(&self) -> MonitorState {
        self.monitor.clone().unwrap_or(MonitorState::Idle)
    }
}
