//! External-action collaborators for the DLMM keeper.
//!
//! Everything downstream of "invoke the action for this position" is a
//! black-box subprocess: the provisioning, harvest and removal scripts,
//! the price oracle fetch, and the holdings/swap executables. This crate
//! owns the invocation contract (traits), the subprocess runner, and the
//! parsers for the collaborators' textual output. The orchestration core
//! never sees an SDK call, only these seams.

/// Output parsers for collaborator stdout.
pub mod parse;
/// Subprocess runner.
pub mod runner;
/// Production implementation shelling out to the action scripts.
pub mod scripts;
/// Collaborator traits.
pub mod traits;

pub use runner::{ActionCommand, ActionError, ScriptRunner};
pub use scripts::{ScriptActions, ScriptsConfig};
pub use traits::{HoldingsDesk, PositionActions, PriceOracle, ProvisionRequest};
