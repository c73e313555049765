//! File-based persistence for the DLMM keeper.
//!
//! The state store is a directory of per-pool JSON documents; the ledger
//! is an external append-only CSV tailed by line count. Nothing here keeps
//! an in-memory source of truth: every scheduler pass re-reads from disk so
//! a crash never loses more than the pass in flight.

/// Swap-sweep token blacklist.
pub mod blacklist;
/// Error types for store and ledger access.
pub mod error;
/// Append-only ledger tailing.
pub mod ledger;
/// Document store over a directory of JSON files.
pub mod store;

pub use blacklist::Blacklist;
pub use error::{LedgerError, StoreError};
pub use ledger::LedgerTailer;
pub use store::DocumentStore;
