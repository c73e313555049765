//! Core entities for the DLMM keeper.
//!
//! This crate defines the state-store document shape shared by every
//! component and the explicit price-monitoring state machine. It has no
//! I/O of its own; persistence lives in `dlmm-keeper-data`.

/// Per-pool state-store document.
pub mod document;
/// Price-threshold monitoring state machine.
pub mod monitor;
