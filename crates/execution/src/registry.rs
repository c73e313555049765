//! Dispatch dedup registry.
//!
//! The filesystem can report the same creation event more than once; a
//! path must be dispatched at most once per process run. The registry is
//! the single owner of the "seen paths" set and exposes an atomic
//! insert-if-absent. In-memory only, reset on restart.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Process-lifetime set of already-dispatched document paths.
#[derive(Debug, Default)]
pub struct DispatchRegistry {
    seen: Mutex<HashSet<PathBuf>>,
}

impl DispatchRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically claims `path` for dispatch.
    ///
    /// Returns `true` exactly once per path; later callers get `false`.
    pub fn try_claim(&self, path: &Path) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_path_buf())
    }

    /// Number of claimed paths.
    pub fn len(&self) -> usize {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been claimed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
