//! Error types for store and ledger access.

use std::path::PathBuf;

/// Errors from document store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem access failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The document exists but is not valid JSON of the expected shape.
    #[error("malformed document {path}: {source}")]
    Malformed {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from ledger tailing.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Filesystem access failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// The ledger could not be opened as CSV at all.
    #[error("csv error on {path}: {source}")]
    Csv {
        /// Offending path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },
    /// The ledger has no header row to capture.
    #[error("ledger {path} is empty, no header row")]
    MissingHeaders {
        /// Offending path.
        path: PathBuf,
    },
}
