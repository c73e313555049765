//! Document store over a directory of JSON files.

use std::fs;
use std::path::{Path, PathBuf};

use dlmm_keeper_domain::document::PoolDocument;
use dlmm_keeper_domain::monitor::MonitorState;
use tracing::warn;

use crate::error::StoreError;

/// Extension of state-store documents.
pub const DOCUMENT_EXT: &str = "json";

/// Repository over the state-store directory.
///
/// Documents are small, written whole, and replaced last-write-wins.
/// Concurrent writers are expected to only add fields they own; the store
/// itself takes no locks. Enumerations re-read from disk every call by
/// design — see the crate docs.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    /// Opens the store, creating the directory if needed.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created — callers treat
    /// this as fatal at startup.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    /// The store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for `stem` (a pool address or synthesized name).
    pub fn document_path(&self, stem: &str) -> PathBuf {
        self.dir.join(format!("{stem}.{DOCUMENT_EXT}"))
    }

    /// Loads the document stored under `stem`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(&self, stem: &str) -> Result<PoolDocument, StoreError> {
        self.load_path(&self.document_path(stem))
    }

    /// Loads a document from an explicit path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_path(&self, path: &Path) -> Result<PoolDocument, StoreError> {
        let bytes = fs::read(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes `doc` under `stem`, replacing any previous content.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save_named(&self, stem: &str, doc: &PoolDocument) -> Result<PathBuf, StoreError> {
        let path = self.document_path(stem);
        let bytes = serde_json::to_vec_pretty(doc).map_err(|source| StoreError::Malformed {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, bytes).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }

    /// Writes `doc` under its own pool address.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, doc: &PoolDocument) -> Result<PathBuf, StoreError> {
        self.save_named(&doc.pool_address, doc)
    }

    /// Enumerates every document, keyed by file stem.
    ///
    /// Unreadable or malformed documents are logged and skipped — the next
    /// pass retries them naturally. Results are sorted by stem so passes
    /// process pools in a stable order.
    pub fn load_all(&self) -> Vec<(String, PoolDocument)> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "Failed to read store directory");
                return Vec::new();
            }
        };

        let mut docs = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() || path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match self.load_path(&path) {
                Ok(doc) => docs.push((stem.to_string(), doc)),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable document"),
            }
        }
        docs.sort_by(|a, b| a.0.cmp(&b.0));
        docs
    }

    /// Documents with a populated `positionAddress`.
    pub fn provisioned(&self) -> Vec<(String, PoolDocument)> {
        self.load_all()
            .into_iter()
            .filter(|(_, doc)| doc.is_provisioned())
            .collect()
    }

    /// Documents with a resolvable token contract address.
    pub fn with_token(&self) -> Vec<(String, PoolDocument)> {
        self.load_all()
            .into_iter()
            .filter(|(_, doc)| doc.token_contract().is_some())
            .collect()
    }

    /// Rewrites the monitoring flag of the document under `stem`.
    ///
    /// Read-modify-write of the whole document; every other field is
    /// preserved untouched.
    ///
    /// # Errors
    /// Returns an error if the document cannot be read or rewritten.
    pub fn update_monitor(&self, stem: &str, state: MonitorState) -> Result<(), StoreError> {
        let mut doc = self.load(stem)?;
        doc.monitor = Some(state);
        self.save_named(stem, &doc)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use serde_json::Value;
    use tempfile::TempDir;

    fn store() -> (TempDir, DocumentStore) {
        let tmp = TempDir::new().unwrap();
        let store = DocumentStore::open(tmp.path().join("data")).unwrap();
        (tmp, store)
    }

    fn doc_for(pool: &str) -> PoolDocument {
        let headers = vec!["poolAddress".to_string(), "ca".to_string()];
        let record = vec![pool.to_string(), "TOK".to_string()];
        PoolDocument::from_row(&headers, &record)
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let (_tmp, store) = store();
        let doc = doc_for("POOL1");
        store.save(&doc).unwrap();

        let loaded = store.load("POOL1").unwrap();
        assert_eq!(loaded.pool_address, "POOL1");
        assert_eq!(loaded.token_contract(), Some("TOK"));
    }

    #[test]
    fn test_load_all_skips_malformed() {
        let (_tmp, store) = store();
        store.save(&doc_for("GOOD")).unwrap();
        fs::write(store.document_path("BAD"), b"{ not json").unwrap();
        fs::write(store.dir().join("ignored.txt"), b"whatever").unwrap();

        let docs = store.load_all();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, "GOOD");
    }

    #[test]
    fn test_provisioned_filters_on_position_address() {
        let (_tmp, store) = store();
        store.save(&doc_for("PLAIN")).unwrap();

        let mut provisioned = doc_for("READY");
        provisioned.extra.insert(
            "positionAddress".to_string(),
            Value::String("POS1".to_string()),
        );
        store.save(&provisioned).unwrap();

        let docs = store.provisioned();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].0, "READY");
    }

    #[test]
    fn test_update_monitor_preserves_foreign_fields() {
        let (_tmp, store) = store();
        let mut doc = doc_for("POOL1");
        doc.extra.insert(
            "positionAddress".to_string(),
            Value::String("POS1".to_string()),
        );
        store.save(&doc).unwrap();

        store
            .update_monitor(
                "POOL1",
                MonitorState::Monitoring {
                    since: Utc::now(),
                    target: Decimal::ONE,
                },
            )
            .unwrap();

        let loaded = store.load("POOL1").unwrap();
        assert_eq!(loaded.position_address(), Some("POS1"));
        assert!(matches!(
            loaded.monitor_state(),
            MonitorState::Monitoring { .. }
        ));
    }

    #[test]
    fn test_load_missing_document_is_an_error() {
        let (_tmp, store) = store();
        assert!(matches!(
            store.load("NOPE"),
            Err(StoreError::Io { .. })
        ));
    }
}
