//! Append-only ledger tailing.
//!
//! The ledger is an external CSV that only ever grows. The first record is
//! the column header list, captured once at startup and assumed stable for
//! the process lifetime. Resumption is by total line count, not a
//! per-record cursor: each appended line is scanned at least once, and
//! redundant rescans are harmless because document writes are idempotent
//! replacements.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::Utc;
use dlmm_keeper_domain::document::PoolDocument;
use tracing::{info, warn};

use crate::error::LedgerError;
use crate::store::DocumentStore;

/// Tails the opportunity ledger and materializes new rows as documents.
#[derive(Debug)]
pub struct LedgerTailer {
    path: PathBuf,
    headers: Vec<String>,
    line_count: usize,
}

impl LedgerTailer {
    /// Opens the ledger, capturing headers and the current line count.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or has no header row —
    /// fatal at startup, the keeper cannot operate without its ledger.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let headers = read_headers(&path)?;
        let line_count = count_lines(&path)?;
        Ok(Self {
            path,
            headers,
            line_count,
        })
    }

    /// The ledger file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Column headers captured at startup.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Current high-water mark in lines.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Scans lines appended since the last call and writes one document
    /// per new record into `store`.
    ///
    /// Malformed records and failed writes are logged and skipped; the
    /// scan continues and the high-water mark still advances to the new
    /// total at the end of the batch. Returns the number of documents
    /// written.
    ///
    /// # Errors
    /// Returns an error only if the ledger itself cannot be re-read.
    pub fn drain_new(&mut self, store: &DocumentStore) -> Result<usize, LedgerError> {
        let new_count = count_lines(&self.path)?;
        if new_count <= self.line_count {
            return Ok(0);
        }
        info!(
            appended = new_count - self.line_count,
            total = new_count,
            "Detected appended ledger rows"
        );

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|source| LedgerError::Csv {
                path: self.path.clone(),
                source,
            })?;

        let mut created = 0;
        let mut line_num = 0usize;
        for result in reader.records() {
            line_num += 1;
            if line_num <= self.line_count {
                continue;
            }
            let record = match result {
                Ok(record) => record,
                Err(e) => {
                    warn!(line = line_num, error = %e, "Skipping malformed ledger record");
                    continue;
                }
            };
            if record.is_empty() {
                continue;
            }

            let fields: Vec<String> = record.iter().map(str::to_string).collect();
            let doc = PoolDocument::from_row(&self.headers, &fields);
            // Rows without an identifier are still persisted, never dropped.
            let stem = if doc.pool_address.is_empty() {
                format!("row_{}_{}", Utc::now().timestamp(), line_num)
            } else {
                doc.pool_address.clone()
            };

            match store.save_named(&stem, &doc) {
                Ok(path) => {
                    info!(pool = %stem, path = %path.display(), "Ledger row saved");
                    created += 1;
                }
                Err(e) => {
                    warn!(line = line_num, pool = %stem, error = %e, "Failed to persist ledger row");
                }
            }
        }

        self.line_count = new_count;
        Ok(created)
    }
}

fn read_headers(path: &Path) -> Result<Vec<String>, LedgerError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|source| LedgerError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut records = reader.records();
    match records.next() {
        Some(Ok(record)) => Ok(record.iter().map(str::to_string).collect()),
        Some(Err(source)) => Err(LedgerError::Csv {
            path: path.to_path_buf(),
            source,
        }),
        None => Err(LedgerError::MissingHeaders {
            path: path.to_path_buf(),
        }),
    }
}

fn count_lines(path: &Path) -> Result<usize, LedgerError> {
    let file = File::open(path).map_err(|source| LedgerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut count = 0;
    for line in BufReader::new(file).lines() {
        line.map_err(|source| LedgerError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::TempDir;

    fn setup(initial: &str) -> (TempDir, PathBuf, DocumentStore) {
        let tmp = TempDir::new().unwrap();
        let ledger = tmp.path().join("auto_profit.csv");
        std::fs::write(&ledger, initial).unwrap();
        let store = DocumentStore::open(tmp.path().join("data")).unwrap();
        (tmp, ledger, store)
    }

    fn append(path: &Path, lines: &str) {
        let mut file = OpenOptions::new().append(true).open(path).unwrap();
        file.write_all(lines.as_bytes()).unwrap();
    }

    #[test]
    fn test_open_captures_headers_and_line_count() {
        let (_tmp, ledger, _store) = setup("poolAddress,ca,c\nP1,T1,1.0\n");
        let tailer = LedgerTailer::open(&ledger).unwrap();
        assert_eq!(tailer.headers(), ["poolAddress", "ca", "c"]);
        assert_eq!(tailer.line_count(), 2);
    }

    #[test]
    fn test_open_fails_on_empty_ledger() {
        let (_tmp, ledger, _store) = setup("");
        assert!(matches!(
            LedgerTailer::open(&ledger),
            Err(LedgerError::MissingHeaders { .. })
        ));
    }

    #[test]
    fn test_drain_materializes_each_new_row() {
        let (_tmp, ledger, store) = setup("poolAddress,ca,last_updated_first\n");
        let mut tailer = LedgerTailer::open(&ledger).unwrap();

        append(
            &ledger,
            "ABC123,TOK987,2025-09-11 05:02:00\nDEF456,TOK111,2025-09-11 05:03:00\n",
        );
        assert_eq!(tailer.drain_new(&store).unwrap(), 2);

        let doc = store.load("ABC123").unwrap();
        assert_eq!(doc.token_contract(), Some("TOK987"));
        assert_eq!(doc.last_updated_first(), Some("2025-09-11 05:02:00"));
        assert_eq!(
            doc.data.get("ca").and_then(serde_json::Value::as_str),
            Some("TOK987")
        );
        assert!(store.load("DEF456").is_ok());
    }

    #[test]
    fn test_drain_is_incremental() {
        let (_tmp, ledger, store) = setup("poolAddress,ca\nOLD,T0\n");
        let mut tailer = LedgerTailer::open(&ledger).unwrap();

        // Nothing appended yet.
        assert_eq!(tailer.drain_new(&store).unwrap(), 0);
        assert!(store.load("OLD").is_err());

        append(&ledger, "NEW,T1\n");
        assert_eq!(tailer.drain_new(&store).unwrap(), 1);
        assert!(store.load("NEW").is_ok());
        // The pre-existing row was never re-materialized.
        assert!(store.load("OLD").is_err());
    }

    #[test]
    fn test_row_without_identifier_gets_synthesized_name() {
        let (_tmp, ledger, store) = setup("poolAddress,ca\n");
        let mut tailer = LedgerTailer::open(&ledger).unwrap();

        append(&ledger, ",TOKX\n");
        assert_eq!(tailer.drain_new(&store).unwrap(), 1);

        let docs = store.load_all();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].0.starts_with("row_"));
        assert_eq!(docs[0].1.token_contract(), Some("TOKX"));
    }

    #[test]
    fn test_malformed_row_is_skipped_without_aborting_batch() {
        let (_tmp, ledger, store) = setup("poolAddress,ca\n");
        let mut tailer = LedgerTailer::open(&ledger).unwrap();

        // Invalid UTF-8 makes the middle record unreadable as a string row.
        let mut file = OpenOptions::new().append(true).open(&ledger).unwrap();
        file.write_all(b"GOODA,T1\nBAD,\xff\xfe\nGOODB,T3\n").unwrap();

        assert_eq!(tailer.drain_new(&store).unwrap(), 2);
        assert!(store.load("GOODA").is_ok());
        assert!(store.load("GOODB").is_ok());
        assert!(store.load("BAD").is_err());
        assert_eq!(tailer.line_count(), 4);
    }

    #[test]
    fn test_ragged_rows_are_tolerated() {
        let (_tmp, ledger, store) = setup("poolAddress,ca,c\n");
        let mut tailer = LedgerTailer::open(&ledger).unwrap();

        append(&ledger, "SHORT,T1\nLONG,T2,9.9,surplus\n");
        assert_eq!(tailer.drain_new(&store).unwrap(), 2);

        assert_eq!(store.load("SHORT").unwrap().field("c"), None);
        let long = store.load("LONG").unwrap();
        assert_eq!(long.record.len(), 4);
    }
}
