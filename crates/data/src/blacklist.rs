//! Swap-sweep token blacklist.
//!
//! A flat list of token contract addresses the sweep must never swap.
//! Reloaded fresh on every pass so operators can edit it while the keeper
//! runs. Purely advisory: a missing file is an empty blacklist, not an
//! error.

use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::Path;

use tracing::{debug, warn};

/// Identifier delimiters, ASCII and full-width comma plus line breaks.
const DELIMITERS: [char; 4] = [',', '，', '\n', '\r'];

/// Set of blacklisted token contract addresses.
#[derive(Debug, Default)]
pub struct Blacklist {
    entries: HashSet<String>,
}

impl Blacklist {
    /// Loads the blacklist from `path`.
    ///
    /// Missing file means empty; any other read failure is logged and
    /// degrades to empty as well (the filter is advisory).
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "No blacklist file, treating as empty");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read blacklist, treating as empty");
                return Self::default();
            }
        };

        let entries = raw
            .split(DELIMITERS)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self { entries }
    }

    /// Whether `token` is blacklisted.
    pub fn contains(&self, token: &str) -> bool {
        self.entries.contains(token)
    }

    /// Number of blacklisted identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the blacklist is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_blacklist(content: &str) -> (TempDir, std::path::PathBuf) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("blacklist.txt");
        std::fs::write(&path, content).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let blacklist = Blacklist::load(&tmp.path().join("absent.txt"));
        assert!(blacklist.is_empty());
    }

    #[test]
    fn test_ascii_comma_delimited() {
        let (_tmp, path) = write_blacklist("TOKA,TOKB");
        let blacklist = Blacklist::load(&path);
        assert_eq!(blacklist.len(), 2);
        assert!(blacklist.contains("TOKA"));
        assert!(blacklist.contains("TOKB"));
        assert!(!blacklist.contains("TOKC"));
    }

    #[test]
    fn test_full_width_comma_delimited() {
        let (_tmp, path) = write_blacklist("TOKA，TOKB，TOKC");
        let blacklist = Blacklist::load(&path);
        assert_eq!(blacklist.len(), 3);
        assert!(blacklist.contains("TOKB"));
    }

    #[test]
    fn test_whitespace_and_blank_entries_dropped() {
        let (_tmp, path) = write_blacklist(" TOKA ,\n, TOKB\n");
        let blacklist = Blacklist::load(&path);
        assert_eq!(blacklist.len(), 2);
        assert!(blacklist.contains("TOKA"));
        assert!(blacklist.contains("TOKB"));
    }
}
