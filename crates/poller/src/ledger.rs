//! Persisted dedup ledger.
//!
//! A grow-only set of `"<thread_id>|<extension>"` pairs, loaded at cycle
//! start and persisted at cycle end. A pair is recorded only after its page
//! was actually dispatched; failed pages stay out of the ledger so the next
//! cycle retries them. A corrupt or missing ledger file loads as the empty
//! set; resumption is best effort, never fatal.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::error::PollerError;
use crate::thread::ThreadId;

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    seen_pairs: Vec<String>,
}

/// In-memory snapshot of the notified (thread, extension) pairs.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    pairs: HashSet<String>,
}

impl Ledger {
    fn pair_key(thread_id: &ThreadId, extension: &str) -> String {
        format!("{thread_id}|{extension}")
    }

    /// Load the ledger, treating any failure as an empty set.
    pub async fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No ledger file yet, starting empty");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable ledger, starting empty");
                return Self::default();
            }
        };

        match serde_json::from_str::<LedgerFile>(&content) {
            Ok(file) => Self {
                pairs: file.seen_pairs.into_iter().collect(),
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt ledger, starting empty");
                Self::default()
            }
        }
    }

    /// Whether this endpoint was already notified for this thread.
    pub fn contains(&self, thread_id: &ThreadId, extension: &str) -> bool {
        self.pairs.contains(&Self::pair_key(thread_id, extension))
    }

    /// Record a successfully paged pair. Entries are merged, never removed.
    pub fn record(&mut self, thread_id: &ThreadId, extension: &str) {
        self.pairs.insert(Self::pair_key(thread_id, extension));
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The pair set, sorted for stable output.
    pub fn sorted_pairs(&self) -> Vec<&str> {
        let mut pairs: Vec<&str> = self.pairs.iter().map(String::as_str).collect();
        pairs.sort_unstable();
        pairs
    }

    /// Persist the ledger, creating parent directories as needed.
    pub async fn persist(&self, path: &Path) -> Result<(), PollerError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PollerError::Storage {
                    path: parent.display().to_string(),
                    reason: e.to_string(),
                })?;
        }

        let file = LedgerFile {
            seen_pairs: self.sorted_pairs().iter().map(ToString::to_string).collect(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        fs::write(path, content)
            .await
            .map_err(|e| PollerError::Storage {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Ledger::load(&dir.path().join("state.json")).await;
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "][").unwrap();
        assert!(Ledger::load(&path).await.is_empty());
    }

    #[tokio::test]
    async fn test_persist_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/state.json");

        let mut ledger = Ledger::default();
        ledger.record(&ThreadId::from("A1"), "204");
        ledger.record(&ThreadId::from("A1"), "301");
        ledger.record(&ThreadId::from("B7"), "204");
        ledger.persist(&path).await.unwrap();

        let reloaded = Ledger::load(&path).await;
        assert_eq!(reloaded.len(), 3);
        assert!(reloaded.contains(&ThreadId::from("A1"), "204"));
        assert!(reloaded.contains(&ThreadId::from("A1"), "301"));
        assert!(reloaded.contains(&ThreadId::from("B7"), "204"));
        assert!(!reloaded.contains(&ThreadId::from("B7"), "301"));
    }

    #[tokio::test]
    async fn test_persisted_file_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut ledger = Ledger::default();
        ledger.record(&ThreadId::from("Z"), "1");
        ledger.record(&ThreadId::from("A"), "1");
        ledger.persist(&path).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let file: LedgerFile = serde_json::from_str(&content).unwrap();
        assert_eq!(file.seen_pairs, vec!["A|1", "Z|1"]);
    }

    #[test]
    fn test_record_is_idempotent() {
        let mut ledger = Ledger::default();
        ledger.record(&ThreadId::from("A1"), "204");
        ledger.record(&ThreadId::from("A1"), "204");
        assert_eq!(ledger.len(), 1);
    }
}
