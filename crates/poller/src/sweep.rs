//! Artifact retention sweep.
//!
//! Removes cached announcement files once their last modification is older
//! than the retention TTL. Runs once per cycle after dispatch, independent of
//! how the rest of the cycle went. Every error here is logged and skipped.

use std::path::Path;
use std::time::{Duration, SystemTime};

use tokio::fs;
use tracing::{debug, warn};

use crate::audio::CACHE_PREFIX;

/// Outcome counters for one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Artifacts deleted
    pub removed: usize,
    /// Deletions or stats that failed and were skipped
    pub failed: usize,
}

/// Delete cached artifacts (and abandoned temp files) older than `ttl`.
pub async fn sweep(sounds_dir: &Path, ttl: Duration) -> SweepReport {
    let mut report = SweepReport::default();

    let mut entries = match fs::read_dir(sounds_dir).await {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %sounds_dir.display(), error = %e, "No artifact directory to sweep");
            return report;
        }
    };

    let now = SystemTime::now();

    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!(dir = %sounds_dir.display(), error = %e, "Failed to read sweep entry");
                report.failed += 1;
                break;
            }
        };

        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_cache_file(name) {
            continue;
        }

        let modified = match entry.metadata().await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                warn!(file = name, error = %e, "Failed to stat artifact, skipping");
                report.failed += 1;
                continue;
            }
        };

        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age <= ttl {
            continue;
        }

        match fs::remove_file(entry.path()).await {
            Ok(()) => {
                debug!(file = name, age_secs = age.as_secs(), "Swept expired artifact");
                report.removed += 1;
            }
            Err(e) => {
                warn!(file = name, error = %e, "Failed to sweep artifact, skipping");
                report.failed += 1;
            }
        }
    }

    report
}

/// Cache artifacts, plus temp files a killed cycle may have abandoned.
fn is_cache_file(name: &str) -> bool {
    let base = name.strip_prefix('.').unwrap_or(name);
    base.starts_with(CACHE_PREFIX) && (name.ends_with(".wav16") || name.ends_with(".wav"))
}
