//! Per-cycle orchestration.
//!
//! One call to [`run_cycle`] is one complete poll: load subscriptions and
//! ledger, fetch alerts, resolve each record to its thread, select the
//! endpoints still owed a page, ensure one cached announcement per distinct
//! code, page, record successful pairs, persist the ledger, sweep. The ledger
//! is an explicit value threaded through the cycle, loaded at the start and
//! persisted once at the end.

use std::collections::{BTreeMap, BTreeSet};

use paging::Pager;
use tracing::{error, info, warn};

use crate::audio::{AudioCache, PlaybackRef};
use crate::config::PollerConfig;
use crate::error::PollerError;
use crate::feed::FeedClient;
use crate::ledger::Ledger;
use crate::{matcher, subs, sweep, thread};

/// Collaborators injected into a cycle.
pub struct CycleDeps {
    pub feed: FeedClient,
    pub cache: AudioCache,
    pub pager: Pager,
}

impl CycleDeps {
    /// Production wiring: live feed, pico2wave/sox cache, Asterisk pager.
    pub fn from_config(config: &PollerConfig) -> Self {
        Self {
            feed: FeedClient::with_defaults(),
            cache: AudioCache::with_default_backends(&config.sounds_dir),
            pager: Pager::from_env(),
        }
    }
}

/// Outcome of one poll cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    /// Alert records received from the feed
    pub alerts: usize,
    /// Pages dispatched and recorded in the ledger
    pub pages_sent: usize,
    /// Pages that failed dispatch and will retry next cycle
    pub pages_failed: usize,
    /// (code, thread) announcements that failed to synthesize
    pub synth_failures: usize,
    /// Expired artifacts removed by the sweep
    pub swept: usize,
    /// Typed per-pair failures encountered this cycle
    pub failures: Vec<PollerError>,
}

/// Run one poll cycle to completion. Never fails: every error degrades to a
/// skipped record, pair, or artifact and is reflected in the report.
pub async fn run_cycle(config: &PollerConfig, deps: &CycleDeps) -> CycleReport {
    let mut report = CycleReport::default();

    let endpoints = subs::load(&config.subs_file).await;
    let mut ledger = Ledger::load(&config.state_file).await;

    let alerts = match deps.feed.fetch_active().await {
        Ok(alerts) => alerts,
        Err(e) => {
            warn!(error = %e, "Feed fetch failed, treating as zero alerts this cycle");
            vec![]
        }
    };
    report.alerts = alerts.len();

    for record in &alerts {
        let thread_id = thread::resolve(record);

        // Matching consults the live ledger, so a thread appearing twice in
        // one feed response still pages each extension at most once.
        let targets = matcher::select_targets(&record.same_codes, &thread_id, &endpoints, &ledger);
        if targets.is_empty() {
            continue;
        }

        let text = record.announcement_text();

        // One artifact per distinct selected code; endpoints sharing a code
        // share the artifact.
        let mut playbacks: BTreeMap<String, PlaybackRef> = BTreeMap::new();
        let distinct_codes: BTreeSet<&String> = targets.values().collect();
        for code in distinct_codes {
            match deps.cache.ensure(&text, code, &thread_id).await {
                Ok(playback) => {
                    playbacks.insert(code.clone(), playback);
                }
                Err(e) => {
                    warn!(error = %e, "Announcement unavailable, its endpoints retry next cycle");
                    report.synth_failures += 1;
                    report.failures.push(e);
                }
            }
        }

        for (extension, code) in &targets {
            let Some(playback) = playbacks.get(code) else {
                continue;
            };
            match deps.pager.page(extension, playback.as_str()).await {
                Ok(()) => {
                    ledger.record(&thread_id, extension);
                    report.pages_sent += 1;
                }
                Err(e) => {
                    // Already logged by the pager; the pair stays out of the
                    // ledger and retries next cycle
                    report.pages_failed += 1;
                    report.failures.push(PollerError::Dispatch {
                        extension: extension.clone(),
                        thread: thread_id.to_string(),
                        source: e,
                    });
                }
            }
        }
    }

    if let Err(e) = ledger.persist(&config.state_file).await {
        error!(error = %e, "Failed to persist dedup ledger");
    }

    let swept = sweep::sweep(&config.sounds_dir, config.cache_ttl).await;
    report.swept = swept.removed;

    info!(
        alerts = report.alerts,
        pages_sent = report.pages_sent,
        pages_failed = report.pages_failed,
        synth_failures = report.synth_failures,
        swept = report.swept,
        ledger_pairs = ledger.len(),
        "Poll cycle complete"
    );

    report
}
