//! Runtime configuration for the poller.

use std::path::PathBuf;
use std::time::Duration;

/// Default location of the subscription store.
pub const DEFAULT_SUBS_FILE: &str = "/etc/asterisk/nws_subscriptions.json";

/// Default location of the dedup ledger.
pub const DEFAULT_STATE_FILE: &str = "/var/lib/asterisk/nws_alert_state.json";

/// Default directory for cached announcement audio.
pub const DEFAULT_SOUNDS_DIR: &str = "/var/lib/asterisk/sounds/custom";

/// Default retention for cached announcement audio (~2 days).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(2 * 24 * 3600);

/// Paths and retention knobs for one poll cycle.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Subscription store (read-only, owned by the subscription menu)
    pub subs_file: PathBuf,
    /// Dedup ledger file
    pub state_file: PathBuf,
    /// Directory holding cached announcement artifacts
    pub sounds_dir: PathBuf,
    /// Age past which cached artifacts are swept
    pub cache_ttl: Duration,
}

impl PollerConfig {
    /// Path of the single-instance lock file, kept next to the ledger.
    pub fn lock_file(&self) -> PathBuf {
        self.state_file.with_extension("lock")
    }
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            subs_file: PathBuf::from(DEFAULT_SUBS_FILE),
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            sounds_dir: PathBuf::from(DEFAULT_SOUNDS_DIR),
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}
