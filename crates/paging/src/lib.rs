//! Fire-and-forget paging dispatcher for alert announcements.
//!
//! This crate triggers a paging call (auto-answer, then play an announcement)
//! to a telephony extension. Dispatch is fire-and-forget: nothing waits for
//! the call to complete, and a failed dispatch is surfaced to the caller as a
//! non-fatal error so it can decide whether to retry on a later cycle.
//!
//! # Usage
//!
//! ```no_run
//! use paging::Pager;
//!
//! # async fn example() {
//! // Create pager from environment variables
//! let pager = Pager::from_env();
//!
//! // Trigger a page; the Err is non-fatal and retryable
//! if let Err(e) = pager.page("204", "custom/nws_047001_A1").await {
//!     eprintln!("page failed: {e}");
//! }
//! # }
//! ```
//!
//! # Configuration
//!
//! - `NWS_PREWAIT_SEC`: seconds of silence prepended before the announcement
//!   so playback starts only after the channel is bridged (default 2)
//! - `PAGING_DISABLED`: set to "true" to suppress all pages
//!
//! # Architecture
//!
//! The dispatcher uses a trait-based channel design:
//!
//! - [`PageChannel`] trait defines the interface for paging channels
//! - [`AsteriskChannel`] implements paging via the Asterisk CLI
//! - [`Pager`] fronts the configured channel and logs dispatch outcomes

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;

pub use channels::asterisk::AsteriskChannel;
pub use channels::PageChannel;
pub use error::PageError;

use std::sync::Arc;
use tracing::{debug, info, warn};

/// Environment variable to disable all paging.
const ENV_PAGING_DISABLED: &str = "PAGING_DISABLED";

/// Central paging dispatcher.
///
/// The `Pager` fronts a single paging channel. Unlike a broadcast notifier it
/// returns the dispatch outcome, because callers gate their own dedup state
/// on whether the page was actually triggered.
pub struct Pager {
    channel: Option<Arc<dyn PageChannel>>,
    disabled: bool,
}

impl Pager {
    /// Create a new pager from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let disabled = std::env::var(ENV_PAGING_DISABLED)
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        if disabled {
            info!("Paging disabled via PAGING_DISABLED");
            return Self {
                channel: None,
                disabled: true,
            };
        }

        Self {
            channel: Some(Arc::new(AsteriskChannel::from_env())),
            disabled: false,
        }
    }

    /// Create a pager with a specific channel.
    #[must_use]
    pub fn with_channel(channel: Arc<dyn PageChannel>) -> Self {
        Self {
            channel: Some(channel),
            disabled: false,
        }
    }

    /// Create a disabled pager (for testing or when paging is off).
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            channel: None,
            disabled: true,
        }
    }

    /// Check if a paging channel is enabled.
    #[must_use]
    pub fn has_channel(&self) -> bool {
        !self.disabled && self.channel.is_some()
    }

    /// Trigger a page to `extension` playing `playback_ref`.
    ///
    /// When paging is disabled the page is dropped and reported as success,
    /// so a disabled run behaves like a dry run rather than queueing retries.
    ///
    /// # Errors
    /// Returns the channel's error when dispatch fails; the caller should
    /// leave its dedup state untouched so the pair retries next cycle.
    pub async fn page(&self, extension: &str, playback_ref: &str) -> Result<(), PageError> {
        if self.disabled {
            debug!(extension, "Paging disabled, dropping page");
            return Ok(());
        }

        let Some(channel) = &self.channel else {
            return Err(PageError::NotConfigured("no paging channel".to_string()));
        };

        if !channel.enabled() {
            debug!(channel = channel.name(), extension, "Channel disabled, skipping page");
            return Ok(());
        }

        match channel.page(extension, playback_ref).await {
            Ok(()) => {
                info!(
                    channel = channel.name(),
                    extension,
                    playback = playback_ref,
                    "Page dispatched"
                );
                Ok(())
            }
            Err(e) => {
                warn!(
                    channel = channel.name(),
                    extension,
                    error = %e,
                    "Page dispatch failed"
                );
                Err(e)
            }
        }
    }
}

impl Default for Pager {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingChannel {
        pages: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    #[async_trait]
    impl PageChannel for RecordingChannel {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn enabled(&self) -> bool {
            true
        }

        async fn page(&self, extension: &str, playback_ref: &str) -> Result<(), PageError> {
            if self.fail {
                return Err(PageError::Originate {
                    extension: extension.to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "no such channel".to_string(),
                });
            }
            self.pages
                .lock()
                .unwrap()
                .push((extension.to_string(), playback_ref.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_disabled_pager_drops_pages() {
        let pager = Pager::disabled();
        assert!(!pager.has_channel());
        assert!(pager.page("204", "custom/x").await.is_ok());
    }

    #[tokio::test]
    async fn test_page_records_dispatch() {
        let channel = Arc::new(RecordingChannel {
            pages: Mutex::new(vec![]),
            fail: false,
        });
        let pager = Pager::with_channel(Arc::clone(&channel) as Arc<dyn PageChannel>);

        pager.page("204", "custom/nws_047001_A1").await.unwrap();

        let pages = channel.pages.lock().unwrap();
        assert_eq!(
            *pages,
            vec![("204".to_string(), "custom/nws_047001_A1".to_string())]
        );
    }

    #[tokio::test]
    async fn test_page_failure_propagates() {
        let channel = Arc::new(RecordingChannel {
            pages: Mutex::new(vec![]),
            fail: true,
        });
        let pager = Pager::with_channel(channel);

        let err = pager.page("204", "custom/x").await.unwrap_err();
        assert!(matches!(err, PageError::Originate { .. }));
    }
}
