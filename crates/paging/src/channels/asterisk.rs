//! Asterisk CLI paging channel.
//!
//! Originates a call leg to the auto-answer feature code for an extension and
//! plays the announcement on it. The announcement is optionally preceded by
//! one-second silence segments so playback starts only after the channel has
//! fully answered and bridged, not during call setup.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::PageError;
use crate::PageChannel;

/// Environment variable for the number of silence segments before playback.
const ENV_PREWAIT_SEC: &str = "NWS_PREWAIT_SEC";

/// Auto-answer feature-code prefix dialed ahead of the extension.
const AUTO_ANSWER_PREFIX: &str = "*80";

/// Dial-plan context the originated leg enters.
const DIAL_CONTEXT: &str = "from-internal";

/// How long one originate invocation may run before it is abandoned.
const ORIGINATE_TIMEOUT_SECS: u64 = 60;

/// Paging channel backed by the `asterisk -rx` control interface.
pub struct AsteriskChannel {
    asterisk_bin: String,
    prewait_secs: u32,
}

impl AsteriskChannel {
    /// Create a channel from environment variables.
    ///
    /// `NWS_PREWAIT_SEC` sets the number of `silence/1` segments prepended to
    /// the play chain (default 2). Unparseable values fall back to the
    /// default with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let prewait_secs = match std::env::var(ENV_PREWAIT_SEC) {
            Ok(v) => v.parse().unwrap_or_else(|_| {
                warn!(value = %v, "Invalid {ENV_PREWAIT_SEC}, using default");
                2
            }),
            Err(_) => 2,
        };

        Self {
            asterisk_bin: "asterisk".to_string(),
            prewait_secs,
        }
    }

    /// Create a channel with explicit settings.
    #[must_use]
    pub fn new(asterisk_bin: impl Into<String>, prewait_secs: u32) -> Self {
        Self {
            asterisk_bin: asterisk_bin.into(),
            prewait_secs,
        }
    }

    /// Build the `&`-joined play chain: prewait silence segments, then the
    /// announcement reference.
    fn play_chain(&self, playback_ref: &str) -> String {
        let mut parts = vec!["silence/1"; self.prewait_secs as usize];
        parts.push(playback_ref);
        parts.join("&")
    }

    /// Build the CLI command handed to `asterisk -rx`.
    fn originate_command(&self, extension: &str, playback_ref: &str) -> String {
        format!(
            "channel originate Local/{AUTO_ANSWER_PREFIX}{extension}@{DIAL_CONTEXT} application Playback {}",
            self.play_chain(playback_ref)
        )
    }
}

#[async_trait]
impl PageChannel for AsteriskChannel {
    fn name(&self) -> &'static str {
        "asterisk"
    }

    fn enabled(&self) -> bool {
        true
    }

    async fn page(&self, extension: &str, playback_ref: &str) -> Result<(), PageError> {
        let cli_command = self.originate_command(extension, playback_ref);
        debug!(extension, command = %cli_command, "Originating page");

        let mut command = Command::new(&self.asterisk_bin);
        command.arg("-rx").arg(&cli_command);

        let output = tokio::time::timeout(Duration::from_secs(ORIGINATE_TIMEOUT_SECS), command.output())
            .await
            .map_err(|_| PageError::Timeout {
                extension: extension.to_string(),
                timeout_secs: ORIGINATE_TIMEOUT_SECS,
            })?
            .map_err(|e| PageError::Spawn {
                command: self.asterisk_bin.clone(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(PageError::Originate {
                extension: extension.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_play_chain_with_prewait() {
        let channel = AsteriskChannel::new("asterisk", 2);
        assert_eq!(
            channel.play_chain("custom/nws_047001_A1"),
            "silence/1&silence/1&custom/nws_047001_A1"
        );
    }

    #[test]
    fn test_play_chain_without_prewait() {
        let channel = AsteriskChannel::new("asterisk", 0);
        assert_eq!(channel.play_chain("custom/nws_047001_A1"), "custom/nws_047001_A1");
    }

    #[test]
    fn test_originate_command() {
        let channel = AsteriskChannel::new("asterisk", 1);
        assert_eq!(
            channel.originate_command("204", "custom/nws_047001_A1"),
            "channel originate Local/*80204@from-internal application Playback silence/1&custom/nws_047001_A1"
        );
    }

    #[tokio::test]
    async fn test_page_spawn_failure() {
        let channel = AsteriskChannel::new("/nonexistent/asterisk-binary", 0);
        let err = channel.page("204", "custom/x").await.unwrap_err();
        assert!(matches!(err, PageError::Spawn { .. }));
    }
}
