//! Announcement audio cache.
//!
//! Maps (SAME code, thread id) to a synthesized, telephony-ready artifact
//! under the sounds directory. The first request for a key synthesizes and
//! encodes the announcement; every later request for the same key, from any
//! endpoint on any cycle, returns the cached artifact without touching the
//! synthesis backend. Artifacts are immutable until the retention sweep
//! removes them.

pub mod encode;
pub mod synth;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sha1::{Digest, Sha1};
use thiserror::Error;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::PollerError;
use crate::thread::ThreadId;

pub use encode::{Encoder, SoxEncoder};
pub use synth::{PicoTts, Synthesizer};

/// Filename prefix for every cached artifact.
pub const CACHE_PREFIX: &str = "nws_";

/// Extension Asterisk playback resolves for 16 kHz signed-linear audio.
const FINAL_EXTENSION: &str = "wav16";

/// Sounds subdirectory referenced by playback, relative to the Asterisk
/// sounds root.
const PLAYBACK_DIR: &str = "custom";

/// Upper bound on the sanitized thread-id fragment inside a filename.
const MAX_FRAGMENT_LEN: usize = 80;

/// How long one synthesis or encoding subprocess may run.
const TOOL_TIMEOUT_SECS: u64 = 60;

/// Errors from the synthesis and encoding subprocess backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The tool binary could not be started
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran but reported failure
    #[error("{command} failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    /// The tool did not finish within the timeout
    #[error("{command} timed out after {timeout_secs}s")]
    Timeout {
        command: String,
        timeout_secs: u64,
    },
}

/// Run one backend tool to completion, mapping spawn failure, non-zero exit,
/// and timeout to [`BackendError`].
pub(crate) async fn run_tool(command: &mut Command, name: &str) -> Result<(), BackendError> {
    let output = tokio::time::timeout(Duration::from_secs(TOOL_TIMEOUT_SECS), command.output())
        .await
        .map_err(|_| BackendError::Timeout {
            command: name.to_string(),
            timeout_secs: TOOL_TIMEOUT_SECS,
        })?
        .map_err(|e| BackendError::Spawn {
            command: name.to_string(),
            source: e,
        })?;

    if !output.status.success() {
        return Err(BackendError::Failed {
            command: name.to_string(),
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(())
}

/// Reference to a playable artifact, e.g. `custom/nws_047001_A1`.
///
/// This is the extensionless form Asterisk's Playback application expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRef(String);

impl PlaybackRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaybackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Filesystem-backed announcement cache.
pub struct AudioCache {
    sounds_dir: PathBuf,
    synthesizer: Box<dyn Synthesizer>,
    encoder: Box<dyn Encoder>,
}

impl AudioCache {
    /// Create a cache over `sounds_dir` with the given backends.
    pub fn new(
        sounds_dir: impl Into<PathBuf>,
        synthesizer: Box<dyn Synthesizer>,
        encoder: Box<dyn Encoder>,
    ) -> Self {
        Self {
            sounds_dir: sounds_dir.into(),
            synthesizer,
            encoder,
        }
    }

    /// Create a cache using the pico2wave and sox backends.
    pub fn with_default_backends(sounds_dir: impl Into<PathBuf>) -> Self {
        Self::new(
            sounds_dir,
            Box::new(PicoTts::default()),
            Box::new(SoxEncoder::default()),
        )
    }

    /// Reduce a thread id to a filesystem-safe filename fragment.
    ///
    /// Characters outside `[A-Za-z0-9_-]` become `_` and the result is
    /// truncated; an empty result substitutes a short content hash.
    pub fn sanitize_fragment(thread_id: &str) -> String {
        let sanitized: String = thread_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .take(MAX_FRAGMENT_LEN)
            .collect();

        if sanitized.is_empty() {
            let mut hasher = Sha1::new();
            hasher.update(thread_id.as_bytes());
            hex::encode(hasher.finalize())[..10].to_string()
        } else {
            sanitized
        }
    }

    fn cache_key(code: &str, thread_id: &ThreadId) -> String {
        format!(
            "{CACHE_PREFIX}{code}_{}",
            Self::sanitize_fragment(thread_id.as_str())
        )
    }

    /// Final artifact path for a key.
    pub fn artifact_path(&self, code: &str, thread_id: &ThreadId) -> PathBuf {
        self.sounds_dir
            .join(format!("{}.{FINAL_EXTENSION}", Self::cache_key(code, thread_id)))
    }

    /// Ensure a playable artifact exists for (code, thread), synthesizing on
    /// miss, and return its playback reference.
    ///
    /// The artifact is written to temporary paths and promoted with an
    /// atomic rename, so a half-written file is never visible at the final
    /// path. A failure here affects only this (code, thread) pair.
    pub async fn ensure(
        &self,
        text: &str,
        code: &str,
        thread_id: &ThreadId,
    ) -> Result<PlaybackRef, PollerError> {
        let key = Self::cache_key(code, thread_id);
        let final_path = self.sounds_dir.join(format!("{key}.{FINAL_EXTENSION}"));
        let playback = PlaybackRef(format!("{PLAYBACK_DIR}/{key}"));

        fs::create_dir_all(&self.sounds_dir)
            .await
            .map_err(|e| storage_error(&self.sounds_dir, &e))?;

        if fs::try_exists(&final_path).await.unwrap_or(false) {
            debug!(key, "Announcement cache hit");
            return Ok(playback);
        }

        let tmp_raw = self.sounds_dir.join(format!(".{key}.raw.wav"));
        let tmp_encoded = self.sounds_dir.join(format!(".{key}.enc.wav"));

        if let Err(source) = self.synthesizer.synthesize(text, &tmp_raw).await {
            let _ = fs::remove_file(&tmp_raw).await;
            return Err(PollerError::Synth {
                code: code.to_string(),
                thread: thread_id.to_string(),
                source,
            });
        }

        let encoded = self.encoder.encode(&tmp_raw, &tmp_encoded).await;
        let _ = fs::remove_file(&tmp_raw).await;
        if let Err(source) = encoded {
            let _ = fs::remove_file(&tmp_encoded).await;
            return Err(PollerError::Encode {
                code: code.to_string(),
                thread: thread_id.to_string(),
                source,
            });
        }

        fs::rename(&tmp_encoded, &final_path)
            .await
            .map_err(|e| storage_error(&final_path, &e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(&final_path, std::fs::Permissions::from_mode(0o644)).await;
        }

        info!(key, "Synthesized announcement artifact");
        Ok(playback)
    }
}

fn storage_error(path: &Path, e: &std::io::Error) -> PollerError {
    PollerError::Storage {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}
