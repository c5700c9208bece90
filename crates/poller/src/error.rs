//! Error types for the alert poller.
//!
//! Every variant here is non-fatal to the process: feed errors degrade the
//! cycle to zero alerts, storage errors degrade to defaults, and per-pair
//! synthesis/dispatch failures skip only the affected (code, thread) or
//! (thread, extension) pair so it can retry on the next cycle.

use thiserror::Error;

use crate::audio::BackendError;

/// Errors that can occur during a poll cycle.
#[derive(Debug, Error)]
pub enum PollerError {
    /// Alert feed request failed
    #[error("feed request failed: {0}")]
    Feed(#[from] reqwest::Error),

    /// Speech synthesis failed for one (code, thread) pair
    #[error("synthesis failed for code {code} thread {thread}: {source}")]
    Synth {
        code: String,
        thread: String,
        #[source]
        source: BackendError,
    },

    /// Audio encoding failed for one (code, thread) pair
    #[error("encoding failed for code {code} thread {thread}: {source}")]
    Encode {
        code: String,
        thread: String,
        #[source]
        source: BackendError,
    },

    /// Page dispatch failed for one (thread, extension) pair
    #[error("dispatch failed for extension {extension} thread {thread}: {source}")]
    Dispatch {
        extension: String,
        thread: String,
        #[source]
        source: paging::PageError,
    },

    /// Reading or writing a persisted file failed
    #[error("storage error at {path}: {reason}")]
    Storage { path: String, reason: String },

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
