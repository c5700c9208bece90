//! Error types for the paging dispatcher.

use thiserror::Error;

/// Errors that can occur when dispatching a page.
#[derive(Debug, Error)]
pub enum PageError {
    /// The telephony control binary could not be started
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The originate command ran but reported failure
    #[error("originate for extension {extension} failed ({status}): {stderr}")]
    Originate {
        extension: String,
        status: String,
        stderr: String,
    },

    /// The originate command did not finish within the timeout
    #[error("originate for extension {extension} timed out after {timeout_secs}s")]
    Timeout {
        extension: String,
        timeout_secs: u64,
    },

    /// Channel is not configured
    #[error("channel not configured: {0}")]
    NotConfigured(String),
}
