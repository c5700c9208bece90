//! Paging channel implementations.

pub mod asterisk;

use async_trait::async_trait;

use crate::error::PageError;

/// Trait for paging channels (Asterisk CLI, AMI, etc.).
#[async_trait]
pub trait PageChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Check if this channel is enabled/configured.
    fn enabled(&self) -> bool;

    /// Originate a paging call to `extension` playing `playback_ref`.
    async fn page(&self, extension: &str, playback_ref: &str) -> Result<(), PageError>;
}
