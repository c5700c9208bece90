//! Speech synthesis backend.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{run_tool, BackendError};

/// Trait for speech synthesis backends.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text` into a WAV file at `out_wav`.
    async fn synthesize(&self, text: &str, out_wav: &Path) -> Result<(), BackendError>;
}

/// Synthesizer backed by the `pico2wave` binary.
#[derive(Debug, Clone)]
pub struct PicoTts {
    bin: String,
    voice: String,
}

impl PicoTts {
    pub fn new(bin: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            voice: voice.into(),
        }
    }
}

impl Default for PicoTts {
    fn default() -> Self {
        Self::new("pico2wave", "en-US")
    }
}

#[async_trait]
impl Synthesizer for PicoTts {
    async fn synthesize(&self, text: &str, out_wav: &Path) -> Result<(), BackendError> {
        debug!(out = %out_wav.display(), chars = text.len(), "Synthesizing announcement");
        run_tool(
            Command::new(&self.bin)
                .arg("-l")
                .arg(&self.voice)
                .arg("-w")
                .arg(out_wav)
                .arg(text),
            &self.bin,
        )
        .await
    }
}
