//! Audio encoding backend.

use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{run_tool, BackendError};

/// Trait for audio encoding backends.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Re-encode `input_wav` to the telephony target format at `out_wav`.
    async fn encode(&self, input_wav: &Path, out_wav: &Path) -> Result<(), BackendError>;
}

/// Encoder backed by the `sox` binary.
///
/// Produces 16 kHz mono signed 16-bit PCM, normalized to -3 dB, the format
/// Asterisk plays as `.wav16`.
#[derive(Debug, Clone)]
pub struct SoxEncoder {
    bin: String,
}

impl SoxEncoder {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }
}

impl Default for SoxEncoder {
    fn default() -> Self {
        Self::new("sox")
    }
}

#[async_trait]
impl Encoder for SoxEncoder {
    async fn encode(&self, input_wav: &Path, out_wav: &Path) -> Result<(), BackendError> {
        debug!(input = %input_wav.display(), out = %out_wav.display(), "Encoding announcement");
        run_tool(
            Command::new(&self.bin)
                .arg(input_wav)
                .args(["-r", "16000", "-c", "1", "-b", "16", "-e", "signed-integer"])
                .arg(out_wav)
                .args(["norm", "-3"]),
            &self.bin,
        )
        .await
    }
}
