//! Speech provider port.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::domain::{Voice, VoiceOptions};

/// Failure of a single provider call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SpeechError {
    /// Network trouble, timeouts, 5xx, throttling. Worth retrying.
    #[error("Transient speech provider failure: {0}")]
    Transient(String),

    /// The provider refused this input. Retrying will not help.
    #[error("Speech provider rejected the request: {0}")]
    Rejected(String),
}

impl SpeechError {
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Text-to-speech backend that turns one short text into one MP3 blob.
///
/// `attempt` starts at 1 and lets implementations vary request parameters
/// (timeouts, user agents) between retries.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    async fn synthesize_one(
        &self,
        text: &str,
        voice: &VoiceOptions,
        attempt: u32,
    ) -> Result<Bytes, SpeechError>;

    /// Voices this provider can speak with.
    async fn voices(&self) -> Result<Vec<Voice>, SpeechError>;

    fn name(&self) -> &str;
}
