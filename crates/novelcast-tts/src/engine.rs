//! The chunked synthesis engine.
//!
//! [`SynthesisEngine::synthesize`] splits the text, then spawns a driver task
//! that fans segments out to the provider and forwards audio in order
//! through a bounded channel. The returned [`AudioStream`] is the receiving
//! end; dropping it cancels the driver.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::stream::{FuturesUnordered, Stream, StreamExt};
use novelcast_core::{SpeechProvider, TextSegment, VoiceOptions};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::SynthesisError;
use crate::retry::{RetryPolicy, synthesize_with_retry};
use crate::session::StreamSession;
use crate::text::split_into_segments;

/// Engine tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum characters per provider request.
    pub max_segment_chars: usize,
    /// Maximum provider calls in flight per stream.
    pub concurrency: usize,
    pub retry: RetryPolicy,
    /// Audio chunks buffered between the driver and the consumer.
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl EngineConfig {
    pub fn with_defaults() -> Self {
        Self {
            max_segment_chars: 200,
            concurrency: 3,
            retry: RetryPolicy::default(),
            channel_capacity: 4,
        }
    }

    #[must_use]
    pub const fn max_segment_chars(mut self, chars: usize) -> Self {
        self.max_segment_chars = chars;
        self
    }

    #[must_use]
    pub const fn concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    #[must_use]
    pub const fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub const fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }
}

type AudioItem = Result<Bytes, SynthesisError>;

#[derive(Clone)]
pub struct SynthesisEngine {
    provider: Arc<dyn SpeechProvider>,
    config: EngineConfig,
}

impl std::fmt::Debug for SynthesisEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesisEngine")
            .field("provider", &self.provider.name())
            .field("config", &self.config)
            .finish()
    }
}

impl SynthesisEngine {
    pub fn new(provider: Arc<dyn SpeechProvider>, config: EngineConfig) -> Self {
        Self { provider, config }
    }

    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn SpeechProvider> {
        &self.provider
    }

    /// Start synthesizing `text`.
    ///
    /// Fails immediately with [`SynthesisError::EmptyInput`] if there is
    /// nothing to speak. Otherwise the stream yields audio chunks in segment
    /// order and ends once every segment is terminal. If every segment
    /// fails, the only item is [`SynthesisError::NoAudioProduced`].
    ///
    /// Cancelling `cancel` or dropping the stream stops all provider work.
    /// Must be called from within a tokio runtime.
    pub fn synthesize(
        &self,
        text: &str,
        voice: &VoiceOptions,
        cancel: &CancellationToken,
    ) -> Result<AudioStream, SynthesisError> {
        let segments = split_into_segments(text, self.config.max_segment_chars);
        if segments.is_empty() {
            return Err(SynthesisError::EmptyInput);
        }

        let token = cancel.child_token();
        let session = StreamSession::new(segments.len(), token.clone());
        let id = session.id();
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));

        tracing::info!(
            session = %id,
            segments = segments.len(),
            provider = self.provider.name(),
            "Starting synthesis"
        );

        let driver = Driver {
            provider: Arc::clone(&self.provider),
            voice: voice.clone(),
            config: self.config,
            session,
            tx,
        };
        tokio::spawn(
            driver
                .run(segments)
                .instrument(tracing::debug_span!("synthesis", session = %id)),
        );

        Ok(AudioStream {
            id,
            token: token.clone(),
            inner: ReceiverStream::new(rx),
            _cancel_on_drop: token.drop_guard(),
        })
    }
}

// ── Driver ─────────────────────────────────────────────────────────

struct Driver {
    provider: Arc<dyn SpeechProvider>,
    voice: VoiceOptions,
    config: EngineConfig,
    session: StreamSession,
    tx: mpsc::Sender<AudioItem>,
}

impl Driver {
    async fn run(mut self, segments: Vec<TextSegment>) {
        let cancel = self.session.cancel_token().clone();
        let concurrency = self.config.concurrency.max(1);
        let mut pending = segments.into_iter();
        let mut in_flight = FuturesUnordered::new();

        loop {
            while in_flight.len() < concurrency {
                let Some(segment) = pending.next() else { break };
                let provider = Arc::clone(&self.provider);
                let voice = self.voice.clone();
                let retry = self.config.retry;
                let cancel = cancel.clone();
                in_flight.push(async move {
                    synthesize_with_retry(provider.as_ref(), &segment, &voice, retry, &cancel)
                        .await
                });
            }

            // Completions are handled one at a time, so the session needs no lock.
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::debug!(in_flight = in_flight.len(), "Synthesis cancelled");
                    return;
                }
                () = self.tx.closed() => {
                    tracing::debug!("Audio consumer went away, stopping synthesis");
                    cancel.cancel();
                    return;
                }
                next = in_flight.next() => match next {
                    Some(result) => result,
                    None => break,
                },
            };

            for audio in self.session.record(result) {
                // In-flight calls are not polled while the channel is full.
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => return,
                    sent = self.tx.send(Ok(audio)) => {
                        if sent.is_err() {
                            cancel.cancel();
                            return;
                        }
                    }
                }
            }
        }

        self.finish().await;
    }

    async fn finish(self) {
        let session = &self.session;
        if session.produced_nothing() {
            tracing::warn!(
                segments = session.segments(),
                "Speech synthesis failed for every segment"
            );
            let err = SynthesisError::NoAudioProduced {
                segments: session.segments(),
            };
            let _ = self.tx.send(Err(err)).await;
            return;
        }
        tracing::info!(
            segments = session.segments(),
            succeeded = session.succeeded(),
            failed = session.failed(),
            bytes = session.bytes_flushed(),
            "Synthesis complete"
        );
    }
}

// ── Output stream ──────────────────────────────────────────────────

/// Ordered audio of one synthesis session.
///
/// Dropping the stream cancels the session.
pub struct AudioStream {
    id: Uuid,
    token: CancellationToken,
    inner: ReceiverStream<AudioItem>,
    _cancel_on_drop: DropGuard,
}

impl AudioStream {
    pub const fn session_id(&self) -> Uuid {
        self.id
    }

    /// Stop synthesis; already buffered chunks may still be yielded.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Read the whole stream into one buffer.
    pub async fn collect_all(mut self) -> Result<Bytes, SynthesisError> {
        let mut out = Vec::new();
        while let Some(chunk) = self.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(Bytes::from(out))
    }
}

impl std::fmt::Debug for AudioStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioStream").field("id", &self.id).finish()
    }
}

impl Stream for AudioStream {
    type Item = AudioItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_provider_limits() {
        let config = EngineConfig::default();
        assert_eq!(config.max_segment_chars, 200);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.channel_capacity, 4);
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn builder_overrides() {
        let config = EngineConfig::with_defaults()
            .concurrency(1)
            .max_segment_chars(50)
            .channel_capacity(1);
        assert_eq!(
            (config.concurrency, config.max_segment_chars, config.channel_capacity),
            (1, 50, 1)
        );
    }
}
