//! Per-segment retry with exponential backoff.

use std::time::Duration;

use novelcast_core::{SpeechProvider, SynthesisResult, TextSegment, VoiceOptions};
use tokio_util::sync::CancellationToken;

/// Retry policy for a single segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub const fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Backoff before `attempt` (1-based). No delay before the first attempt.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(2)))
    }
}

/// Synthesize one segment, retrying transient failures.
///
/// Always returns a terminal result: audio on success, `None` once retries
/// are exhausted, the provider rejected the text, or `cancel` fired.
pub async fn synthesize_with_retry(
    provider: &dyn SpeechProvider,
    segment: &TextSegment,
    voice: &VoiceOptions,
    policy: RetryPolicy,
    cancel: &CancellationToken,
) -> SynthesisResult {
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let delay = policy.delay_before(attempt);
        if !delay.is_zero() {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return SynthesisResult::failed(segment.index),
                () = tokio::time::sleep(delay) => {}
            }
        }

        match provider.synthesize_one(&segment.text, voice, attempt).await {
            Ok(audio) => {
                tracing::trace!(
                    index = segment.index,
                    attempt,
                    bytes = audio.len(),
                    "Segment synthesized"
                );
                return SynthesisResult::success(segment.index, audio);
            }
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                tracing::debug!(
                    index = segment.index,
                    attempt,
                    error = %e,
                    "Segment synthesis failed, retrying"
                );
            }
            Err(e) => {
                tracing::warn!(
                    index = segment.index,
                    attempt,
                    provider = provider.name(),
                    error = %e,
                    "Segment synthesis failed, skipping"
                );
                return SynthesisResult::failed(segment.index);
            }
        }
    }

    SynthesisResult::failed(segment.index)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use novelcast_core::{SpeechError, Voice};

    use super::*;

    /// Provider that replays a fixed script of outcomes.
    struct Scripted {
        script: Mutex<Vec<Result<Bytes, SpeechError>>>,
        calls: AtomicU32,
        attempts_seen: Mutex<Vec<u32>>,
    }

    impl Scripted {
        fn new(mut script: Vec<Result<Bytes, SpeechError>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                calls: AtomicU32::new(0),
                attempts_seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SpeechProvider for Scripted {
        async fn synthesize_one(
            &self,
            _text: &str,
            _voice: &VoiceOptions,
            attempt: u32,
        ) -> Result<Bytes, SpeechError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.attempts_seen.lock().unwrap().push(attempt);
            self.script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(SpeechError::Transient("script exhausted".into())))
        }

        async fn voices(&self) -> Result<Vec<Voice>, SpeechError> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn segment() -> TextSegment {
        TextSegment::new(7, "Một câu.")
    }

    #[test]
    fn delay_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_before(1), Duration::ZERO);
        assert_eq!(policy.delay_before(2), Duration::from_millis(500));
        assert_eq!(policy.delay_before(3), Duration::from_millis(1000));
        assert_eq!(policy.delay_before(4), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried() {
        let provider = Scripted::new(vec![
            Err(SpeechError::Transient("503".into())),
            Ok(Bytes::from_static(b"mp3")),
        ]);
        let started = tokio::time::Instant::now();
        let result = synthesize_with_retry(
            &provider,
            &segment(),
            &VoiceOptions::default(),
            RetryPolicy::default(),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(result, SynthesisResult::success(7, Bytes::from_static(b"mp3")));
        assert_eq!(*provider.attempts_seen.lock().unwrap(), vec![1, 2]);
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let provider = Scripted::new(Vec::new());
        let result = synthesize_with_retry(
            &provider,
            &segment(),
            &VoiceOptions::default(),
            RetryPolicy::default(),
            &CancellationToken::new(),
        )
        .await;

        assert!(result.is_failed());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn rejected_is_not_retried() {
        let provider = Scripted::new(vec![Err(SpeechError::Rejected("400".into()))]);
        let result = synthesize_with_retry(
            &provider,
            &segment(),
            &VoiceOptions::default(),
            RetryPolicy::default(),
            &CancellationToken::new(),
        )
        .await;

        assert!(result.is_failed());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_interrupts_backoff() {
        let provider = Scripted::new(vec![Err(SpeechError::Transient("timeout".into()))]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = synthesize_with_retry(
            &provider,
            &segment(),
            &VoiceOptions::default(),
            RetryPolicy::default(),
            &cancel,
        )
        .await;

        assert!(result.is_failed());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }
}
