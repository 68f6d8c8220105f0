//! Client buffer controller.
//!
//! Accumulates the audio of one chapter as it arrives and decides when the
//! media element gets a (new) playable snapshot of it:
//!
//! ```text
//!   Idle → Buffering → Playing ⇄ Rebuffering → Ended
//!     (any non-terminal state) → Aborted
//! ```
//!
//! Playback starts once `min_buffer_bytes` have arrived. While the stream is
//! still open, the snapshot is rebuilt from all received bytes whenever the
//! element gets within `refresh_margin` of its end, keeping position and
//! play/pause state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use tokio_util::sync::CancellationToken;

use crate::media::{MediaElement, PlayableSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Bytes needed before playback starts.
    pub min_buffer_bytes: usize,
    /// Rebuild the snapshot when less than this much audio is left.
    pub refresh_margin: Duration,
    /// Pause after a reset before new audio is accepted.
    pub settle_delay: Duration,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            min_buffer_bytes: 128 * 1024,
            refresh_margin: Duration::from_secs(5),
            settle_delay: Duration::from_millis(100),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Buffering,
    Playing,
    Rebuffering,
    Ended,
    Aborted,
}

struct Inner {
    media: Box<dyn MediaElement>,
    chunks: Vec<Bytes>,
    total_bytes: usize,
    source: Option<PlayableSource>,
    started: bool,
    stream_done: bool,
    state: PlaybackState,
    cancel: Option<CancellationToken>,
}

impl Inner {
    fn set_state(&mut self, new_state: PlaybackState) {
        if self.state != new_state {
            tracing::debug!(old = ?self.state, new = ?new_state, "Playback state transition");
            self.state = new_state;
        }
    }

    fn materialized_bytes(&self) -> usize {
        self.source.as_ref().map_or(0, PlayableSource::len)
    }

    fn has_unplayed_bytes(&self) -> bool {
        self.total_bytes > self.materialized_bytes()
    }

    fn remaining(&self) -> Option<Duration> {
        let duration = self.media.duration()?;
        Some(duration.saturating_sub(self.media.position()))
    }

    fn all_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.total_bytes);
        for chunk in &self.chunks {
            buf.extend_from_slice(chunk);
        }
        buf.freeze()
    }

    fn start_playback(&mut self) {
        let source = PlayableSource::new(self.all_bytes());
        tracing::info!(bytes = source.len(), "Starting playback");
        self.media.load(source.clone());
        self.source = Some(source);
        self.started = true;
        match self.media.play() {
            Ok(()) => self.set_state(PlaybackState::Playing),
            Err(e) => tracing::warn!(error = %e, "Media element refused to play"),
        }
    }

    /// Swap in a snapshot of every received byte, keeping position and
    /// play state. The new source is attached before the old one is released.
    fn refresh(&mut self) {
        let position = self.media.position();
        let resume = !self.media.is_paused() || self.state == PlaybackState::Rebuffering;

        let source = PlayableSource::new(self.all_bytes());
        tracing::debug!(
            bytes = source.len(),
            position_ms = u64::try_from(position.as_millis()).unwrap_or(u64::MAX),
            resume,
            "Refreshing playable source"
        );
        self.media.load(source.clone());
        self.media.seek(position);
        if resume {
            match self.media.play() {
                Ok(()) => self.set_state(PlaybackState::Playing),
                Err(e) => tracing::warn!(error = %e, "Media element refused to resume"),
            }
        }
        if let Some(old) = self.source.replace(source) {
            old.release();
        }
    }

    fn refresh_if_near_end(&mut self, margin: Duration) {
        if !self.has_unplayed_bytes() {
            return;
        }
        if self.remaining().is_none_or(|left| left < margin) {
            self.refresh();
        }
    }

    fn teardown(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.media.pause();
        self.media.unload();
        if let Some(source) = self.source.take() {
            source.release();
        }
        self.chunks.clear();
        self.total_bytes = 0;
        self.started = false;
        self.stream_done = false;
    }
}

/// Progressive playback buffer for one chapter at a time.
///
/// Cheap to clone; clones share state. Methods never hold the internal lock
/// across an await point.
#[derive(Clone)]
pub struct BufferController {
    inner: Arc<Mutex<Inner>>,
    cleaning: Arc<AtomicUsize>,
    config: BufferConfig,
}

impl std::fmt::Debug for BufferController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferController")
            .field("state", &self.state())
            .field("total_bytes", &self.total_bytes())
            .finish_non_exhaustive()
    }
}

/// Decrements the cleanup counter even if `reset` is dropped mid-settle.
struct CleaningGuard<'a>(&'a AtomicUsize);

impl Drop for CleaningGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl BufferController {
    pub fn new(media: Box<dyn MediaElement>, config: BufferConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                media,
                chunks: Vec::new(),
                total_bytes: 0,
                source: None,
                started: false,
                stream_done: false,
                state: PlaybackState::Idle,
                cancel: None,
            })),
            cleaning: Arc::new(AtomicUsize::new(0)),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub const fn config(&self) -> &BufferConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        self.lock().state
    }

    pub fn total_bytes(&self) -> usize {
        self.lock().total_bytes
    }

    pub fn is_started(&self) -> bool {
        self.lock().started
    }

    pub fn is_stream_done(&self) -> bool {
        self.lock().stream_done
    }

    pub fn is_cleaning(&self) -> bool {
        self.cleaning.load(Ordering::SeqCst) > 0
    }

    /// Id of the source currently attached to the media element.
    pub fn source_id(&self) -> Option<u64> {
        self.lock().source.as_ref().map(PlayableSource::id)
    }

    /// All bytes received so far, in order.
    pub fn audio_snapshot(&self) -> Bytes {
        self.lock().all_bytes()
    }

    /// Cancel the current read (if any) and hand out a token for the next.
    pub fn new_cancellation(&self) -> CancellationToken {
        let token = CancellationToken::new();
        self.adopt_cancellation(token.clone());
        token
    }

    /// Take ownership of a read that was started elsewhere (prefetch handoff).
    pub fn adopt_cancellation(&self, token: CancellationToken) {
        let mut inner = self.lock();
        if let Some(old) = inner.cancel.replace(token) {
            old.cancel();
        }
    }

    /// Tear everything down and wait for the element to settle.
    ///
    /// Chunks offered while any reset is in progress are dropped.
    pub async fn reset(&self) {
        self.cleaning.fetch_add(1, Ordering::SeqCst);
        let _guard = CleaningGuard(&self.cleaning);
        {
            let mut inner = self.lock();
            inner.teardown();
            inner.set_state(PlaybackState::Idle);
        }
        tokio::time::sleep(self.config.settle_delay).await;
    }

    /// Append a chunk. Returns `true` only for the chunk that started playback.
    pub fn add_chunk(&self, chunk: Bytes) -> bool {
        // Checked under the lock: `reset` raises the flag before locking.
        let mut inner = self.lock();
        if self.is_cleaning() {
            tracing::trace!(bytes = chunk.len(), "Dropping chunk during reset");
            return false;
        }
        if matches!(inner.state, PlaybackState::Aborted | PlaybackState::Ended) {
            return false;
        }
        inner.total_bytes += chunk.len();
        inner.chunks.push(chunk);

        if !inner.started {
            inner.set_state(PlaybackState::Buffering);
            if inner.total_bytes >= self.config.min_buffer_bytes {
                inner.start_playback();
                return true;
            }
            return false;
        }

        inner.refresh_if_near_end(self.config.refresh_margin);
        false
    }

    /// The network stream ended; make every received byte playable.
    pub fn finish(&self) {
        let mut inner = self.lock();
        if self.is_cleaning() || inner.state == PlaybackState::Aborted {
            return;
        }
        inner.stream_done = true;
        if inner.total_bytes == 0 {
            inner.set_state(PlaybackState::Ended);
            return;
        }
        if !inner.started {
            inner.start_playback();
        } else if inner.has_unplayed_bytes() {
            inner.refresh();
        }
    }

    /// Periodic position report from the element. Returns the audio left in
    /// the current snapshot once playback has started.
    pub fn on_time_update(&self) -> Option<Duration> {
        let mut inner = self.lock();
        if self.is_cleaning() || !inner.started {
            return None;
        }
        inner.refresh_if_near_end(self.config.refresh_margin);
        let remaining = inner.remaining()?;

        if matches!(
            inner.state,
            PlaybackState::Playing | PlaybackState::Rebuffering
        ) {
            let starving = !inner.stream_done && remaining < self.config.refresh_margin;
            inner.set_state(if starving {
                PlaybackState::Rebuffering
            } else {
                PlaybackState::Playing
            });
        }
        Some(remaining)
    }

    /// The element played to the end of its snapshot.
    ///
    /// Returns `true` when the chapter is over. Otherwise the element simply
    /// ran dry: it resumes now if more bytes are already here, or on the next
    /// chunk.
    pub fn on_media_ended(&self) -> bool {
        let mut inner = self.lock();
        if matches!(inner.state, PlaybackState::Aborted | PlaybackState::Idle) {
            return false;
        }
        if inner.stream_done && !inner.has_unplayed_bytes() {
            inner.set_state(PlaybackState::Ended);
            return true;
        }
        inner.set_state(PlaybackState::Rebuffering);
        if inner.has_unplayed_bytes() {
            inner.refresh();
        }
        false
    }

    /// Stop reading and playing, keeping the received bytes.
    pub fn abort(&self) {
        let mut inner = self.lock();
        if let Some(token) = inner.cancel.take() {
            token.cancel();
        }
        inner.media.pause();
        if inner.state != PlaybackState::Ended {
            inner.set_state(PlaybackState::Aborted);
        }
    }

    /// Immediate teardown without the settle delay (shutdown path).
    pub fn cleanup(&self) {
        let mut inner = self.lock();
        inner.teardown();
        inner.set_state(PlaybackState::Idle);
    }
}
