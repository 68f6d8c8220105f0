//! Playback session: one chapter at a time, with prefetch and handoff.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use futures_util::StreamExt;
use novelcast_core::{ChapterNavigation, ChapterRef, SettingsStore};
use tokio::task::JoinHandle;

use crate::buffer::{BufferConfig, BufferController, PlaybackState};
use crate::client::{ByteStream, ClientError, ConvertApi, ConvertRequest};
use crate::media::MediaElement;
use crate::prefetch::{PrefetchCoordinator, PrefetchedData};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Start fetching the next chapter once less than this much audio is left.
    /// Only checked after the current chapter's body has been fully received.
    pub prefetch_threshold: Duration,
    pub buffer: BufferConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prefetch_threshold: Duration::from_secs(30),
            buffer: BufferConfig::default(),
        }
    }
}

impl SessionConfig {
    pub fn with_defaults() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn prefetch_threshold(mut self, threshold: Duration) -> Self {
        self.prefetch_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn buffer(mut self, buffer: BufferConfig) -> Self {
        self.buffer = buffer;
        self
    }
}

/// A chapter that played to the end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedChapter {
    pub chapter: Option<ChapterRef>,
    pub audio: Bytes,
}

/// Outcome of a media "ended" event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterEnd {
    /// The element ran dry mid-chapter; playback resumes as audio arrives.
    Rebuffering,
    /// The chapter finished and the next one is now loading.
    Advanced {
        finished: FinishedChapter,
        next: ChapterNavigation,
    },
    /// The chapter finished and there is nothing after it.
    Finished { finished: FinishedChapter },
}

/// Drives a [`BufferController`] from the convert endpoint.
pub struct PlaybackSession {
    api: Arc<dyn ConvertApi>,
    controller: BufferController,
    prefetch: PrefetchCoordinator,
    settings: SettingsStore,
    config: SessionConfig,
    navigation: ChapterNavigation,
    pump: Option<JoinHandle<()>>,
    stream_error: Arc<Mutex<Option<ClientError>>>,
}

impl std::fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("controller", &self.controller)
            .field("prefetch", &self.prefetch)
            .field("navigation", &self.navigation)
            .finish_non_exhaustive()
    }
}

impl PlaybackSession {
    pub fn new(
        api: Arc<dyn ConvertApi>,
        media: Box<dyn MediaElement>,
        settings: SettingsStore,
        config: SessionConfig,
    ) -> Self {
        Self {
            prefetch: PrefetchCoordinator::new(Arc::clone(&api)),
            controller: BufferController::new(media, config.buffer),
            api,
            settings,
            config,
            navigation: ChapterNavigation::default(),
            pump: None,
            stream_error: Arc::new(Mutex::new(None)),
        }
    }

    pub const fn controller(&self) -> &BufferController {
        &self.controller
    }

    pub const fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    /// Navigation of the chapter currently loaded.
    pub const fn navigation(&self) -> &ChapterNavigation {
        &self.navigation
    }

    pub fn state(&self) -> PlaybackState {
        self.controller.state()
    }

    pub fn is_prefetching(&self) -> bool {
        self.prefetch.is_active()
    }

    /// Error that cut the current body short, if any.
    pub fn take_stream_error(&self) -> Option<ClientError> {
        self.stream_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Play a chapter with the voice from the settings store.
    pub async fn play_chapter(&mut self, url: &str) -> Result<ChapterNavigation, ClientError> {
        let request = ConvertRequest::chapter(url, self.settings.voice_options());
        self.play(request).await
    }

    /// Play raw text with the voice from the settings store.
    pub async fn play_text(&mut self, text: &str) -> Result<ChapterNavigation, ClientError> {
        let request = ConvertRequest::text(text, self.settings.voice_options());
        self.play(request).await
    }

    /// Start a fresh stream, discarding the current chapter and any prefetch.
    pub async fn play(&mut self, request: ConvertRequest) -> Result<ChapterNavigation, ClientError> {
        self.prefetch.reset_prefetch();
        self.stop_pump();
        self.controller.reset().await;

        let cancel = self.controller.new_cancellation();
        let opened = self.api.open(&request, cancel).await?;

        tracing::info!(
            chapter = ?opened.navigation.current.as_ref().and_then(|c| c.title.as_deref()),
            "Chapter stream opened"
        );
        self.navigation = opened.navigation;
        self.spawn_pump(opened.body);
        Ok(self.navigation.clone())
    }

    /// Forward a position report and start prefetching when the end is near.
    ///
    /// The trigger also waits for the current body to be complete, so the
    /// two chapters are never downloaded at the same time.
    pub fn on_time_update(&self) -> Option<Duration> {
        let remaining = self.controller.on_time_update()?;
        if remaining < self.config.prefetch_threshold
            && self.controller.is_stream_done()
            && !self.prefetch.is_active()
            && let Some(next) = self.navigation.next_chapter()
        {
            self.prefetch
                .start_prefetch(next, self.settings.voice_options());
        }
        Some(remaining)
    }

    /// The media element reached the end of its source.
    pub async fn on_media_ended(&mut self) -> Result<ChapterEnd, ClientError> {
        let Some(finished) = self.chapter_ended() else {
            return Ok(ChapterEnd::Rebuffering);
        };

        Ok(match self.on_chapter_end().await? {
            Some(next) => ChapterEnd::Advanced { finished, next },
            None => ChapterEnd::Finished { finished },
        })
    }

    /// Handle an "ended" event without moving on.
    ///
    /// Returns the finished chapter, or `None` when the element only ran dry
    /// mid-chapter. Call [`Self::on_chapter_end`] to advance.
    pub fn chapter_ended(&self) -> Option<FinishedChapter> {
        if !self.controller.on_media_ended() {
            return None;
        }

        let finished = FinishedChapter {
            chapter: self.navigation.current.clone(),
            audio: self.controller.audio_snapshot(),
        };
        tracing::info!(
            chapter = ?finished.chapter.as_ref().and_then(|c| c.title.as_deref()),
            bytes = finished.audio.len(),
            "Chapter finished"
        );
        Some(finished)
    }

    /// Move on to the next chapter: hand off the prefetch if it produced a
    /// response, otherwise open a fresh request.
    ///
    /// Returns `None` when there is no next chapter, or when the fresh
    /// request was aborted by a concurrent reset.
    pub async fn on_chapter_end(&mut self) -> Result<Option<ChapterNavigation>, ClientError> {
        let Some(next) = self.navigation.next_chapter().cloned() else {
            self.prefetch.reset_prefetch();
            return Ok(None);
        };

        match self.prefetch.take_prefetched().await {
            Some(data) if data.has_response() && data.chapter.url == next.url => {
                return Ok(Some(self.handoff(data).await));
            }
            Some(data) => {
                tracing::debug!(error = ?data.error, "Prefetch has no response, requesting again");
                data.cancel.cancel();
            }
            None => tracing::debug!("No prefetch, requesting next chapter"),
        }

        let Some(url) = next.url.as_deref() else {
            return Ok(None);
        };
        match self.play_chapter(url).await {
            Ok(navigation) => Ok(Some(navigation)),
            Err(e) if e.is_abort() => {
                tracing::debug!("Next chapter request aborted");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn handoff(&mut self, data: PrefetchedData) -> ChapterNavigation {
        self.stop_pump();
        self.controller.reset().await;
        self.controller.adopt_cancellation(data.cancel);

        let replayed = data.chunks.len();
        for chunk in data.chunks {
            self.controller.add_chunk(chunk);
        }
        self.navigation = data.navigation.unwrap_or_default();
        tracing::info!(
            chapter = ?data.chapter.title,
            replayed,
            live = data.reader.is_some(),
            "Handed off prefetched chapter"
        );

        match data.reader {
            Some(reader) => self.spawn_pump(reader),
            None => {
                if let Some(e) = data.error.filter(|e| !e.is_abort()) {
                    self.record_stream_error(e);
                }
                self.controller.finish();
            }
        }
        self.navigation.clone()
    }

    fn spawn_pump(&mut self, mut body: ByteStream) {
        let controller = self.controller.clone();
        let stream_error = Arc::clone(&self.stream_error);
        self.pump = Some(tokio::spawn(async move {
            while let Some(next) = body.next().await {
                match next {
                    Ok(chunk) => {
                        controller.add_chunk(chunk);
                    }
                    Err(e) if e.is_abort() => return,
                    Err(e) => {
                        tracing::warn!(error = %e, "Audio stream failed");
                        *stream_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(e);
                        break;
                    }
                }
            }
            controller.finish();
        }));
    }

    fn record_stream_error(&self, error: ClientError) {
        *self
            .stream_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    fn stop_pump(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.stop_pump();
        self.prefetch.reset_prefetch();
        self.controller.cleanup();
    }
}
