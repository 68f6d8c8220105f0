//! Media element port.
//!
//! The buffer controller never decodes audio itself. It hands immutable
//! [`PlayableSource`] snapshots to a [`MediaElement`], which owns decoding,
//! output and the playback clock.

mod clock;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use thiserror::Error;

pub use clock::{ClockMedia, DEFAULT_BITRATE_BPS};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    #[error("No source loaded")]
    NoSource,

    #[error("Playback refused: {0}")]
    Refused(String),
}

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

/// Immutable snapshot of audio bytes handed to a media element.
///
/// Clones share one release flag; once the controller has replaced a source
/// it releases the old one so the element can drop whatever it derived from
/// it.
#[derive(Debug, Clone)]
pub struct PlayableSource {
    id: u64,
    bytes: Bytes,
    released: Arc<AtomicBool>,
}

impl PlayableSource {
    pub fn new(bytes: Bytes) -> Self {
        Self {
            id: NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed),
            bytes,
            released: Arc::new(AtomicBool::new(false)),
        }
    }

    pub const fn id(&self) -> u64 {
        self.id
    }

    pub const fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn release(&self) {
        self.released.store(true, Ordering::Release);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

/// Something that can play a [`PlayableSource`].
///
/// Loading a source resets the position to zero and pauses, like assigning
/// a new `src` to an HTML audio element.
pub trait MediaElement: Send {
    fn load(&mut self, source: PlayableSource);

    fn unload(&mut self);

    fn play(&mut self) -> Result<(), MediaError>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    fn position(&self) -> Duration;

    fn seek(&mut self, position: Duration);

    /// Duration of the loaded source, if known.
    fn duration(&self) -> Option<Duration>;
}
