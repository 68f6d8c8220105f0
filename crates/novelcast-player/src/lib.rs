//! Progressive playback client for novelcast.
//!
//! Consumes the stream transport the way the browser client does:
//!
//! - [`buffer`]: accumulates a chapter's audio and decides when the media
//!   element gets a new playable snapshot
//! - [`prefetch`]: downloads the next chapter in the background and hands
//!   the live read over on chapter end
//! - [`session`]: ties both to the convert endpoint and the settings store
//! - [`client`]: reqwest client for `/api/tts/convert` and `/api/tts/voices`
//! - [`media`]: the media element port plus a headless clock-driven element

#![deny(unused_crate_dependencies)]

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;

pub mod buffer;
pub mod client;
pub mod media;
pub mod prefetch;
pub mod session;

pub use buffer::{BufferConfig, BufferController, PlaybackState};
pub use client::{ByteStream, ClientError, ConvertApi, ConvertRequest, OpenedStream, TtsClient};
pub use media::{ClockMedia, DEFAULT_BITRATE_BPS, MediaElement, MediaError, PlayableSource};
pub use prefetch::{PrefetchCoordinator, PrefetchedData};
pub use session::{ChapterEnd, FinishedChapter, PlaybackSession, SessionConfig};
