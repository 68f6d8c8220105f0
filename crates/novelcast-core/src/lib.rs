//! Core domain types and port definitions for novelcast.
//!
//! This crate has no knowledge of HTTP servers, HTTP clients or audio
//! devices. It defines the vocabulary shared by the synthesis engine, the
//! stream transport and the playback client:
//!
//! - [`domain`]: text segments, synthesis results, chapters and voices
//! - [`ports`]: the speech provider and content resolver capabilities
//! - [`settings`]: the serializable voice/rate settings record and its store

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    CURRENT_CHAPTER_HEADER, ChapterNavigation, ChapterRef, NEXT_CHAPTER_HEADER,
    PREV_CHAPTER_HEADER, StoryContent, SynthesisResult, TextSegment, Voice, VoiceOptions,
    decode_chapter, encode_chapter, filter_by_locale,
};
pub use ports::{ContentResolver, ResolveError, ResolverRegistry, SpeechError, SpeechProvider};
pub use settings::{
    SETTINGS_KEY, SettingsError, SettingsStore, TtsSettings, load_settings, save_settings,
    validate_settings,
};

// Silence unused dev-dependency warnings for tests that only need the runtime
#[cfg(test)]
use tokio_test as _;
