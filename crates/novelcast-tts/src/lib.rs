//! Chunked text-to-speech synthesis for novelcast.
//!
//! The engine turns a long chapter into a single ordered MP3 byte stream:
//!
//! 1. **Segmentation** ([`text`]): normalize whitespace, split at sentence
//!    boundaries and pack sentences into segments that fit one provider
//!    request.
//! 2. **Fan-out** ([`engine`]): synthesize segments with bounded concurrency,
//!    retrying transient provider failures ([`retry`]).
//! 3. **Reordering** ([`reorder`]): completions arrive in any order; audio is
//!    released strictly in segment order, skipping segments that failed.
//! 4. **Backpressure**: output goes through a bounded channel; a slow
//!    consumer stalls synthesis instead of growing memory.
//!
//! Providers plug in through [`novelcast_core::SpeechProvider`];
//! [`providers::GoogleTranslateProvider`] is the bundled implementation.

#![deny(unused_crate_dependencies)]

pub mod engine;
pub mod error;
pub mod providers;
pub mod reorder;
pub mod retry;
pub mod session;
pub mod text;

pub use engine::{AudioStream, EngineConfig, SynthesisEngine};
pub use error::SynthesisError;
pub use providers::GoogleTranslateProvider;
pub use reorder::ReorderBuffer;
pub use retry::{RetryPolicy, synthesize_with_retry};
pub use session::StreamSession;
pub use text::{normalize_whitespace, split_into_segments};

#[cfg(test)]
use tokio_test as _;
