//! Error types for the synthesis engine.

use thiserror::Error;

/// Stream-level synthesis failures.
///
/// Per-segment provider failures never surface here; they are retried and
/// then skipped. Only outcomes that affect the whole stream do.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SynthesisError {
    /// Nothing left to speak after whitespace normalization.
    #[error("No text to synthesize")]
    EmptyInput,

    /// Every segment failed; no audio bytes were emitted.
    #[error("Speech synthesis failed for all {segments} segments")]
    NoAudioProduced { segments: usize },

    #[error("Synthesis timed out")]
    Timeout,
}
