//! Text segments and per-segment synthesis results.

use bytes::Bytes;

/// An ordered slice of the source text, small enough for one provider request.
///
/// Segments are produced by the synthesis engine's splitter and are never
/// empty. `index` is the segment's position in the output stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSegment {
    /// Zero-based position in the output order.
    pub index: usize,
    /// The text to synthesize.
    pub text: String,
}

impl TextSegment {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Length in characters (not bytes).
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Terminal outcome of synthesizing one segment.
///
/// `audio == None` means the segment failed permanently (after retries, or
/// because the provider rejected it). Playback skips such segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisResult {
    pub index: usize,
    pub audio: Option<Bytes>,
}

impl SynthesisResult {
    pub const fn success(index: usize, audio: Bytes) -> Self {
        Self {
            index,
            audio: Some(audio),
        }
    }

    pub const fn failed(index: usize) -> Self {
        Self { index, audio: None }
    }

    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.audio.is_none()
    }
}
