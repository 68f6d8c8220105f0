//! Domain types shared across the workspace.

mod chapter;
mod segment;
mod voice;

pub use chapter::{
    CURRENT_CHAPTER_HEADER, ChapterNavigation, ChapterRef, NEXT_CHAPTER_HEADER,
    PREV_CHAPTER_HEADER, StoryContent, decode_chapter, encode_chapter,
};
pub use segment::{SynthesisResult, TextSegment};
pub use voice::{Voice, VoiceOptions, filter_by_locale};
