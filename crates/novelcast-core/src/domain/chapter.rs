//! Chapter references and the navigation metadata carried next to the audio.
//!
//! The stream transport cannot put navigation into the audio body, so it is
//! sent as three response headers. Each header value is the URL-encoded JSON
//! of a [`ChapterRef`], or the empty string when there is no such chapter.

use serde::{Deserialize, Serialize};

/// Header carrying the chapter being streamed.
pub const CURRENT_CHAPTER_HEADER: &str = "x-current-chapter";

/// Header carrying the chapter after the one being streamed.
pub const NEXT_CHAPTER_HEADER: &str = "x-next-chapter";

/// Header carrying the chapter before the one being streamed.
pub const PREV_CHAPTER_HEADER: &str = "x-prev-chapter";

/// Reference to a chapter as found on the source page.
///
/// A `None` url means the chapter does not exist (start or end of story).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterRef {
    pub url: Option<String>,
    pub title: Option<String>,
}

impl ChapterRef {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            title: Some(title.into()),
        }
    }

    /// Whether this reference points at an actual chapter.
    #[must_use]
    pub fn has_url(&self) -> bool {
        self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}

/// Output of the content resolver for one chapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryContent {
    pub content: String,
    pub current_chapter: ChapterRef,
    pub next_chapter: ChapterRef,
    pub prev_chapter: ChapterRef,
}

impl StoryContent {
    /// Navigation metadata for the response headers.
    #[must_use]
    pub fn navigation(&self) -> ChapterNavigation {
        let current = &self.current_chapter;
        ChapterNavigation {
            current: (current.has_url() || current.title.is_some()).then(|| current.clone()),
            next: self.next_chapter.has_url().then(|| self.next_chapter.clone()),
            prev: self.prev_chapter.has_url().then(|| self.prev_chapter.clone()),
        }
    }
}

/// Decoded navigation headers of one stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterNavigation {
    pub current: Option<ChapterRef>,
    pub next: Option<ChapterRef>,
    pub prev: Option<ChapterRef>,
}

impl ChapterNavigation {
    /// Header name/value pairs, in current/next/prev order.
    #[must_use]
    pub fn to_headers(&self) -> [(&'static str, String); 3] {
        [
            (CURRENT_CHAPTER_HEADER, encode_chapter(self.current.as_ref())),
            (NEXT_CHAPTER_HEADER, encode_chapter(self.next.as_ref())),
            (PREV_CHAPTER_HEADER, encode_chapter(self.prev.as_ref())),
        ]
    }

    /// Rebuild navigation from header values looked up by name.
    pub fn from_headers<'a>(lookup: impl Fn(&str) -> Option<&'a str>) -> Self {
        let read = |name: &str| lookup(name).and_then(decode_chapter);
        Self {
            current: read(CURRENT_CHAPTER_HEADER),
            next: read(NEXT_CHAPTER_HEADER),
            prev: read(PREV_CHAPTER_HEADER),
        }
    }

    /// The next chapter, if it has a URL to fetch.
    #[must_use]
    pub fn next_chapter(&self) -> Option<&ChapterRef> {
        self.next.as_ref().filter(|c| c.has_url())
    }
}

/// Encode a chapter as URL-encoded JSON, or `""` when absent.
#[must_use]
pub fn encode_chapter(chapter: Option<&ChapterRef>) -> String {
    let Some(chapter) = chapter else {
        return String::new();
    };
    match serde_json::to_string(chapter) {
        Ok(json) => urlencoding::encode(&json).into_owned(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode chapter reference");
            String::new()
        }
    }
}

/// Decode a header value produced by [`encode_chapter`].
///
/// Empty or malformed values decode to `None`.
#[must_use]
pub fn decode_chapter(raw: &str) -> Option<ChapterRef> {
    if raw.is_empty() {
        return None;
    }
    let json = match urlencoding::decode(raw) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!(error = %e, "Chapter header is not valid percent-encoding");
            return None;
        }
    };
    match serde_json::from_str(&json) {
        Ok(chapter) => Some(chapter),
        Err(e) => {
            tracing::warn!(error = %e, "Chapter header is not a chapter reference");
            None
        }
    }
}
