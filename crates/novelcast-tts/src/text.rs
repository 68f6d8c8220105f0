//! Text normalization and segmentation.
//!
//! All length limits are in characters, not bytes: Vietnamese text is mostly
//! multi-byte UTF-8 and the provider limit is on characters.

use novelcast_core::TextSegment;

/// Characters that end a sentence when followed by whitespace.
const SENTENCE_TERMINATORS: [char; 4] = ['.', '!', '?', '…'];

/// Collapse every whitespace run to a single space and trim the ends.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split text into ordered segments of at most `max_chars` characters.
///
/// Sentences are packed greedily; a sentence over the limit is split at
/// word boundaries, and a single word over the limit is hard-sliced.
/// Joining the segments with single spaces gives back the normalized text,
/// except inside hard-sliced words.
#[must_use]
pub fn split_into_segments(text: &str, max_chars: usize) -> Vec<TextSegment> {
    let max_chars = max_chars.max(1);
    let text = normalize_whitespace(text);
    if text.is_empty() {
        return Vec::new();
    }

    let mut pieces: Vec<String> = Vec::new();
    let mut current = Packer::new(max_chars);

    for sentence in split_sentences(&text) {
        if char_len(sentence) > max_chars {
            current.flush_into(&mut pieces);
            pieces.extend(split_long_sentence(sentence, max_chars));
            continue;
        }
        if !current.fits(sentence) {
            current.flush_into(&mut pieces);
        }
        current.push(sentence);
    }
    current.flush_into(&mut pieces);

    pieces
        .into_iter()
        .enumerate()
        .map(|(index, text)| TextSegment::new(index, text))
        .collect()
}

// ── Internal helpers ───────────────────────────────────────────────

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Greedy space-joined accumulator with a character budget.
struct Packer {
    buf: String,
    chars: usize,
    max: usize,
}

impl Packer {
    const fn new(max: usize) -> Self {
        Self {
            buf: String::new(),
            chars: 0,
            max,
        }
    }

    fn fits(&self, piece: &str) -> bool {
        let sep = usize::from(self.chars > 0);
        self.chars + sep + char_len(piece) <= self.max
    }

    fn push(&mut self, piece: &str) {
        if self.chars > 0 {
            self.buf.push(' ');
            self.chars += 1;
        }
        self.buf.push_str(piece);
        self.chars += char_len(piece);
    }

    fn flush_into(&mut self, out: &mut Vec<String>) {
        if self.chars > 0 {
            out.push(std::mem::take(&mut self.buf));
            self.chars = 0;
        }
    }
}

/// Split normalized text into sentences, keeping terminators attached.
///
/// A sentence ends after a run of terminators that is followed by a space.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if !SENTENCE_TERMINATORS.contains(&c) {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next == ' ' {
                sentences.push(&text[start..next_idx]);
                start = next_idx + 1;
                chars.next();
            }
        }
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }
    sentences
}

/// Pack the words of an over-long sentence; hard-slice over-long words.
fn split_long_sentence(sentence: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = Packer::new(max_chars);

    for word in sentence.split(' ').filter(|w| !w.is_empty()) {
        if char_len(word) > max_chars {
            current.flush_into(&mut out);
            out.extend(hard_split(word, max_chars));
            continue;
        }
        if !current.fits(word) {
            current.flush_into(&mut out);
        }
        current.push(word);
    }
    current.flush_into(&mut out);
    out
}

fn hard_split(word: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}
