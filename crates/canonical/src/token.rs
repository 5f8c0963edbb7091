use serde::{Deserialize, Serialize};

/// A normalized word with the UTF-8 byte offsets it was read from.
///
/// `text` is the case-folded, punctuation-free form used for comparison.
/// `start`/`end` index the *raw* input, so any span built from tokens can be
/// highlighted in the text the student actually submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    /// Normalized word text.
    pub text: String,
    /// Byte offset (inclusive) in the raw text.
    pub start: usize,
    /// Byte offset (exclusive) in the raw text.
    pub end: usize,
}

impl Token {
    /// Number of characters in the normalized word.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        self.text.as_str()
    }
}

/// A sentence, expressed as a half-open range of word indices.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sentence {
    /// Index of the first word (inclusive).
    pub start: usize,
    /// Index one past the last word (exclusive).
    pub end: usize,
}

impl Sentence {
    /// Number of words in the sentence.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Whether the sentence holds no words. Normalized documents never contain
    /// empty sentences; this exists for completeness of the range API.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The word index range.
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}
