//! The normalized document produced by [`normalize`](crate::normalize).
//!
//! # Structure
//!
//! ```text
//! NormalizedDoc
//! ├── text: String              # raw input, kept for span extraction
//! ├── words: Vec<Token>         # normalized words with raw byte offsets
//! ├── sentences: Vec<Sentence>  # word index ranges, never empty
//! ├── content_hash: String      # versioned SHA-256 of render()
//! └── version: u32              # normalizer version used
//! ```
//!
//! # Determinism
//!
//! For a fixed normalizer version and input text every field is identical on
//! every machine. Sketches, corpus entries and reports derived from a document
//! inherit that property.

use serde::{Deserialize, Serialize};

use crate::token::{Sentence, Token};

/// A raw submission broken into normalized words and sentences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizedDoc {
    /// The raw text this document was built from.
    pub text: String,
    /// Normalized words in reading order.
    pub words: Vec<Token>,
    /// Sentences as ranges over `words`.
    pub sentences: Vec<Sentence>,
    /// Versioned content hash of the rendered canonical form.
    pub content_hash: String,
    /// Normalizer version that produced this document.
    pub version: u32,
}

impl NormalizedDoc {
    /// True when the input held no words at all.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }

    /// Normalized word texts in order.
    pub fn word_texts(&self) -> Vec<&str> {
        self.words.iter().map(|w| w.text.as_str()).collect()
    }

    /// Words belonging to `sentence`.
    pub fn sentence_words(&self, sentence: &Sentence) -> &[Token] {
        let end = sentence.end.min(self.words.len());
        let start = sentence.start.min(end);
        &self.words[start..end]
    }

    /// Iterate sentences as word slices.
    pub fn sentence_slices(&self) -> impl Iterator<Item = &[Token]> + '_ {
        self.sentences.iter().map(|s| self.sentence_words(s))
    }

    /// Raw byte span covering words `first..=last`.
    ///
    /// Returns `None` for an empty or out-of-range word range.
    pub fn word_span(&self, first: usize, last: usize) -> Option<(usize, usize)> {
        if first > last {
            return None;
        }
        let start = self.words.get(first)?.start;
        let end = self.words.get(last)?.end;
        Some((start, end))
    }

    /// Raw byte span covering a sentence.
    pub fn sentence_span(&self, sentence: &Sentence) -> Option<(usize, usize)> {
        if sentence.is_empty() {
            return None;
        }
        self.word_span(sentence.start, sentence.end - 1)
    }

    /// Slice of the raw text between two byte offsets.
    ///
    /// Offsets always come from tokens, which sit on character boundaries;
    /// anything else yields an empty string instead of panicking.
    pub fn segment(&self, start: usize, end: usize) -> &str {
        self.text.get(start..end).unwrap_or("")
    }

    /// Render the canonical text form: words joined by single spaces, every
    /// sentence closed with a period.
    ///
    /// Feeding the rendered text back through the normalizer yields the same
    /// word sequence and sentence boundaries.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.text.len());
        for sentence in &self.sentences {
            if !out.is_empty() {
                out.push(' ');
            }
            for (i, word) in self.sentence_words(sentence).iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(&word.text);
            }
            out.push('.');
        }
        out
    }
}
