use std::borrow::Cow;

use unicode_categories::UnicodeCategories;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

use crate::config::NormalizeConfig;
use crate::document::NormalizedDoc;
use crate::hash::hash_canonical_bytes;
use crate::token::{Sentence, Token};

/// Normalize raw text with the default configuration.
pub fn normalize(input: &str) -> NormalizedDoc {
    normalize_with_config(input, &NormalizeConfig::default())
}

/// Main entry point. Splits raw text into normalized words and sentences.
///
/// Never fails: empty or whitespace-only input simply yields a document with
/// no words and no sentences.
pub fn normalize_with_config(input: &str, cfg: &NormalizeConfig) -> NormalizedDoc {
    let mut state = TokenizerState::with_capacity(input.len());

    // Work per grapheme cluster so that offsets always land on boundaries a
    // UI can highlight, even for combining sequences and emoji.
    let mut graphemes = input.grapheme_indices(true).peekable();
    while let Some((offset, grapheme)) = graphemes.next() {
        let end = offset + grapheme.len();
        let folded: Cow<str> = if cfg.normalize_unicode {
            Cow::Owned(grapheme.nfkc().collect::<String>())
        } else {
            Cow::Borrowed(grapheme)
        };
        let next_starts_word = graphemes
            .peek()
            .is_some_and(|(_, next)| starts_word(next));

        match classify(&folded) {
            CharClass::Word => state.push_word(&folded, offset, end, cfg.lowercase),
            // "don't" stays one word; a trailing quote does not.
            CharClass::Apostrophe if state.in_word() && next_starts_word => state.extend_word(end),
            // "3.14" and "e.g" split words but not sentences.
            CharClass::Terminator if !next_starts_word => {
                state.close_word();
                state.close_sentence();
            }
            _ => state.close_word(),
        }
    }

    state.finish(input, cfg.version)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Word,
    Apostrophe,
    Terminator,
    Delimiter,
}

fn classify(folded: &str) -> CharClass {
    if folded.chars().any(char::is_alphanumeric) {
        CharClass::Word
    } else if folded == "'" || folded == "\u{2019}" {
        CharClass::Apostrophe
    } else if folded.chars().any(|c| matches!(c, '.' | '!' | '?')) {
        CharClass::Terminator
    } else {
        CharClass::Delimiter
    }
}

fn starts_word(grapheme: &str) -> bool {
    grapheme.chars().next().is_some_and(char::is_alphanumeric)
}

struct TokenizerState {
    words: Vec<Token>,
    sentences: Vec<Sentence>,
    current: Option<Token>,
    sentence_start: usize,
}

impl TokenizerState {
    fn with_capacity(input_len: usize) -> Self {
        Self {
            words: Vec::with_capacity(input_len / 5 + 1),
            sentences: Vec::new(),
            current: None,
            sentence_start: 0,
        }
    }

    fn in_word(&self) -> bool {
        self.current.is_some()
    }

    fn push_word(&mut self, folded: &str, start: usize, end: usize, lowercase: bool) {
        let token = self.current.get_or_insert_with(|| Token {
            text: String::new(),
            start,
            end,
        });
        for ch in folded.chars() {
            // Combining marks survive so that un-normalized accents stay attached.
            if !(ch.is_alphanumeric() || ch.is_mark()) {
                continue;
            }
            if lowercase {
                token.text.extend(ch.to_lowercase());
            } else {
                token.text.push(ch);
            }
        }
        token.end = end;
    }

    fn extend_word(&mut self, end: usize) {
        if let Some(token) = self.current.as_mut() {
            token.end = end;
        }
    }

    fn close_word(&mut self) {
        if let Some(token) = self.current.take() {
            if !token.text.is_empty() {
                self.words.push(token);
            }
        }
    }

    fn close_sentence(&mut self) {
        if self.words.len() > self.sentence_start {
            self.sentences.push(Sentence {
                start: self.sentence_start,
                end: self.words.len(),
            });
            self.sentence_start = self.words.len();
        }
    }

    fn finish(mut self, input: &str, version: u32) -> NormalizedDoc {
        self.close_word();
        self.close_sentence();

        let mut doc = NormalizedDoc {
            text: input.to_string(),
            words: self.words,
            sentences: self.sentences,
            content_hash: String::new(),
            version,
        };
        doc.content_hash = hash_canonical_bytes(version, doc.render().as_bytes());
        doc
    }
}
