//! Normalizer for the plagiarism engine.
//!
//! Turns a raw submission into a deterministic sequence of normalized words,
//! grouped into sentences. Every later stage (shingling, scoring, pattern
//! detection, metrics) works on this representation.
//!
//! ## What we do
//!
//! - Unicode NFKC normalization per grapheme cluster (configurable)
//! - Locale-free lowercasing
//! - Punctuation and whitespace stripped; words are runs of alphanumerics
//! - Sentences split on `.`, `!` and `?`
//! - Each word keeps the byte offsets it occupies in the *raw* text
//! - A versioned content hash identifies the normalized form
//!
//! ## Pure function guarantee
//!
//! No I/O, no clock calls, no locale dependence, no failure mode. Empty or
//! whitespace-only input yields an empty document; callers short-circuit on
//! [`NormalizedDoc::is_empty`].
//!
//! ```rust
//! use canonical::normalize;
//!
//! let doc = normalize("The quick brown fox jumps over the lazy dog.");
//! assert_eq!(doc.word_count(), 9);
//! assert_eq!(doc.sentence_count(), 1);
//! assert_eq!(normalize(&doc.render()).word_texts(), doc.word_texts());
//! ```

mod config;
mod document;
mod error;
mod hash;
mod pipeline;
mod token;

pub use crate::config::NormalizeConfig;
pub use crate::document::NormalizedDoc;
pub use crate::error::CanonicalError;
pub use crate::hash::{hash_canonical_bytes, hash_text};
pub use crate::pipeline::{normalize, normalize_with_config};
pub use crate::token::{Sentence, Token};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_serialize() {
        let doc = normalize("Short text. Two sentences!");
        let json = serde_json::to_string(&doc).expect("serialize");
        let back: NormalizedDoc = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(doc, back);
    }

    #[test]
    fn offsets_stay_within_text() {
        let input = "  a\u{10348}b  c. d\u{00E9}j\u{00E0} vu!  ";
        let doc = normalize(input);
        for word in &doc.words {
            assert!(word.start < word.end);
            assert!(word.end <= input.len());
            assert!(input.is_char_boundary(word.start));
            assert!(input.is_char_boundary(word.end));
        }
        assert_eq!(doc.word_texts(), vec!["a\u{10348}b", "c", "d\u{00E9}j\u{00E0}", "vu"]);
    }
}
