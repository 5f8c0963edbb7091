//! # Metrics Calculator
//!
//! Objective, deterministic text metrics for a normalized submission: counts,
//! averages, lexical diversity and Flesch Reading Ease. Every value except
//! `processed_at` is a pure function of the document; floats are rounded to
//! two decimals.
//!
//! ```
//! let doc = canonical::normalize("The quick brown fox jumps over the lazy dog.");
//! let metrics = analysis::analyze(&doc);
//! assert_eq!(metrics.word_count, 9);
//! assert_eq!(metrics.sentence_count, 1);
//! assert_eq!(metrics.unique_words, 8);
//! ```

mod syllables;

use canonical::NormalizedDoc;
use chrono::{DateTime, Utc};
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

pub use syllables::count_syllables;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Characters in the raw text.
    pub text_length: usize,
    pub word_count: usize,
    pub unique_words: usize,
    /// Mean characters per normalized word.
    pub average_word_length: f64,
    pub sentence_count: usize,
    /// Mean words per sentence.
    pub average_sentence_length: f64,
    /// Flesch Reading Ease clamped to `[0, 100]`.
    pub readability_score: f64,
    /// Unique words over total words, in `[0, 1]`.
    pub lexical_diversity: f64,
    pub processed_at: DateTime<Utc>,
}

/// Compute metrics for `doc`. An empty document yields zeros throughout.
pub fn analyze(doc: &NormalizedDoc) -> AnalysisResult {
    let text_length = doc.text.chars().count();
    let word_count = doc.word_count();
    let sentence_count = doc.sentence_count();

    if word_count == 0 {
        return AnalysisResult {
            text_length,
            word_count: 0,
            unique_words: 0,
            average_word_length: 0.0,
            sentence_count,
            average_sentence_length: 0.0,
            readability_score: 0.0,
            lexical_diversity: 0.0,
            processed_at: Utc::now(),
        };
    }

    let unique_words = doc
        .words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<HashSet<_>>()
        .len();
    let total_chars: usize = doc.words.iter().map(|w| w.char_len()).sum();
    let syllables: usize = doc.words.iter().map(|w| count_syllables(&w.text)).sum();

    let words = word_count as f64;
    let sentences = sentence_count.max(1) as f64;

    AnalysisResult {
        text_length,
        word_count,
        unique_words,
        average_word_length: round2(total_chars as f64 / words),
        sentence_count,
        average_sentence_length: round2(words / sentences),
        readability_score: round2(flesch_reading_ease(words, sentences, syllables as f64)),
        lexical_diversity: round2(unique_words as f64 / words),
        processed_at: Utc::now(),
    }
}

/// `206.835 − 1.015·(words/sentences) − 84.6·(syllables/words)`, clamped.
pub fn flesch_reading_ease(words: f64, sentences: f64, syllables: f64) -> f64 {
    if words <= 0.0 || sentences <= 0.0 {
        return 0.0;
    }
    (206.835 - 1.015 * (words / sentences) - 84.6 * (syllables / words)).clamp(0.0, 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
