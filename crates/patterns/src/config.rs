use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PatternKind;

/// Thresholds and switches for every detector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PatternConfig {
    /// Detectors to run. Results always come back in [`PatternKind::ALL`] order.
    pub enabled: Vec<PatternKind>,

    /// Sentences shorter than this are ignored by the repetition detector.
    pub min_sentence_words: usize,
    /// Order-aware similarity from which two sentences count as repeated.
    pub repetition_threshold: f64,
    /// Cap on sentences compared pairwise.
    pub max_sentences_compared: usize,

    /// Scope size below which vocabulary rarity is not judged.
    pub min_corpus_documents: usize,
    /// A word is rare when `df / N` is below this fraction.
    pub rarity_threshold: f64,
    /// Shorter words are never rare.
    pub min_rare_word_len: usize,
    /// Rare words a sentence must contain to be flagged.
    pub min_rare_cluster: usize,
    /// Fraction of a sentence's words that must be rare.
    pub min_rare_density: f64,

    /// Number of preceding sentences forming the style baseline.
    pub style_window: usize,
    /// Sentence-length z-score from which a sentence is flagged.
    pub style_z_threshold: f64,

    /// Phrase list; `None` uses the built-in list of stock phrases.
    pub common_phrases: Option<Vec<String>>,
    pub common_phrase_confidence: f64,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            enabled: PatternKind::ALL.to_vec(),
            min_sentence_words: 3,
            repetition_threshold: 0.8,
            max_sentences_compared: 400,
            min_corpus_documents: 5,
            rarity_threshold: 0.05,
            min_rare_word_len: 4,
            min_rare_cluster: 2,
            min_rare_density: 0.25,
            style_window: 5,
            style_z_threshold: 2.5,
            common_phrases: None,
            common_phrase_confidence: 0.9,
        }
    }
}

impl PatternConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run only the given detectors.
    pub fn with_enabled(mut self, kinds: &[PatternKind]) -> Self {
        self.enabled = kinds.to_vec();
        self
    }

    pub fn with_repetition_threshold(mut self, threshold: f64) -> Self {
        self.repetition_threshold = threshold;
        self
    }

    pub fn with_rarity_threshold(mut self, threshold: f64) -> Self {
        self.rarity_threshold = threshold;
        self
    }

    pub fn with_style_z_threshold(mut self, threshold: f64) -> Self {
        self.style_z_threshold = threshold;
        self
    }

    pub fn with_common_phrases<S: Into<String>>(
        mut self,
        phrases: impl IntoIterator<Item = S>,
    ) -> Self {
        self.common_phrases = Some(phrases.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_enabled(&self, kind: PatternKind) -> bool {
        self.enabled.contains(&kind)
    }

    pub fn validate(&self) -> Result<(), PatternError> {
        fn fraction(name: &str, value: f64) -> Result<(), PatternError> {
            if value > 0.0 && value <= 1.0 {
                Ok(())
            } else {
                Err(PatternError::InvalidConfig(format!(
                    "{name} must be within (0, 1] (got {value})"
                )))
            }
        }

        fraction("repetition_threshold", self.repetition_threshold)?;
        fraction("rarity_threshold", self.rarity_threshold)?;
        fraction("min_rare_density", self.min_rare_density)?;
        fraction("common_phrase_confidence", self.common_phrase_confidence)?;
        if self.min_sentence_words == 0 {
            return Err(PatternError::InvalidConfig(
                "min_sentence_words must be >= 1".into(),
            ));
        }
        if self.style_window == 0 {
            return Err(PatternError::InvalidConfig(
                "style_window must be >= 1".into(),
            ));
        }
        if self.style_z_threshold <= 0.0 {
            return Err(PatternError::InvalidConfig(format!(
                "style_z_threshold must be > 0 (got {})",
                self.style_z_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatternError {
    #[error("invalid pattern config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = PatternConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.enabled, PatternKind::ALL.to_vec());
        assert_eq!(cfg.repetition_threshold, 0.8);
        assert!(cfg.common_phrases.is_none());
    }

    #[test]
    fn out_of_range_values_rejected() {
        let cfg = PatternConfig::new().with_repetition_threshold(0.0);
        assert!(matches!(cfg.validate(), Err(PatternError::InvalidConfig(m)) if m.contains("repetition")));

        let cfg = PatternConfig::new().with_style_z_threshold(-1.0);
        assert!(cfg.validate().is_err());

        let cfg = PatternConfig {
            style_window: 0,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn enabled_kinds_parse_from_kebab_case() {
        let cfg: PatternConfig =
            serde_json::from_str(r#"{"enabled": ["common-phrases", "inconsistent-style"]}"#)
                .expect("parse");
        assert!(cfg.is_enabled(PatternKind::CommonPhrases));
        assert!(!cfg.is_enabled(PatternKind::RepetitiveStructure));
        assert_eq!(cfg.min_corpus_documents, 5);
    }
}
