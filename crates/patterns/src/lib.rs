//! # Pattern Detector
//!
//! Heuristics that flag passages worth a second look even when no corpus
//! source matches them:
//!
//! - **repetitive-structure**: a sentence that closely repeats an earlier one;
//! - **unusual-vocabulary**: clusters of words rarely used within the scope;
//! - **inconsistent-style**: sentence lengths that break sharply from the
//!   preceding sentences;
//! - **common-phrases**: stock phrases and clichés.
//!
//! [`detect`] runs every enabled detector in [`PatternKind::ALL`] order and
//! concatenates their findings. Every pattern points back into the raw text.
//!
//! ```
//! use patterns::{detect, NoCorpus, PatternConfig, PatternKind};
//!
//! let doc = canonical::normalize(&"The results were clear and convincing. ".repeat(5));
//! let found = detect(&doc, &NoCorpus, &PatternConfig::default());
//! assert!(found.iter().any(|p| p.kind == PatternKind::RepetitiveStructure && p.confidence > 0.5));
//! ```

mod config;
mod phrases;
mod repetition;
mod style;
mod vocabulary;

use std::fmt;

use canonical::NormalizedDoc;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use config::{PatternConfig, PatternError};
pub use phrases::DEFAULT_COMMON_PHRASES;

/// The closed set of heuristics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum PatternKind {
    RepetitiveStructure,
    UnusualVocabulary,
    InconsistentStyle,
    CommonPhrases,
}

impl PatternKind {
    pub const ALL: [PatternKind; 4] = [
        PatternKind::RepetitiveStructure,
        PatternKind::UnusualVocabulary,
        PatternKind::InconsistentStyle,
        PatternKind::CommonPhrases,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::RepetitiveStructure => "repetitive-structure",
            PatternKind::UnusualVocabulary => "unusual-vocabulary",
            PatternKind::InconsistentStyle => "inconsistent-style",
            PatternKind::CommonPhrases => "common-phrases",
        }
    }

    fn run(
        &self,
        doc: &NormalizedDoc,
        stats: &dyn VocabularyStats,
        cfg: &PatternConfig,
    ) -> Vec<SuspiciousPattern> {
        match self {
            PatternKind::RepetitiveStructure => repetition::detect(doc, cfg),
            PatternKind::UnusualVocabulary => vocabulary::detect(doc, stats, cfg),
            PatternKind::InconsistentStyle => style::detect(doc, cfg),
            PatternKind::CommonPhrases => phrases::detect(doc, cfg),
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A flagged passage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SuspiciousPattern {
    #[serde(rename = "type")]
    pub kind: PatternKind,
    /// In `[0, 1]`.
    pub confidence: f64,
    pub description: String,
    /// Raw text between `start_index` and `end_index`.
    pub text_segment: String,
    /// Byte offset into the raw submission text.
    pub start_index: usize,
    pub end_index: usize,
}

/// Document-frequency view of the corpus partition a submission is checked in.
pub trait VocabularyStats {
    /// Number of documents in the partition.
    fn document_count(&self) -> usize;
    /// Number of documents in the partition containing `word`.
    fn document_frequency(&self, word: &str) -> usize;
}

/// Empty corpus: disables vocabulary rarity.
pub struct NoCorpus;

impl VocabularyStats for NoCorpus {
    fn document_count(&self) -> usize {
        0
    }

    fn document_frequency(&self, _word: &str) -> usize {
        0
    }
}

/// Run every enabled detector over `doc`.
pub fn detect(
    doc: &NormalizedDoc,
    stats: &dyn VocabularyStats,
    cfg: &PatternConfig,
) -> Vec<SuspiciousPattern> {
    if doc.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for kind in PatternKind::ALL.iter().filter(|k| cfg.is_enabled(**k)) {
        let found = kind.run(doc, stats, cfg);
        debug!(kind = %kind, found = found.len(), "pattern detector finished");
        out.extend(found);
    }
    out
}

/// Pattern covering words `first..=last` of `doc`.
pub(crate) fn span_pattern(
    doc: &NormalizedDoc,
    kind: PatternKind,
    first: usize,
    last: usize,
    confidence: f64,
    description: String,
) -> Option<SuspiciousPattern> {
    let (start, end) = doc.word_span(first, last)?;
    Some(SuspiciousPattern {
        kind,
        confidence: confidence.clamp(0.0, 1.0),
        description,
        text_segment: doc.segment(start, end).to_string(),
        start_index: start,
        end_index: end,
    })
}
