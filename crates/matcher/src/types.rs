use index::SourceMetadata;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scoring policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum similarity percentage for a candidate to be reported.
    pub report_threshold: f64,
    /// Maximum number of sources kept after sorting.
    pub max_sources: usize,
}

impl MatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_report_threshold(mut self, report_threshold: f64) -> Self {
        self.report_threshold = report_threshold;
        self
    }

    pub fn with_max_sources(mut self, max_sources: usize) -> Self {
        self.max_sources = max_sources;
        self
    }

    pub fn validate(&self) -> Result<(), MatchError> {
        if !(0.0..=100.0).contains(&self.report_threshold) {
            return Err(MatchError::InvalidConfig(format!(
                "report_threshold must be within 0..=100 (got {})",
                self.report_threshold
            )));
        }
        if self.max_sources == 0 {
            return Err(MatchError::InvalidConfig(
                "max_sources must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            report_threshold: 15.0,
            max_sources: 20,
        }
    }
}

/// A corpus submission similar enough to the target to be reported.
///
/// Offsets are byte offsets into the raw text of the respective document;
/// they are absent when the two documents share no contiguous word run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchedSource {
    pub source_id: String,
    /// Similarity percentage in `[0, 100]`, two decimals.
    pub similarity: f64,
    /// Target text covered by the longest common run.
    pub matched_text: String,
    /// Source text covered by the same run.
    pub source_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_start_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_end_index: Option<usize>,
    pub source: SourceMetadata,
}

/// Errors produced by the scoring layer.
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("invalid match config: {0}")]
    InvalidConfig(String),
}
