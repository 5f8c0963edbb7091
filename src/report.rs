//! Report assembly and invariant checks.

use analysis::AnalysisResult;
use matcher::MatchedSource;
use patterns::SuspiciousPattern;
use serde::{Deserialize, Serialize};

use crate::job::JobStatus;

/// The full report for one submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlagiarismResult {
    pub submission_id: String,
    /// Highest reported source similarity, 0 when nothing was reported.
    pub similarity_score: f64,
    /// Descending similarity, ties by ascending source id.
    pub matched_sources: Vec<MatchedSource>,
    pub suspicious_patterns: Vec<SuspiciousPattern>,
    pub analysis_results: AnalysisResult,
    pub status: JobStatus,
}

/// Combine stage outputs into a report.
pub fn assemble(
    submission_id: &str,
    matched_sources: Vec<MatchedSource>,
    suspicious_patterns: Vec<SuspiciousPattern>,
    analysis_results: AnalysisResult,
) -> PlagiarismResult {
    PlagiarismResult {
        submission_id: submission_id.to_string(),
        similarity_score: matcher::overall_score(&matched_sources),
        matched_sources,
        suspicious_patterns,
        analysis_results,
        status: JobStatus::Completed,
    }
}

impl PlagiarismResult {
    /// Check the report against the raw text it describes.
    ///
    /// Returns a description of the first broken invariant.
    pub fn validate(&self, text: &str) -> Result<(), String> {
        if !(0.0..=100.0).contains(&self.similarity_score) {
            return Err(format!("similarity score {} out of range", self.similarity_score));
        }

        let mut max = 0.0f64;
        for (i, source) in self.matched_sources.iter().enumerate() {
            if !(0.0..=100.0).contains(&source.similarity) {
                return Err(format!(
                    "source {} similarity {} out of range",
                    source.source_id, source.similarity
                ));
            }
            if source.source_id == self.submission_id {
                return Err("submission matched against itself".into());
            }
            if let Some(prev) = i.checked_sub(1).map(|p| &self.matched_sources[p]) {
                let ordered = prev.similarity > source.similarity
                    || (prev.similarity == source.similarity && prev.source_id < source.source_id);
                if !ordered {
                    return Err(format!(
                        "sources {} and {} out of order",
                        prev.source_id, source.source_id
                    ));
                }
            }
            if let (Some(start), Some(end)) = (source.start_index, source.end_index) {
                check_span(text, start, end, &source.matched_text)
                    .map_err(|e| format!("source {}: {e}", source.source_id))?;
            }
            max = max.max(source.similarity);
        }
        if self.similarity_score != max {
            return Err(format!(
                "similarity score {} differs from best source {max}",
                self.similarity_score
            ));
        }

        for pattern in &self.suspicious_patterns {
            if !(0.0..=1.0).contains(&pattern.confidence) {
                return Err(format!(
                    "{} pattern confidence {} out of range",
                    pattern.kind, pattern.confidence
                ));
            }
            check_span(text, pattern.start_index, pattern.end_index, &pattern.text_segment)
                .map_err(|e| format!("{} pattern: {e}", pattern.kind))?;
        }

        let metrics = &self.analysis_results;
        if !(0.0..=1.0).contains(&metrics.lexical_diversity) {
            return Err(format!("lexical diversity {} out of range", metrics.lexical_diversity));
        }
        if !(0.0..=100.0).contains(&metrics.readability_score) {
            return Err(format!("readability {} out of range", metrics.readability_score));
        }
        if metrics.unique_words > metrics.word_count {
            return Err("more unique words than words".into());
        }
        Ok(())
    }
}

fn check_span(text: &str, start: usize, end: usize, expected: &str) -> Result<(), String> {
    if start > end || end > text.len() {
        return Err(format!("span {start}..{end} outside text of {} bytes", text.len()));
    }
    match text.get(start..end) {
        Some(segment) if segment == expected => Ok(()),
        Some(_) => Err(format!("span {start}..{end} does not match its text")),
        None => Err(format!("span {start}..{end} splits a character")),
    }
}
