//! Corpus entry and scope types.

use canonical::NormalizedDoc;
use chrono::{DateTime, Utc};
use perceptual::Sketch;
use serde::{Deserialize, Serialize};

/// Bump this value whenever the stored `CorpusEntry` layout changes.
pub const CORPUS_SCHEMA_VERSION: u16 = 1;

const fn default_schema_version() -> u16 {
    CORPUS_SCHEMA_VERSION
}

/// Course and assignment a submission belongs to.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub course_id: String,
    pub assignment_id: String,
}

impl Scope {
    pub fn new(course_id: impl Into<String>, assignment_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            assignment_id: assignment_id.into(),
        }
    }
}

/// Which submissions a check is compared against.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CorpusScope {
    /// Other submissions to the same assignment.
    #[default]
    Assignment,
    /// Every submission in the same course.
    Course,
    /// The whole corpus.
    Global,
}

impl CorpusScope {
    /// Partition key used for postings and vocabulary statistics.
    ///
    /// The course id is length-prefixed in assignment keys, so ids containing
    /// `/` cannot make two different scopes share a key.
    pub fn key(&self, scope: &Scope) -> String {
        match self {
            CorpusScope::Assignment => format!(
                "assignment:{}:{}/{}",
                scope.course_id.len(),
                scope.course_id,
                scope.assignment_id
            ),
            CorpusScope::Course => format!("course:{}", scope.course_id),
            CorpusScope::Global => "global".to_string(),
        }
    }
}

/// Who submitted a source and when, as shown in match reports.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SourceMetadata {
    pub student_id: String,
    pub course_id: String,
    pub assignment_id: String,
    pub submitted_at: DateTime<Utc>,
}

/// A completed submission as stored in the corpus.
///
/// Immutable once written; a changed `content_hash` replaces it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorpusEntry {
    #[serde(default = "default_schema_version")]
    pub schema_version: u16,
    pub submission_id: String,
    pub scope_key: String,
    /// Normalized words with byte offsets, plus the raw text they index.
    pub doc: NormalizedDoc,
    pub sketch: Sketch,
    pub source: SourceMetadata,
}

impl CorpusEntry {
    pub fn new(
        submission_id: impl Into<String>,
        scope_key: impl Into<String>,
        doc: NormalizedDoc,
        sketch: Sketch,
        source: SourceMetadata,
    ) -> Self {
        Self {
            schema_version: CORPUS_SCHEMA_VERSION,
            submission_id: submission_id.into(),
            scope_key: scope_key.into(),
            doc,
            sketch,
            source,
        }
    }

    /// SHA-256 hex of the normalized word sequence.
    pub fn content_hash(&self) -> &str {
        &self.doc.content_hash
    }

    /// Distinct normalized words, sorted.
    pub fn vocabulary(&self) -> Vec<String> {
        let mut words: Vec<String> = self.doc.words.iter().map(|w| w.text.clone()).collect();
        words.sort_unstable();
        words.dedup();
        words
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_keys_follow_granularity() {
        let scope = Scope::new("cs101", "essay-1");
        assert_eq!(CorpusScope::Assignment.key(&scope), "assignment:5:cs101/essay-1");
        assert_eq!(CorpusScope::Course.key(&scope), "course:cs101");
        assert_eq!(CorpusScope::Global.key(&scope), "global");
    }

    #[test]
    fn slashes_in_ids_do_not_merge_scopes() {
        let left = Scope::new("bio/101", "essay");
        let right = Scope::new("bio", "101/essay");
        assert_ne!(
            CorpusScope::Assignment.key(&left),
            CorpusScope::Assignment.key(&right)
        );
        assert_ne!(CorpusScope::Course.key(&left), CorpusScope::Course.key(&right));
    }

    #[test]
    fn corpus_scope_parses_lowercase() {
        let scope: CorpusScope = serde_json::from_str("\"course\"").expect("parse");
        assert_eq!(scope, CorpusScope::Course);
        assert_eq!(CorpusScope::default(), CorpusScope::Assignment);
    }

    #[test]
    fn source_metadata_is_camel_case() {
        let meta = SourceMetadata {
            student_id: "s1".into(),
            course_id: "c1".into(),
            assignment_id: "a1".into(),
            submitted_at: DateTime::<Utc>::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&meta).expect("serialize");
        assert_eq!(json["studentId"], "s1");
        assert!(json.get("submittedAt").is_some());
    }
}
