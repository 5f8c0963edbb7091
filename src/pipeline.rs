//! The synchronous stage chain run by every attempt.

use std::sync::Arc;

use canonical::NormalizedDoc;
use index::{CorpusEntry, CorpusIndex, IndexOutcome};
use patterns::VocabularyStats;
use perceptual::Sketch;
use tracing::{debug, error};

use crate::config::EngineConfig;
use crate::coordinator::AttemptGate;
use crate::job::CheckRequest;
use crate::report::{self, PlagiarismResult};
use crate::CheckError;

/// Document-frequency view of one corpus partition.
pub struct ScopedVocabulary<'a> {
    index: &'a CorpusIndex,
    scope_key: &'a str,
}

impl<'a> ScopedVocabulary<'a> {
    pub fn new(index: &'a CorpusIndex, scope_key: &'a str) -> Self {
        Self { index, scope_key }
    }
}

impl VocabularyStats for ScopedVocabulary<'_> {
    fn document_count(&self) -> usize {
        self.index.document_count(self.scope_key)
    }

    fn document_frequency(&self, word: &str) -> usize {
        self.index.document_frequency(self.scope_key, word)
    }
}

/// A validated report plus the corpus entry to commit when the job
/// completes.
pub(crate) struct Analyzed {
    pub result: PlagiarismResult,
    pub entry: CorpusEntry,
}

/// Normalize → fingerprint → candidates → score → detect → analyze →
/// assemble, against a shared index.
pub(crate) struct Pipeline {
    config: Arc<EngineConfig>,
    index: Arc<CorpusIndex>,
}

impl Pipeline {
    pub fn new(config: Arc<EngineConfig>, index: Arc<CorpusIndex>) -> Self {
        Self { config, index }
    }

    pub fn index(&self) -> &Arc<CorpusIndex> {
        &self.index
    }

    /// Run every stage for `request`. Nothing is written to the corpus.
    ///
    /// `gate` is checked between stages and between candidate reads; once it
    /// is cancelled the attempt stops with [`CheckError::Cancelled`].
    pub fn analyze(
        &self,
        request: &CheckRequest,
        gate: &AttemptGate,
    ) -> Result<Analyzed, CheckError> {
        let id = request.submission_id.as_str();
        gate.checkpoint()?;
        let doc = canonical::normalize_with_config(&request.text, &self.config.canonical);
        gate.checkpoint()?;
        let sketch = perceptual::fingerprint(&doc.word_texts(), &self.config.perceptual)?;
        let scope_key = self.index.scope_key(&request.scope);
        debug!(
            submission_id = id,
            words = doc.word_count(),
            shingles = sketch.shingle_count,
            scope = %scope_key,
            "fingerprinted submission"
        );

        gate.checkpoint()?;
        let result = self.report(id, &scope_key, &doc, &sketch, gate)?;
        gate.checkpoint()?;
        if let Err(violation) = result.validate(&request.text) {
            error!(submission_id = id, %violation, "report failed validation");
            return Err(CheckError::Invariant(violation));
        }

        let entry = CorpusEntry::new(id, scope_key, doc, sketch, request.source_metadata());
        Ok(Analyzed { result, entry })
    }

    /// Add a completed submission to the corpus.
    pub fn commit(&self, entry: &CorpusEntry) -> Result<IndexOutcome, CheckError> {
        let outcome = self.index.index(entry)?;
        debug!(submission_id = %entry.submission_id, ?outcome, "corpus entry committed");
        Ok(outcome)
    }

    fn report(
        &self,
        id: &str,
        scope_key: &str,
        doc: &NormalizedDoc,
        sketch: &Sketch,
        gate: &AttemptGate,
    ) -> Result<PlagiarismResult, CheckError> {
        let candidates = if sketch.is_empty() {
            Vec::new()
        } else {
            self.index
                .candidate_entries_until(scope_key, sketch, id, || gate.is_cancelled())?
        };
        gate.checkpoint()?;
        let sources = matcher::score(id, doc, sketch, &candidates, &self.config.matcher)?;
        gate.checkpoint()?;

        let vocabulary = ScopedVocabulary::new(&self.index, scope_key);
        let found = patterns::detect(doc, &vocabulary, &self.config.patterns);
        gate.checkpoint()?;
        let metrics = analysis::analyze(doc);

        Ok(report::assemble(id, sources, found, metrics))
    }
}
