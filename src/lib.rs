//! Plagiarism detection engine.
//!
//! Ties the stage crates together behind an asynchronous job model:
//!
//! 1. [`canonical`] normalizes raw text into words and sentences with byte
//!    offsets;
//! 2. [`perceptual`] turns the words into a MinHash sketch;
//! 3. [`index`] finds corpus candidates through banded LSH;
//! 4. [`matcher`] scores candidates and locates matched spans;
//! 5. [`patterns`] flags suspicious passages;
//! 6. [`analysis`] computes text metrics;
//! 7. the report is assembled, validated and stored on the job, and the
//!    submission joins the corpus.
//!
//! [`PlagiarismEngine::request_check`] is idempotent per submission id: while
//! a check is pending or processing, asking again returns the same job.
//!
//! ```
//! use std::time::Duration;
//! use plagiarism::{CheckRequest, EngineConfig, JobStatus, PlagiarismEngine, Scope};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = PlagiarismEngine::new(EngineConfig::default())?;
//! let request = CheckRequest::new(
//!     "sub-1",
//!     "student-7",
//!     Scope::new("bio-101", "essay-1"),
//!     "The quick brown fox jumps over the lazy dog.",
//! );
//! engine.request_check(request).await?;
//!
//! let check = engine
//!     .wait_for_terminal("sub-1", Duration::from_secs(10))
//!     .await
//!     .expect("job exists");
//! assert_eq!(check.status, JobStatus::Completed);
//! let report = check.result.expect("completed checks carry a result");
//! assert_eq!(report.similarity_score, 0.0);
//! assert_eq!(report.analysis_results.word_count, 9);
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod coordinator;
mod error;
pub mod job;
mod pipeline;
pub mod report;
pub mod retry;
mod store;

use std::sync::Arc;
use std::time::Duration;

use index::CorpusIndex;
use tracing::info;

use crate::coordinator::{AttemptGate, Coordinator};
use crate::pipeline::Pipeline;
use crate::store::JobStore;

pub use crate::config::{ConfigLoadError, EngineConfig, JobsConfig};
pub use crate::error::{CheckError, EngineError, EngineResult};
pub use crate::job::{
    CheckRequest, FailureCode, FailureReason, JobStatus, PlagiarismCheck, ScopeFilter,
};
pub use crate::pipeline::ScopedVocabulary;
pub use crate::report::PlagiarismResult;
pub use crate::retry::RetryPolicy;

pub use analysis::AnalysisResult;
pub use index::{CorpusScope, Scope, SourceMetadata};
pub use matcher::MatchedSource;
pub use patterns::{PatternKind, SuspiciousPattern};

/// One engine owns one corpus, one job table and one worker pool.
pub struct PlagiarismEngine {
    config: Arc<EngineConfig>,
    store: Arc<JobStore>,
    pipeline: Arc<Pipeline>,
    coordinator: Coordinator,
}

impl PlagiarismEngine {
    /// Engine over a fresh in-memory corpus.
    ///
    /// Must be called inside a tokio runtime; the worker pool is spawned on
    /// it.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let index = Arc::new(CorpusIndex::new(config.index.clone())?);
        Self::with_index(config, index)
    }

    /// Engine over an existing corpus. The index keeps its own
    /// configuration; the `index` section of `config` is ignored.
    pub fn with_index(config: EngineConfig, index: Arc<CorpusIndex>) -> EngineResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let store = Arc::new(JobStore::new());
        let pipeline = Arc::new(Pipeline::new(Arc::clone(&config), index));
        let coordinator = Coordinator::start(Arc::clone(&store), Arc::clone(&pipeline), &config.jobs)?;
        info!(
            name = config.name.as_deref().unwrap_or("default"),
            corpus_entries = pipeline.index().len(),
            "plagiarism engine ready"
        );
        Ok(Self {
            config,
            store,
            pipeline,
            coordinator,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<CorpusIndex> {
        self.pipeline.index()
    }

    /// Queue a check, or return the live one for the same submission.
    ///
    /// Completed and failed checks are replaced by a fresh pending attempt.
    pub async fn request_check(&self, request: CheckRequest) -> EngineResult<PlagiarismCheck> {
        request.validate()?;
        self.coordinator.submit(request).await
    }

    pub fn get_result(&self, submission_id: &str) -> Option<PlagiarismCheck> {
        self.store.get(submission_id)
    }

    /// Checks in a course, optionally narrowed to one assignment, sorted by
    /// submission id.
    pub fn list_checks(&self, filter: &ScopeFilter) -> Vec<PlagiarismCheck> {
        self.store.list(filter)
    }

    /// Block until the check is completed or finally failed, or until
    /// `timeout`; returns the record as it stands. `None` for unknown ids.
    pub async fn wait_for_terminal(
        &self,
        submission_id: &str,
        timeout: Duration,
    ) -> Option<PlagiarismCheck> {
        self.store.wait_for_terminal(submission_id, timeout).await
    }

    /// Run every stage for `request` on the calling thread and return the
    /// report. No job is created and the corpus is left unchanged.
    pub fn check_text_now(&self, request: &CheckRequest) -> Result<PlagiarismResult, CheckError> {
        Ok(self.pipeline.analyze(request, &AttemptGate::default())?.result)
    }

    /// Estimated similarity of two texts in percent, without the corpus.
    pub fn compare_texts(&self, a: &str, b: &str) -> Result<f64, CheckError> {
        let sketch = |text: &str| {
            let doc = canonical::normalize_with_config(text, &self.config.canonical);
            perceptual::fingerprint(&doc.word_texts(), &self.config.perceptual)
        };
        Ok(matcher::estimate_similarity(&sketch(a)?, &sketch(b)?))
    }

    /// Stop accepting checks, finish queued ones and join the workers.
    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
        if let Err(err) = self.pipeline.index().flush() {
            tracing::warn!(error = %err, "corpus flush failed at shutdown");
        }
    }
}
