use std::time::Duration;

use crate::config::ConfigLoadError;
use crate::job::FailureCode;

pub type EngineResult<T> = Result<T, EngineError>;

/// Engine-level faults. A check that fails is reported on its job record,
/// not here.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Job queue is closed")]
    QueueClosed,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigLoadError),

    #[error("Index error: {0}")]
    Index(#[from] index::IndexError),

    #[error("No tokio runtime available to run workers")]
    NoRuntime,
}

/// Why a single attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("Corpus unavailable: {0}")]
    Corpus(#[source] index::IndexError),

    #[error("Fingerprinting failed: {0}")]
    Fingerprint(#[from] perceptual::PerceptualError),

    #[error("Scoring failed: {0}")]
    Scoring(#[from] matcher::MatchError),

    #[error("Report invariant violated: {0}")]
    Invariant(String),

    #[error("Deadline of {0:?} exceeded")]
    Timeout(Duration),

    #[error("Attempt cancelled")]
    Cancelled,

    #[error("Worker failed: {0}")]
    Worker(String),
}

impl From<index::IndexError> for CheckError {
    fn from(err: index::IndexError) -> Self {
        match err {
            index::IndexError::Interrupted => CheckError::Cancelled,
            other => CheckError::Corpus(other),
        }
    }
}

impl CheckError {
    pub fn code(&self) -> FailureCode {
        match self {
            CheckError::Corpus(_) => FailureCode::CorpusUnavailable,
            CheckError::Timeout(_) | CheckError::Cancelled => FailureCode::Timeout,
            CheckError::Fingerprint(_) | CheckError::Scoring(_) | CheckError::Invariant(_) => {
                FailureCode::InvariantViolation
            }
            CheckError::Worker(_) => FailureCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_corpus_errors_are_retryable() {
        let corpus = CheckError::from(index::IndexError::Backend("down".into()));
        assert_eq!(corpus.code(), FailureCode::CorpusUnavailable);
        assert!(corpus.code().is_retryable());

        for err in [
            CheckError::Timeout(Duration::from_secs(1)),
            CheckError::Invariant("x".into()),
            CheckError::Worker("panic".into()),
        ] {
            assert!(!err.code().is_retryable(), "{err} should not retry");
        }
    }

    #[test]
    fn interrupted_candidate_load_is_a_cancellation() {
        let err = CheckError::from(index::IndexError::Interrupted);
        assert!(matches!(err, CheckError::Cancelled));
        assert!(!err.code().is_retryable());
    }

    #[test]
    fn messages_carry_the_cause() {
        let err = CheckError::from(index::IndexError::Backend("disk gone".into()));
        assert!(err.to_string().contains("disk gone"));
        assert_eq!(EngineError::QueueClosed.to_string(), "Job queue is closed");
    }
}
