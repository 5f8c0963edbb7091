//! Job records and the requests that create them.

use std::fmt;

use chrono::{DateTime, Utc};
use index::{Scope, SourceMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::report::PlagiarismResult;
use crate::EngineError;

/// Longest accepted submission id, in bytes.
pub const MAX_SUBMISSION_ID_LEN: usize = 256;

/// Lifecycle of a check.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// `pending` or `processing`.
    pub fn is_live(&self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an attempt failed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    /// The corpus could not be read or written.
    CorpusUnavailable,
    /// The job's deadline passed.
    Timeout,
    /// A stage produced output that breaks a report invariant.
    InvariantViolation,
    /// The worker died or the engine shut down under the job.
    Internal,
}

impl FailureCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureCode::CorpusUnavailable => "corpus_unavailable",
            FailureCode::Timeout => "timeout",
            FailureCode::InvariantViolation => "invariant_violation",
            FailureCode::Internal => "internal",
        }
    }

    /// Only corpus failures are transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FailureCode::CorpusUnavailable)
    }
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureReason {
    pub code: FailureCode,
    pub message: String,
}

impl FailureReason {
    pub fn new(code: FailureCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// A submission to check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CheckRequest {
    pub submission_id: String,
    /// Who asked for the check (instructor, student or the system).
    pub requested_by: String,
    /// Author of the submission.
    pub student_id: String,
    pub scope: Scope,
    pub text: String,
    pub submitted_at: DateTime<Utc>,
}

impl CheckRequest {
    /// Request submitted now and requested by its own author.
    pub fn new(
        submission_id: impl Into<String>,
        student_id: impl Into<String>,
        scope: Scope,
        text: impl Into<String>,
    ) -> Self {
        let student_id = student_id.into();
        Self {
            submission_id: submission_id.into(),
            requested_by: student_id.clone(),
            student_id,
            scope,
            text: text.into(),
            submitted_at: Utc::now(),
        }
    }

    pub fn with_requested_by(mut self, requested_by: impl Into<String>) -> Self {
        self.requested_by = requested_by.into();
        self
    }

    pub fn with_submitted_at(mut self, submitted_at: DateTime<Utc>) -> Self {
        self.submitted_at = submitted_at;
        self
    }

    /// Reject ids that cannot key a job. The text itself is never rejected.
    pub fn validate(&self) -> Result<(), EngineError> {
        let id = self.submission_id.as_str();
        if id.trim().is_empty() {
            return Err(EngineError::InvalidRequest(
                "submission id must not be empty".into(),
            ));
        }
        if id.len() > MAX_SUBMISSION_ID_LEN {
            return Err(EngineError::InvalidRequest(format!(
                "submission id longer than {MAX_SUBMISSION_ID_LEN} bytes"
            )));
        }
        if id.chars().any(char::is_control) {
            return Err(EngineError::InvalidRequest(
                "submission id contains control characters".into(),
            ));
        }
        Ok(())
    }

    /// Metadata stored alongside the corpus entry.
    pub fn source_metadata(&self) -> SourceMetadata {
        SourceMetadata {
            student_id: self.student_id.clone(),
            course_id: self.scope.course_id.clone(),
            assignment_id: self.scope.assignment_id.clone(),
            submitted_at: self.submitted_at,
        }
    }
}

/// The job record for one submission.
///
/// `completed` always carries a `result`; `failed` never does and always
/// carries an `error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlagiarismCheck {
    pub submission_id: String,
    /// Identifies the current attempt; a re-run mints a new one.
    pub attempt_id: Uuid,
    pub status: JobStatus,
    pub requested_by: String,
    pub requested_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub deadline: DateTime<Utc>,
    pub retry_count: u32,
    pub scope: Scope,
    pub result: Option<PlagiarismResult>,
    pub error: Option<FailureReason>,
    /// Set while a failed job waits for an automatic retry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_retry_at: Option<DateTime<Utc>>,
}

impl PlagiarismCheck {
    pub(crate) fn pending(request: &CheckRequest, requested_at: DateTime<Utc>, deadline: DateTime<Utc>) -> Self {
        Self {
            submission_id: request.submission_id.clone(),
            attempt_id: Uuid::new_v4(),
            status: JobStatus::Pending,
            requested_by: request.requested_by.clone(),
            requested_at,
            completed_at: None,
            deadline,
            retry_count: 0,
            scope: request.scope.clone(),
            result: None,
            error: None,
            next_retry_at: None,
        }
    }

    /// Completed, or failed with no retry scheduled.
    pub fn is_terminal(&self) -> bool {
        match self.status {
            JobStatus::Completed => true,
            JobStatus::Failed => self.next_retry_at.is_none(),
            JobStatus::Pending | JobStatus::Processing => false,
        }
    }
}

/// Selects checks by course and, optionally, assignment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScopeFilter {
    pub course_id: String,
    #[serde(default)]
    pub assignment_id: Option<String>,
}

impl ScopeFilter {
    pub fn course(course_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            assignment_id: None,
        }
    }

    pub fn assignment(course_id: impl Into<String>, assignment_id: impl Into<String>) -> Self {
        Self {
            course_id: course_id.into(),
            assignment_id: Some(assignment_id.into()),
        }
    }

    pub fn matches(&self, scope: &Scope) -> bool {
        scope.course_id == self.course_id
            && self
                .assignment_id
                .as_ref()
                .is_none_or(|a| *a == scope.assignment_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str) -> CheckRequest {
        CheckRequest::new(id, "s1", Scope::new("c1", "a1"), "text")
    }

    #[test]
    fn request_validation_rejects_bad_ids() {
        assert!(request("sub-1").validate().is_ok());
        assert!(matches!(request("  ").validate(), Err(EngineError::InvalidRequest(_))));
        assert!(request("a\nb").validate().is_err());
        assert!(request(&"x".repeat(MAX_SUBMISSION_ID_LEN + 1)).validate().is_err());
    }

    #[test]
    fn empty_text_is_a_valid_request() {
        let req = CheckRequest::new("sub-1", "s1", Scope::new("c", "a"), "");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn requested_by_defaults_to_author() {
        let req = request("sub-1");
        assert_eq!(req.requested_by, "s1");
        assert_eq!(req.with_requested_by("prof").requested_by, "prof");
    }

    #[test]
    fn terminal_excludes_scheduled_retries() {
        let now = Utc::now();
        let mut check = PlagiarismCheck::pending(&request("sub-1"), now, now);
        assert!(!check.is_terminal());
        check.status = JobStatus::Failed;
        check.next_retry_at = Some(now);
        assert!(!check.is_terminal());
        check.next_retry_at = None;
        assert!(check.is_terminal());
    }

    #[test]
    fn scope_filter_matching() {
        let scope = Scope::new("c1", "a1");
        assert!(ScopeFilter::course("c1").matches(&scope));
        assert!(ScopeFilter::assignment("c1", "a1").matches(&scope));
        assert!(!ScopeFilter::assignment("c1", "a2").matches(&scope));
        assert!(!ScopeFilter::course("c2").matches(&scope));
    }

    #[test]
    fn status_and_codes_serialize_as_wire_names() {
        assert_eq!(serde_json::to_string(&JobStatus::Processing).unwrap(), "\"processing\"");
        assert_eq!(
            serde_json::to_string(&FailureCode::InvariantViolation).unwrap(),
            "\"invariant_violation\""
        );
        assert!(FailureCode::CorpusUnavailable.is_retryable());
        assert!(!FailureCode::Timeout.is_retryable());
    }
}
