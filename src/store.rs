//! Job records keyed by submission id.
//!
//! Every transition goes through [`JobStore::transition`], which checks the
//! attempt id and the expected status under the entry's shard lock. Waiters
//! are woken on every transition.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::Notify;
use tokio::time::Instant;
use uuid::Uuid;

use crate::job::{CheckRequest, JobStatus, PlagiarismCheck, ScopeFilter};

/// Why a transition was refused.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StaleTransition {
    #[error("no job for submission")]
    Missing,
    #[error("attempt {found} replaced attempt {expected}")]
    Superseded { expected: Uuid, found: Uuid },
    #[error("job is {found}, expected {expected}")]
    WrongStatus { expected: JobStatus, found: JobStatus },
}

/// Outcome of [`JobStore::admit`].
#[derive(Debug, Clone)]
pub enum Admission {
    /// A fresh pending attempt was created and must be queued.
    Created(PlagiarismCheck),
    /// A live attempt already exists; nothing changed.
    Existing(PlagiarismCheck),
}

struct JobRecord {
    check: PlagiarismCheck,
    request: Arc<CheckRequest>,
    deadline: Instant,
}

#[derive(Default)]
pub struct JobStore {
    jobs: DashMap<String, JobRecord>,
    changed: Notify,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending attempt unless a live one exists.
    ///
    /// Terminal jobs are overwritten: new attempt id, retry count reset,
    /// result and error cleared.
    pub fn admit(&self, request: CheckRequest, timeout: Duration) -> Admission {
        let requested_at = Utc::now();
        let deadline_at = requested_at
            + chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::zero());
        let record = || JobRecord {
            check: PlagiarismCheck::pending(&request, requested_at, deadline_at),
            request: Arc::new(request.clone()),
            deadline: Instant::now() + timeout,
        };

        let admission = match self.jobs.entry(request.submission_id.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().check.status.is_live() {
                    return Admission::Existing(occupied.get().check.clone());
                }
                occupied.insert(record());
                Admission::Created(occupied.get().check.clone())
            }
            Entry::Vacant(vacant) => {
                let inserted = vacant.insert(record());
                Admission::Created(inserted.check.clone())
            }
        };
        self.changed.notify_waiters();
        admission
    }

    /// Apply `update` if the job is still on `attempt_id` and in `expected`.
    pub fn transition<F>(
        &self,
        submission_id: &str,
        attempt_id: Uuid,
        expected: JobStatus,
        update: F,
    ) -> Result<PlagiarismCheck, StaleTransition>
    where
        F: FnOnce(&mut PlagiarismCheck),
    {
        let updated = {
            let mut record = self
                .jobs
                .get_mut(submission_id)
                .ok_or(StaleTransition::Missing)?;
            let check = &mut record.check;
            if check.attempt_id != attempt_id {
                return Err(StaleTransition::Superseded {
                    expected: attempt_id,
                    found: check.attempt_id,
                });
            }
            if check.status != expected {
                return Err(StaleTransition::WrongStatus {
                    expected,
                    found: check.status,
                });
            }
            update(check);
            check.clone()
        };
        self.changed.notify_waiters();
        Ok(updated)
    }

    pub fn get(&self, submission_id: &str) -> Option<PlagiarismCheck> {
        self.jobs.get(submission_id).map(|r| r.check.clone())
    }

    /// The request and deadline behind the current attempt.
    pub fn work(&self, submission_id: &str) -> Option<(Arc<CheckRequest>, Instant)> {
        self.jobs
            .get(submission_id)
            .map(|r| (Arc::clone(&r.request), r.deadline))
    }

    /// Checks in scope, sorted by submission id.
    pub fn list(&self, filter: &ScopeFilter) -> Vec<PlagiarismCheck> {
        let mut checks: Vec<PlagiarismCheck> = self
            .jobs
            .iter()
            .filter(|r| filter.matches(&r.check.scope))
            .map(|r| r.check.clone())
            .collect();
        checks.sort_by(|a, b| a.submission_id.cmp(&b.submission_id));
        checks
    }

    /// Wait until the job is terminal or `timeout` passes, then return its
    /// current record. `None` for an unknown id.
    pub async fn wait_for_terminal(
        &self,
        submission_id: &str,
        timeout: Duration,
    ) -> Option<PlagiarismCheck> {
        let deadline = Instant::now() + timeout;
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let check = self.get(submission_id)?;
            if check.is_terminal() {
                return Some(check);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.get(submission_id);
            }
        }
    }
}

/// `chrono` view of a retry scheduled `delay` from now.
pub(crate) fn retry_at(delay: Duration) -> DateTime<Utc> {
    Utc::now() + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use index::Scope;

    fn request(id: &str, course: &str) -> CheckRequest {
        CheckRequest::new(id, "s", Scope::new(course, "a1"), "text")
    }

    fn created(admission: Admission) -> PlagiarismCheck {
        match admission {
            Admission::Created(check) => check,
            Admission::Existing(_) => panic!("expected a new attempt"),
        }
    }

    #[test]
    fn live_job_is_returned_unchanged() {
        let store = JobStore::new();
        let first = created(store.admit(request("x", "c"), Duration::from_secs(60)));
        assert_eq!(first.status, JobStatus::Pending);

        match store.admit(request("x", "c"), Duration::from_secs(60)) {
            Admission::Existing(check) => assert_eq!(check.attempt_id, first.attempt_id),
            Admission::Created(_) => panic!("live job overwritten"),
        }
    }

    #[test]
    fn terminal_job_is_overwritten() {
        let store = JobStore::new();
        let first = created(store.admit(request("x", "c"), Duration::from_secs(60)));
        store
            .transition("x", first.attempt_id, JobStatus::Pending, |c| {
                c.status = JobStatus::Failed;
                c.retry_count = 2;
            })
            .unwrap();

        let second = created(store.admit(request("x", "c"), Duration::from_secs(60)));
        assert_ne!(second.attempt_id, first.attempt_id);
        assert_eq!(second.retry_count, 0);
        assert!(second.error.is_none());
    }

    #[test]
    fn stale_transitions_rejected() {
        let store = JobStore::new();
        let check = created(store.admit(request("x", "c"), Duration::from_secs(60)));

        let wrong_attempt = store.transition("x", Uuid::new_v4(), JobStatus::Pending, |_| {});
        assert!(matches!(wrong_attempt, Err(StaleTransition::Superseded { .. })));

        let wrong_status = store.transition("x", check.attempt_id, JobStatus::Processing, |_| {});
        assert_eq!(
            wrong_status,
            Err(StaleTransition::WrongStatus {
                expected: JobStatus::Processing,
                found: JobStatus::Pending
            })
        );

        let missing = store.transition("y", check.attempt_id, JobStatus::Pending, |_| {});
        assert_eq!(missing, Err(StaleTransition::Missing));
    }

    #[test]
    fn deadline_follows_timeout() {
        let store = JobStore::new();
        let check = created(store.admit(request("x", "c"), Duration::from_secs(60)));
        assert_eq!((check.deadline - check.requested_at).num_seconds(), 60);
        assert!(store.work("x").is_some());
        assert!(store.work("y").is_none());
    }

    #[test]
    fn list_filters_and_sorts() {
        let store = JobStore::new();
        for (id, course) in [("b", "c1"), ("a", "c1"), ("z", "c2")] {
            store.admit(request(id, course), Duration::from_secs(60));
        }
        let ids: Vec<String> = store
            .list(&ScopeFilter::course("c1"))
            .into_iter()
            .map(|c| c.submission_id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(store.list(&ScopeFilter::assignment("c2", "a1")).len(), 1);
        assert!(store.list(&ScopeFilter::assignment("c2", "zz")).is_empty());
    }

    #[tokio::test]
    async fn waiter_wakes_on_terminal_transition() {
        let store = Arc::new(JobStore::new());
        let check = created(store.admit(request("x", "c"), Duration::from_secs(60)));

        let waiter = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.wait_for_terminal("x", Duration::from_secs(5)).await })
        };
        tokio::task::yield_now().await;
        store
            .transition("x", check.attempt_id, JobStatus::Pending, |c| {
                c.status = JobStatus::Failed;
            })
            .unwrap();

        let done = waiter.await.unwrap().unwrap();
        assert_eq!(done.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn wait_gives_up_after_timeout() {
        let store = JobStore::new();
        store.admit(request("x", "c"), Duration::from_secs(60));
        let check = store
            .wait_for_terminal("x", Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(check.status, JobStatus::Pending);
        assert!(store.wait_for_terminal("nope", Duration::from_millis(1)).await.is_none());
    }
}
