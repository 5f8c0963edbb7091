//! Queue, worker pool and per-attempt state machine.
//!
//! ```text
//! pending ──▶ processing ──▶ completed
//!    ▲             │
//!    │             ▼
//!    └──(retry)── failed
//! ```
//!
//! Admission puts a job on a bounded queue. Workers run each attempt's stages
//! on the blocking pool under the job's deadline. A timed-out attempt is
//! failed at once, and its worker waits for the abandoned stages to reach
//! their next checkpoint before taking another job. Only a corpus failure is
//! retried, after a backoff, by moving the same attempt back to `pending`.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::JobsConfig;
use crate::job::{CheckRequest, FailureCode, FailureReason, JobStatus, PlagiarismCheck};
use crate::pipeline::Pipeline;
use crate::report::PlagiarismResult;
use crate::retry::RetryPolicy;
use crate::store::{self, Admission, JobStore};
use crate::{CheckError, EngineError};

type AttemptHandle = JoinHandle<Result<PlagiarismResult, CheckError>>;

/// One queued attempt.
#[derive(Debug, Clone)]
struct QueuedJob {
    submission_id: String,
    attempt_id: Uuid,
}

const RUNNING: u8 = 0;
const COMMITTING: u8 = 1;
const CANCELLED: u8 = 2;

/// Shared between an attempt's blocking work and the worker awaiting it.
///
/// Exactly one of commit and cancel wins.
#[derive(Debug, Default)]
pub(crate) struct AttemptGate(AtomicU8);

impl AttemptGate {
    /// Claim the right to write to the corpus.
    pub fn begin_commit(&self) -> bool {
        self.0
            .compare_exchange(RUNNING, COMMITTING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Abandon the attempt. False when it is already committing.
    pub fn cancel(&self) -> bool {
        self.0
            .compare_exchange(RUNNING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire) == CANCELLED
    }

    /// Stage boundary: `Err(Cancelled)` once the attempt was abandoned.
    pub fn checkpoint(&self) -> Result<(), CheckError> {
        if self.is_cancelled() {
            Err(CheckError::Cancelled)
        } else {
            Ok(())
        }
    }
}

struct WorkerContext {
    store: Arc<JobStore>,
    pipeline: Arc<Pipeline>,
    policy: RetryPolicy,
    timeout: Duration,
    queue: mpsc::WeakSender<QueuedJob>,
}

pub(crate) struct Coordinator {
    ctx: Arc<WorkerContext>,
    sender: Mutex<Option<mpsc::Sender<QueuedJob>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator {
    /// Spawn the worker pool on the current tokio runtime.
    pub fn start(
        store: Arc<JobStore>,
        pipeline: Arc<Pipeline>,
        jobs: &JobsConfig,
    ) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| EngineError::NoRuntime)?;
        let (sender, receiver) = mpsc::channel(jobs.queue_capacity);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        let ctx = Arc::new(WorkerContext {
            store,
            pipeline,
            policy: jobs.retry_policy(),
            timeout: jobs.timeout(),
            queue: sender.downgrade(),
        });

        let count = jobs.worker_count();
        let workers = (0..count)
            .map(|worker| {
                let ctx = Arc::clone(&ctx);
                let receiver = Arc::clone(&receiver);
                runtime.spawn(worker_loop(worker, ctx, receiver))
            })
            .collect();
        info!(
            workers = count,
            queue_capacity = jobs.queue_capacity,
            timeout_ms = jobs.timeout_ms,
            retry_ceiling = jobs.retry_ceiling,
            "job coordinator started"
        );

        Ok(Self {
            ctx,
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
        })
    }

    /// Create or fetch the job for `request`, queueing new attempts.
    pub async fn submit(&self, request: CheckRequest) -> Result<PlagiarismCheck, EngineError> {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or(EngineError::QueueClosed)?;

        match self.ctx.store.admit(request, self.ctx.timeout) {
            Admission::Existing(check) => {
                debug!(
                    submission_id = %check.submission_id,
                    attempt_id = %check.attempt_id,
                    status = %check.status,
                    "check already in flight"
                );
                Ok(check)
            }
            Admission::Created(check) => {
                let job = QueuedJob {
                    submission_id: check.submission_id.clone(),
                    attempt_id: check.attempt_id,
                };
                if sender.send(job).await.is_err() {
                    self.ctx.fail_unqueued(&check, "job queue closed");
                    return Err(EngineError::QueueClosed);
                }
                info!(
                    submission_id = %check.submission_id,
                    attempt_id = %check.attempt_id,
                    "check queued"
                );
                Ok(check)
            }
        }
    }

    /// Stop admitting work, let queued jobs drain and join the workers.
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        drop(sender);

        let workers: Vec<JoinHandle<()>> = self
            .workers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .drain(..)
            .collect();
        for handle in workers {
            if let Err(err) = handle.await {
                warn!(error = %err, "worker ended abnormally");
            }
        }
        info!("job coordinator stopped");
    }
}

async fn worker_loop(
    worker: usize,
    ctx: Arc<WorkerContext>,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<QueuedJob>>>,
) {
    loop {
        let next = receiver.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };
        ctx.run_attempt(job).await;
    }
    debug!(worker, "worker stopped");
}

impl WorkerContext {
    #[tracing::instrument(
        name = "attempt",
        skip_all,
        fields(submission_id = %job.submission_id, attempt_id = %job.attempt_id)
    )]
    async fn run_attempt(self: &Arc<Self>, job: QueuedJob) {
        if let Err(stale) = self.store.transition(
            &job.submission_id,
            job.attempt_id,
            JobStatus::Pending,
            |check| check.status = JobStatus::Processing,
        ) {
            debug!(reason = %stale, "dropping stale queue entry");
            return;
        }
        let Some((request, deadline)) = self.store.work(&job.submission_id) else {
            return;
        };
        debug!("attempt started");

        let (outcome, abandoned) = if Instant::now() >= deadline {
            (Err(CheckError::Timeout(self.timeout)), None)
        } else {
            self.execute(request, deadline).await
        };

        match outcome {
            Ok(result) => self.complete(&job, result),
            Err(err) => self.fail(&job, err),
        }

        if let Some(handle) = abandoned {
            let stopped = handle.await;
            debug!(
                cancelled = matches!(stopped, Ok(Err(CheckError::Cancelled))),
                "abandoned attempt stopped"
            );
        }
    }

    /// Run the stages on the blocking pool and commit, racing the deadline.
    ///
    /// On timeout the still-running blocking task comes back alongside the
    /// error; it stops at its next checkpoint.
    async fn execute(
        &self,
        request: Arc<CheckRequest>,
        deadline: Instant,
    ) -> (Result<PlagiarismResult, CheckError>, Option<AttemptHandle>) {
        let gate = Arc::new(AttemptGate::default());
        let pipeline = Arc::clone(&self.pipeline);
        let attempt_gate = Arc::clone(&gate);

        let mut handle = tokio::task::spawn_blocking(move || -> Result<PlagiarismResult, CheckError> {
            let analyzed = pipeline.analyze(&request, &attempt_gate)?;
            if !attempt_gate.begin_commit() {
                debug!(submission_id = %request.submission_id, "abandoned attempt skipped commit");
                return Err(CheckError::Cancelled);
            }
            pipeline.commit(&analyzed.entry)?;
            Ok(analyzed.result)
        });

        let joined = match tokio::time::timeout_at(deadline, &mut handle).await {
            Ok(joined) => joined,
            Err(_) if gate.cancel() => {
                return (Err(CheckError::Timeout(self.timeout)), Some(handle));
            }
            // Commit already under way; its outcome stands.
            Err(_) => handle.await,
        };
        let outcome = joined
            .map_err(|err| CheckError::Worker(err.to_string()))
            .and_then(|result| result);
        (outcome, None)
    }

    fn complete(&self, job: &QueuedJob, result: PlagiarismResult) {
        let score = result.similarity_score;
        let sources = result.matched_sources.len();
        let found = result.suspicious_patterns.len();
        match self.store.transition(
            &job.submission_id,
            job.attempt_id,
            JobStatus::Processing,
            move |check| {
                check.status = JobStatus::Completed;
                check.completed_at = Some(Utc::now());
                check.result = Some(result);
                check.error = None;
            },
        ) {
            Ok(_) => info!(
                similarity_score = score,
                sources,
                patterns = found,
                "check completed"
            ),
            Err(stale) => warn!(reason = %stale, "completion rejected"),
        }
    }

    fn fail(self: &Arc<Self>, job: &QueuedJob, err: CheckError) {
        let code = err.code();
        let reason = FailureReason::new(code, err.to_string());
        let policy = self.policy;
        let mut retry_delay = None;

        let transition = self.store.transition(
            &job.submission_id,
            job.attempt_id,
            JobStatus::Processing,
            |check| {
                check.status = JobStatus::Failed;
                check.completed_at = Some(Utc::now());
                check.result = None;
                check.error = Some(reason);
                if code.is_retryable() && policy.allows(check.retry_count) {
                    let delay = policy.delay_for(check.retry_count + 1);
                    check.next_retry_at = Some(store::retry_at(delay));
                    retry_delay = Some(delay);
                }
            },
        );
        let check = match transition {
            Ok(check) => check,
            Err(stale) => {
                warn!(reason = %stale, "failure rejected");
                return;
            }
        };

        match (code, retry_delay) {
            (FailureCode::InvariantViolation, _) => {
                error!(code = %code, error = %err, "check failed")
            }
            (_, Some(delay)) => warn!(
                code = %code,
                error = %err,
                retry_count = check.retry_count,
                delay_ms = delay.as_millis() as u64,
                "check failed, retry scheduled"
            ),
            (_, None) => warn!(
                code = %code,
                error = %err,
                retry_count = check.retry_count,
                "check failed"
            ),
        }

        if let Some(delay) = retry_delay {
            self.schedule_retry(job.clone(), delay);
        }
    }

    fn schedule_retry(self: &Arc<Self>, job: QueuedJob, delay: Duration) {
        let ctx = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let requeued = ctx.store.transition(
                &job.submission_id,
                job.attempt_id,
                JobStatus::Failed,
                |check| {
                    check.status = JobStatus::Pending;
                    check.retry_count += 1;
                    check.completed_at = None;
                    check.error = None;
                    check.next_retry_at = None;
                },
            );
            let check = match requeued {
                Ok(check) => check,
                Err(stale) => {
                    debug!(submission_id = %job.submission_id, reason = %stale, "retry superseded");
                    return;
                }
            };

            let sent = match ctx.queue.upgrade() {
                Some(sender) => sender.send(job).await.is_ok(),
                None => false,
            };
            if sent {
                debug!(
                    submission_id = %check.submission_id,
                    retry_count = check.retry_count,
                    "retry queued"
                );
            } else {
                ctx.fail_unqueued(&check, "engine shut down before retry");
            }
        });
    }

    /// Fail a pending attempt that never reached a worker.
    fn fail_unqueued(&self, check: &PlagiarismCheck, message: &str) {
        let reason = FailureReason::new(FailureCode::Internal, message);
        if let Err(stale) = self.store.transition(
            &check.submission_id,
            check.attempt_id,
            JobStatus::Pending,
            |c| {
                c.status = JobStatus::Failed;
                c.completed_at = Some(Utc::now());
                c.error = Some(reason);
            },
        ) {
            debug!(submission_id = %check.submission_id, reason = %stale, "unqueued failure rejected");
        }
        warn!(submission_id = %check.submission_id, message, "check could not be queued");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_lets_exactly_one_side_win() {
        let gate = AttemptGate::default();
        assert!(gate.begin_commit());
        assert!(!gate.cancel());
        assert!(!gate.is_cancelled());

        let gate = AttemptGate::default();
        assert!(gate.checkpoint().is_ok());
        assert!(gate.cancel());
        assert!(gate.is_cancelled());
        assert!(matches!(gate.checkpoint(), Err(CheckError::Cancelled)));
        assert!(!gate.begin_commit());
    }

    #[tokio::test]
    async fn submit_after_shutdown_is_rejected() {
        let store = Arc::new(JobStore::new());
        let config = Arc::new(crate::EngineConfig::default());
        let index = Arc::new(index::CorpusIndex::new(config.index.clone()).unwrap());
        let pipeline = Arc::new(Pipeline::new(config, index));
        let jobs = JobsConfig::new().with_workers(2);

        let coordinator = Coordinator::start(store, pipeline, &jobs).unwrap();
        coordinator.shutdown().await;
        let request = CheckRequest::new("x", "s", index::Scope::new("c", "a"), "text");
        assert!(matches!(
            coordinator.submit(request).await,
            Err(EngineError::QueueClosed)
        ));
    }

    #[test]
    fn start_outside_runtime_is_an_error() {
        let store = Arc::new(JobStore::new());
        let config = Arc::new(crate::EngineConfig::default());
        let index = Arc::new(index::CorpusIndex::new(config.index.clone()).unwrap());
        let pipeline = Arc::new(Pipeline::new(config, index));
        let result = Coordinator::start(store, pipeline, &JobsConfig::default());
        assert!(matches!(result, Err(EngineError::NoRuntime)));
    }
}
