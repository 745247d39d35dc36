//! Bounded-retry execution of one pipeline invocation.
//!
//! The runner owns everything the pipeline refuses to do: attempt
//! counting, increasing backoff between attempts, last-error bookkeeping,
//! and the terminal failed state once the budget is exhausted. The
//! persistence of job rows is the storage collaborator's problem — this
//! type only mutates the in-memory record it is handed.

use apoyo_config::RetryConfig;
use apoyo_core::error::PipelineError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Lifecycle of one queued generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

/// One queued generation request with its bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: Uuid,
    pub school_id: Uuid,
    pub student_id: Uuid,
    pub report_id: Uuid,
    pub requested_by: Option<Uuid>,
    pub contexts: Option<Vec<String>>,
    pub status: JobStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl GenerationJob {
    pub fn new(
        school_id: Uuid,
        student_id: Uuid,
        report_id: Uuid,
        requested_by: Option<Uuid>,
        contexts: Option<Vec<String>>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            school_id,
            student_id,
            report_id,
            requested_by,
            contexts,
            status: JobStatus::Queued,
            attempts: 0,
            last_error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }
}

/// Wraps a pipeline invocation with bounded retry and backoff.
pub struct JobRunner {
    max_attempts: u32,
    base_delay: Duration,
}

impl JobRunner {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
        }
    }

    /// Run `attempt` until it succeeds or the attempt budget is spent.
    ///
    /// The delay before attempt N is `base_delay * (N - 1)`, so the first
    /// attempt starts immediately and later ones back off increasingly.
    /// Every failure is recorded on the job; the terminal state keeps the
    /// last error text.
    pub async fn run<T, F, Fut>(
        &self,
        job: &mut GenerationJob,
        attempt: F,
    ) -> Result<T, PipelineError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());

        loop {
            job.attempts += 1;
            info!(job = %job.id, attempt = job.attempts, "Job attempt starting");

            match attempt().await {
                Ok(value) => {
                    job.status = JobStatus::Done;
                    job.last_error = None;
                    job.finished_at = Some(Utc::now());
                    info!(job = %job.id, attempts = job.attempts, "Job done");
                    return Ok(value);
                }
                Err(e) => {
                    warn!(job = %job.id, attempt = job.attempts, error = %e, "Job attempt failed");
                    job.last_error = Some(e.to_string());

                    if job.attempts >= self.max_attempts {
                        job.status = JobStatus::Failed;
                        job.finished_at = Some(Utc::now());
                        return Err(e);
                    }

                    tokio::time::sleep(self.base_delay * job.attempts).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn job() -> GenerationJob {
        GenerationJob::new(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), None, None)
    }

    fn runner() -> JobRunner {
        JobRunner::new(&RetryConfig {
            max_attempts: 3,
            base_delay_ms: 1,
        })
    }

    #[tokio::test]
    async fn success_on_first_attempt() {
        let mut job = job();
        let result = runner().run(&mut job, || async { Ok::<_, PipelineError>(42) }).await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.attempts, 1);
        assert!(job.last_error.is_none());
        assert!(job.finished_at.is_some());
    }

    #[tokio::test]
    async fn retries_until_success() {
        let mut job = job();
        let calls = AtomicU32::new(0);

        let result = runner()
            .run(&mut job, || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(PipelineError::NoJsonFound {
                            preview: String::new(),
                        })
                    } else {
                        Ok("listo")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "listo");
        assert_eq!(job.attempts, 3);
        assert_eq!(job.status, JobStatus::Done);
        assert!(job.last_error.is_none());
    }

    #[tokio::test]
    async fn exhausted_budget_is_terminal_failure() {
        let mut job = job();

        let result: Result<(), _> = runner()
            .run(&mut job, || async {
                Err(PipelineError::SchemaViolation {
                    detail: "missing guardrails".into(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.attempts, 3);
        assert!(job.last_error.as_deref().unwrap().contains("missing guardrails"));
        assert!(job.finished_at.is_some());
    }
}
