use std::fmt;

use async_trait::async_trait;
use auditgate_model::{Job, JobId, JobStatus, TargetResult};
use chrono::Utc;
use dashmap::DashMap;

use crate::error::{AuditError, Result};

/// Persistence seam for batch jobs and their per-target results.
///
/// Implementations must make each call atomic with respect to readers: a
/// `get` never observes a half-written result or status change.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn insert(&self, job: Job) -> Result<()>;

    async fn get(&self, id: JobId) -> Result<Option<Job>>;

    /// Moves the job to `status`, rejecting backward or skipped transitions
    /// and `Completed` while any target lacks a result.
    async fn transition(
        &self,
        id: JobId,
        status: JobStatus,
        failure_reason: Option<String>,
    ) -> Result<Job>;

    /// Stores a terminal per-target result. The first result for a target
    /// wins; later writes for the same target are ignored.
    async fn record_result(&self, id: JobId, result: TargetResult)
    -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryJobStore {
    jobs: DashMap<JobId, Job>,
}

impl fmt::Debug for InMemoryJobStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryJobStore")
            .field("jobs", &self.jobs.len())
            .finish()
    }
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: Job) -> Result<()> {
        if self.jobs.contains_key(&job.id) {
            return Err(AuditError::Internal(format!(
                "job {} already exists",
                job.id
            )));
        }
        self.jobs.insert(job.id, job);
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<Option<Job>> {
        Ok(self.jobs.get(&id).map(|job| job.value().clone()))
    }

    async fn transition(
        &self,
        id: JobId,
        status: JobStatus,
        failure_reason: Option<String>,
    ) -> Result<Job> {
        let mut job = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| AuditError::NotFound(format!("job {id}")))?;

        if !job.status.can_transition_to(status) {
            return Err(AuditError::Internal(format!(
                "job {id} cannot move from {} to {status}",
                job.status
            )));
        }
        if status == JobStatus::Completed && !job.all_targets_terminal() {
            return Err(AuditError::Internal(format!(
                "job {id} cannot complete with targets still pending"
            )));
        }

        let now = Utc::now();
        job.status = status;
        match status {
            JobStatus::Running => job.started_at = Some(now),
            JobStatus::Completed | JobStatus::Failed => {
                job.completed_at = Some(now);
                job.failure_reason = failure_reason;
            }
            JobStatus::Queued => {}
        }
        Ok(job.value().clone())
    }

    async fn record_result(
        &self,
        id: JobId,
        result: TargetResult,
    ) -> Result<()> {
        let mut job = self
            .jobs
            .get_mut(&id)
            .ok_or_else(|| AuditError::NotFound(format!("job {id}")))?;

        if job.status.is_terminal() {
            return Err(AuditError::Internal(format!(
                "job {id} is {} and read-only",
                job.status
            )));
        }
        if !job.targets.contains(&result.target) {
            return Err(AuditError::Internal(format!(
                "{} is not a target of job {id}",
                result.target
            )));
        }
        job.results.entry(result.target.clone()).or_insert(result);
        Ok(())
    }
}
