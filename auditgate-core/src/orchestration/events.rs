use async_trait::async_trait;
use auditgate_model::{JobId, JobStatus, TargetOutcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Result;

/// Lifecycle notifications emitted by the batch audit service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JobEvent {
    pub job_id: JobId,
    pub at: DateTime<Utc>,
    pub payload: JobEventPayload,
}

impl JobEvent {
    pub fn now(job_id: JobId, payload: JobEventPayload) -> Self {
        Self {
            job_id,
            at: Utc::now(),
            payload,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum JobEventPayload {
    Submitted {
        targets: usize,
        concurrency_limit: usize,
    },
    Started,
    TargetCompleted {
        target: Url,
        outcome: TargetOutcome,
        attempts: u32,
        completed: usize,
        total: usize,
    },
    Finished {
        status: JobStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        failure_reason: Option<String>,
    },
}

#[async_trait]
pub trait JobEventPublisher: Send + Sync {
    async fn publish(&self, event: JobEvent) -> Result<()>;
}
