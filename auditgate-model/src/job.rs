use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt};
use url::Url;

use crate::{
    finding::Finding,
    ids::JobId,
    score::{ScoreOutcome, ScoringContext},
};

/// Lifecycle of a batch audit job. Only moves forward:
/// `Queued -> Running -> {Completed, Failed}`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal per-target outcome. Target failures are data, not job failures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetOutcome {
    Ok,
    Error { reason: String },
}

impl TargetOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, TargetOutcome::Ok)
    }
}

/// Result of auditing a single target URL.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetResult {
    pub target: Url,
    pub raw_findings: Vec<Finding>,
    /// Present exactly when `outcome` is `Ok`.
    pub score: Option<ScoreOutcome>,
    pub outcome: TargetOutcome,
    pub duration_ms: u64,
    pub attempts: u32,
}

impl TargetResult {
    pub fn ok(
        target: Url,
        raw_findings: Vec<Finding>,
        score: ScoreOutcome,
        duration_ms: u64,
        attempts: u32,
    ) -> Self {
        Self {
            target,
            raw_findings,
            score: Some(score),
            outcome: TargetOutcome::Ok,
            duration_ms,
            attempts,
        }
    }

    pub fn error(
        target: Url,
        reason: impl Into<String>,
        duration_ms: u64,
        attempts: u32,
    ) -> Self {
        Self {
            target,
            raw_findings: Vec::new(),
            score: None,
            outcome: TargetOutcome::Error {
                reason: reason.into(),
            },
            duration_ms,
            attempts,
        }
    }
}

/// One batch audit request and its accumulated results.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub targets: Vec<Url>,
    pub status: JobStatus,
    pub concurrency_limit: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ScoringContext>,
    pub results: HashMap<Url, TargetResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    pub fn new(
        targets: Vec<Url>,
        concurrency_limit: usize,
        context: Option<ScoringContext>,
    ) -> Self {
        Self {
            id: JobId::new(),
            targets,
            status: JobStatus::Queued,
            concurrency_limit,
            context,
            results: HashMap::new(),
            failure_reason: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    /// `(finished targets, total targets)`.
    pub fn progress(&self) -> (usize, usize) {
        (self.results.len(), self.targets.len())
    }

    pub fn all_targets_terminal(&self) -> bool {
        self.targets
            .iter()
            .all(|target| self.results.contains_key(target))
    }

    /// Results in submission order, skipping targets still in flight.
    pub fn ordered_results(&self) -> Vec<TargetResult> {
        self.targets
            .iter()
            .filter_map(|target| self.results.get(target).cloned())
            .collect()
    }

    /// Targets that errored or never produced a result, in submission order.
    pub fn retryable_targets(&self) -> Vec<Url> {
        self.targets
            .iter()
            .filter(|target| {
                self.results
                    .get(*target)
                    .is_none_or(|result| !result.outcome.is_ok())
            })
            .cloned()
            .collect()
    }
}

/// Whether a results query insists on a finished job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultsMode {
    #[default]
    Final,
    Partial,
}

/// Wire shape of a job submission.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub targets: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency_limit: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<ScoringContext>,
}
