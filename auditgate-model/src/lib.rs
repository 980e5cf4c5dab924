//! Core data model definitions shared across auditgate crates.
#![allow(missing_docs)]

pub mod api;
pub mod breaker;
pub mod error;
pub mod finding;
pub mod ids;
pub mod job;
pub mod review;
pub mod score;

// Intentionally curated re-exports for downstream consumers.
pub use api::{ApiResponse, JobAccepted};
pub use breaker::{BreakerSnapshot, CircuitState};
pub use error::{ModelError, Result as ModelResult};
pub use finding::{Finding, FindingRef, Severity};
pub use ids::{EntryId, JobId, RecordId};
pub use job::{
    Job, JobStatus, ResultsMode, SubmitRequest, TargetOutcome, TargetResult,
};
pub use review::{AuditLogEntry, ReviewAction, ReviewRecord, ReviewState};
pub use score::{
    Industry, RecommendedAction, ScoreBreakdown, ScoreOutcome, ScoringContext,
    Tier,
};
