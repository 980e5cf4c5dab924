//! # auditgate core
//!
//! Business logic for auditing websites for accessibility defects at scale
//! and gating the results through human review.
//!
//! ## Overview
//!
//! - **Resilience**: per-dependency circuit breakers, a process-wide
//!   registry, and a retry combinator that runs in front of them
//! - **Scoring**: pure reduction of raw findings into a bounded score, a
//!   priority tier and a recommended action, with readable reasoning
//! - **Orchestration**: the batch audit service with its bounded worker pool,
//!   job store seam and lifecycle event bus
//! - **Review**: the approval state machine and its append-only audit log
//! - **Export**: rendering approved findings into a deliverable
//! - **Remediation**: best-effort AI drafts of suggested fixes
//!
//! ## Architecture
//!
//! - [`resilience`]: `CircuitBreaker`, `BreakerRegistry`, `with_retry`
//! - [`scoring`]: `ScoringEngine` and `ScoringConfig`
//! - [`orchestration`]: `BatchAuditService`, `JobStore`, `AccessibilityChecker`
//! - [`review`]: `ReviewWorkflow`, `AuditLog`
//! - [`export`]: `ReportExporter`, `JsonReportExporter`
//! - [`remediation`]: `DraftService`, `RemediationDrafter`
//! - [`infrastructure`]: reqwest adapters for the external ports
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use auditgate_core::{
//!     BatchAuditService, InMemoryJobStore, ResultsMode, SubmitRequest,
//!     infrastructure::HttpAccessibilityChecker,
//! };
//!
//! async fn audit() -> auditgate_core::Result<()> {
//!     let checker = HttpAccessibilityChecker::new(
//!         "http://localhost:9000/check".parse().unwrap(),
//!     )?;
//!     let service = BatchAuditService::builder(
//!         Arc::new(InMemoryJobStore::new()),
//!         Arc::new(checker),
//!     )
//!     .build();
//!
//!     let job_id = service
//!         .submit(SubmitRequest {
//!             targets: vec!["https://example.com/".into()],
//!             ..SubmitRequest::default()
//!         })
//!         .await?;
//!     service.wait_until_finished(job_id).await?;
//!     let results = service.results(job_id, ResultsMode::Final).await?;
//!     println!("{} target(s) audited", results.len());
//!     Ok(())
//! }
//! ```

#![allow(missing_docs)]

pub mod error;
pub mod export;
pub mod infrastructure;
pub mod orchestration;
pub mod remediation;
pub mod resilience;
pub mod review;
pub mod scoring;

pub use auditgate_model as model;
pub use auditgate_model::{
    AuditLogEntry, BreakerSnapshot, CircuitState, EntryId, Finding,
    FindingRef, Industry, Job, JobId, JobStatus, RecommendedAction, RecordId,
    ResultsMode, ReviewAction, ReviewRecord, ReviewState, ScoreBreakdown,
    ScoreOutcome, ScoringContext, Severity, SubmitRequest, TargetOutcome,
    TargetResult, Tier,
};

pub use error::{AuditError, Result};
pub use export::{
    ArtifactRef, ExportItem, ExportReceipt, JsonReportExporter, ReportExporter,
    SkippedRecord,
};
pub use orchestration::{
    AccessibilityChecker, BatchAuditService, InMemoryJobStore,
    InProcJobEventBus, JobEvent, JobEventPayload, JobStore,
    OrchestratorConfig, ReviewFeed,
};
pub use remediation::{DraftRequest, DraftService, RemediationDrafter};
pub use resilience::{
    AI_DRAFT_SERVICE, BreakerConfig, BreakerRegistry, CircuitBreaker,
    DOM_SCANNER, RetryPolicy, with_retry,
};
pub use review::{
    AuditLog, Decision, ExportFilter, InMemoryAuditLog, ReviewConfig,
    ReviewSubmission, ReviewWorkflow, SYSTEM_ACTOR,
};
pub use scoring::{ScoringConfig, ScoringEngine};
