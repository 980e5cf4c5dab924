//! Human-in-the-loop review gate for scored findings.
//!
//! Each record sits behind its own `tokio::sync::Mutex`. Transitions take it
//! with `try_lock`, so two reviewers racing on one record never queue up
//! behind each other: the loser gets `Conflict` and can re-read the record.
//! Successful transitions append their audit entry while still holding the
//! lock, which keeps the per-record audit order identical to the order the
//! transitions were applied in.

use std::{cmp::Ordering, fmt, sync::Arc};

use auditgate_model::{
    AuditLogEntry, Finding, FindingRef, JobId, RecommendedAction, RecordId,
    ReviewAction, ReviewRecord, ReviewState, ScoreOutcome,
};
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{
    error::{AuditError, Result},
    export::{ExportItem, ExportReceipt, ReportExporter, SkippedRecord},
};

use super::audit_log::{AuditLog, NewAuditEntry};

/// Actor recorded for decisions the pipeline makes on its own.
pub const SYSTEM_ACTOR: &str = "system";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReviewConfig {
    /// Immediately reject records whose score recommends rejection.
    pub auto_reject: bool,
}

/// A scored finding offered to the review gate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    pub finding_ref: FindingRef,
    pub finding: Finding,
    pub score: ScoreOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

/// Who is acting, why, and optionally which record version they looked at.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub actor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_version: Option<u64>,
}

impl Decision {
    pub fn by(actor_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            ..Self::default()
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn expecting(mut self, version: u64) -> Self {
        self.expected_version = Some(version);
        self
    }
}

/// Narrows which approved records an export picks up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
}

type RecordCell = Arc<Mutex<ReviewRecord>>;

struct WorkflowInner {
    records: DashMap<RecordId, RecordCell>,
    log: Arc<dyn AuditLog>,
    config: ReviewConfig,
}

/// Cheap to clone; clones share the same records and audit log.
#[derive(Clone)]
pub struct ReviewWorkflow {
    inner: Arc<WorkflowInner>,
}

impl fmt::Debug for ReviewWorkflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReviewWorkflow")
            .field("records", &self.inner.records.len())
            .field("config", &self.inner.config)
            .finish()
    }
}

impl ReviewWorkflow {
    pub fn new(log: Arc<dyn AuditLog>, config: ReviewConfig) -> Self {
        Self {
            inner: Arc::new(WorkflowInner {
                records: DashMap::new(),
                log,
                config,
            }),
        }
    }

    pub fn config(&self) -> ReviewConfig {
        self.inner.config
    }

    /// Creates a review record. Findings the score recommends approving are
    /// created already `approved` by the system; with `auto_reject` enabled,
    /// findings recommended for rejection are rejected right away.
    pub async fn enqueue(
        &self,
        submission: ReviewSubmission,
    ) -> Result<ReviewRecord> {
        let auto_approved = submission.score.recommended_action
            == RecommendedAction::AutoApprove;
        let now = Utc::now();

        let record = ReviewRecord {
            id: RecordId::new(),
            finding_ref: submission.finding_ref,
            finding: submission.finding.normalized(),
            score: submission.score,
            state: if auto_approved {
                ReviewState::Approved
            } else {
                ReviewState::Pending
            },
            reviewer_id: auto_approved.then(|| SYSTEM_ACTOR.to_string()),
            decided_at: auto_approved.then_some(now),
            notes: None,
            suggested_fix: submission.suggested_fix,
            version: 0,
            created_at: now,
        };

        self.inner
            .log
            .append(NewAuditEntry {
                record_id: record.id,
                action: ReviewAction::Enqueue,
                actor_id: SYSTEM_ACTOR.to_string(),
                details: json!({
                    "outcome": "applied",
                    "to": record.state,
                    "score": record.score.score,
                    "tier": record.score.tier,
                    "recommended_action": record.score.recommended_action,
                    "finding_ref": record.finding_ref,
                }),
            })
            .await?;

        let id = record.id;
        let recommended = record.score.recommended_action;
        self.inner
            .records
            .insert(id, Arc::new(Mutex::new(record.clone())));
        debug!(record_id = %id, state = %record.state, "review record enqueued");

        if self.inner.config.auto_reject
            && recommended == RecommendedAction::Reject
        {
            let notes = record.score.reasoning.join("; ");
            return self
                .reject(id, Decision::by(SYSTEM_ACTOR).with_notes(notes))
                .await;
        }

        Ok(record)
    }

    pub async fn approve(
        &self,
        record_id: RecordId,
        decision: Decision,
    ) -> Result<ReviewRecord> {
        self.transition(record_id, ReviewAction::Approve, decision)
            .await
    }

    /// Notes are required.
    pub async fn dispute(
        &self,
        record_id: RecordId,
        decision: Decision,
    ) -> Result<ReviewRecord> {
        self.transition(record_id, ReviewAction::Dispute, decision)
            .await
    }

    /// Notes are required.
    pub async fn reject(
        &self,
        record_id: RecordId,
        decision: Decision,
    ) -> Result<ReviewRecord> {
        self.transition(record_id, ReviewAction::Reject, decision)
            .await
    }

    pub async fn mark_exported(
        &self,
        record_id: RecordId,
        decision: Decision,
    ) -> Result<ReviewRecord> {
        self.transition(record_id, ReviewAction::MarkExported, decision)
            .await
    }

    /// Applies `action` to the record. Exactly one audit entry is appended
    /// whether or not the transition succeeds.
    pub async fn transition(
        &self,
        record_id: RecordId,
        action: ReviewAction,
        decision: Decision,
    ) -> Result<ReviewRecord> {
        if action == ReviewAction::Enqueue {
            let err = AuditError::InvalidInput(
                "enqueue is not a transition".into(),
            );
            self.log_failure(record_id, action, &decision, &err).await;
            return Err(err);
        }

        match self.apply(record_id, action, &decision).await {
            Ok(record) => Ok(record),
            Err(err) => {
                debug!(
                    record_id = %record_id,
                    action = %action,
                    error = %err,
                    "review transition refused"
                );
                self.log_failure(record_id, action, &decision, &err).await;
                Err(err)
            }
        }
    }

    pub async fn record(&self, record_id: RecordId) -> Result<ReviewRecord> {
        let cell = self.cell(record_id)?;
        let record = cell.lock().await;
        Ok(record.clone())
    }

    /// Records awaiting a human, most urgent first: tier, then score
    /// descending, then age.
    pub async fn pending_queue(&self) -> Vec<ReviewRecord> {
        let mut open: Vec<ReviewRecord> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|record| record.state.is_open())
            .collect();
        open.sort_by(queue_order);
        open
    }

    pub async fn records_in_state(
        &self,
        state: ReviewState,
    ) -> Vec<ReviewRecord> {
        let mut records: Vec<ReviewRecord> = self
            .snapshot()
            .await
            .into_iter()
            .filter(|record| record.state == state)
            .collect();
        records.sort_by_key(|record| record.created_at);
        records
    }

    pub async fn audit_trail(
        &self,
        record_id: RecordId,
    ) -> Result<Vec<AuditLogEntry>> {
        let entries = self.inner.log.entries_for(record_id).await?;
        if entries.is_empty() && !self.inner.records.contains_key(&record_id) {
            return Err(AuditError::NotFound(format!(
                "review record {record_id}"
            )));
        }
        Ok(entries)
    }

    /// Renders every approved record (optionally for one job) through
    /// `exporter`, then marks each one exported.
    pub async fn export_approved(
        &self,
        exporter: &dyn ReportExporter,
        filter: ExportFilter,
        actor_id: &str,
    ) -> Result<ExportReceipt> {
        let approved: Vec<ReviewRecord> = self
            .records_in_state(ReviewState::Approved)
            .await
            .into_iter()
            .filter(|record| {
                filter
                    .job_id
                    .is_none_or(|job_id| record.finding_ref.job_id == job_id)
            })
            .collect();

        if approved.is_empty() {
            return Err(AuditError::NotReady(
                "no approved review records to export".into(),
            ));
        }

        let items: Vec<ExportItem> =
            approved.iter().map(ExportItem::from).collect();
        let artifact = exporter.export(&items).await?;

        let mut exported = Vec::with_capacity(approved.len());
        let mut skipped = Vec::new();
        for record in &approved {
            let decision = Decision::by(actor_id)
                .with_notes(format!("exported to {artifact}"))
                .expecting(record.version);
            match self.mark_exported(record.id, decision).await {
                Ok(_) => exported.push(record.id),
                Err(err) => skipped.push(SkippedRecord {
                    record_id: record.id,
                    reason: err.to_string(),
                }),
            }
        }

        info!(
            artifact = %artifact,
            exported = exported.len(),
            skipped = skipped.len(),
            "exported approved review records"
        );
        Ok(ExportReceipt {
            artifact,
            exported,
            skipped,
        })
    }

    async fn apply(
        &self,
        record_id: RecordId,
        action: ReviewAction,
        decision: &Decision,
    ) -> Result<ReviewRecord> {
        let cell = self.cell(record_id)?;
        let mut record =
            cell.try_lock().map_err(|_| AuditError::Conflict {
                record_id,
                reason: "another transition is in progress".into(),
            })?;

        if let Some(expected) = decision.expected_version
            && expected != record.version
        {
            return Err(AuditError::Conflict {
                record_id,
                reason: format!(
                    "expected version {expected}, found {}",
                    record.version
                ),
            });
        }

        let from = record.state;
        let to = from.apply(action).ok_or(AuditError::InvalidTransition {
            record_id,
            from,
            action,
        })?;

        let notes = decision
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty());
        if matches!(action, ReviewAction::Dispute | ReviewAction::Reject)
            && notes.is_none()
        {
            return Err(AuditError::InvalidInput(format!(
                "{action} requires notes"
            )));
        }
        if decision.actor_id.trim().is_empty() {
            return Err(AuditError::InvalidInput(
                "actor_id must not be empty".into(),
            ));
        }

        let mut next = record.clone();
        next.state = to;
        next.version += 1;
        if action != ReviewAction::MarkExported {
            next.reviewer_id = Some(decision.actor_id.clone());
            next.decided_at = Some(Utc::now());
            next.notes = notes.map(str::to_string);
        }

        self.inner
            .log
            .append(NewAuditEntry {
                record_id,
                action,
                actor_id: decision.actor_id.clone(),
                details: json!({
                    "outcome": "applied",
                    "from": from,
                    "to": to,
                    "version": next.version,
                    "notes": notes,
                }),
            })
            .await?;

        *record = next;
        info!(
            record_id = %record_id,
            from = %from,
            to = %to,
            actor = %decision.actor_id,
            "review record transitioned"
        );
        Ok(record.clone())
    }

    async fn log_failure(
        &self,
        record_id: RecordId,
        action: ReviewAction,
        decision: &Decision,
        err: &AuditError,
    ) {
        let entry = NewAuditEntry {
            record_id,
            action,
            actor_id: decision.actor_id.clone(),
            details: json!({
                "outcome": "refused",
                "error": err.to_string(),
                "expected_version": decision.expected_version,
            }),
        };
        if let Err(log_err) = self.inner.log.append(entry).await {
            error!(
                record_id = %record_id,
                error = %log_err,
                "failed to append audit entry for refused transition"
            );
        }
    }

    fn cell(&self, record_id: RecordId) -> Result<RecordCell> {
        self.inner
            .records
            .get(&record_id)
            .map(|cell| Arc::clone(cell.value()))
            .ok_or_else(|| {
                AuditError::NotFound(format!("review record {record_id}"))
            })
    }

    async fn snapshot(&self) -> Vec<ReviewRecord> {
        let cells: Vec<RecordCell> = self
            .inner
            .records
            .iter()
            .map(|cell| Arc::clone(cell.value()))
            .collect();

        let mut records = Vec::with_capacity(cells.len());
        for cell in cells {
            records.push(cell.lock().await.clone());
        }
        records
    }
}

fn queue_order(a: &ReviewRecord, b: &ReviewRecord) -> Ordering {
    a.score
        .tier
        .cmp(&b.score.tier)
        .then_with(|| b.score.score.total_cmp(&a.score.score))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::InMemoryAuditLog;
    use auditgate_model::{ScoreBreakdown, Severity, Tier};
    use url::Url;

    fn submission(
        action: RecommendedAction,
        tier: Tier,
        score: f64,
    ) -> ReviewSubmission {
        let finding = Finding::new("1.4.3", Severity::Serious, ".cta", 0.7);
        ReviewSubmission {
            finding_ref: FindingRef {
                job_id: JobId::new(),
                target: Url::parse("https://bank.example/").unwrap(),
                index: 0,
                criterion_id: finding.criterion_id.clone(),
            },
            finding,
            score: ScoreOutcome {
                score,
                tier,
                recommended_action: action,
                reasoning: vec![format!("weighted score {score:.3}")],
                breakdown: ScoreBreakdown::default(),
            },
            suggested_fix: None,
        }
    }

    fn pending() -> ReviewSubmission {
        submission(RecommendedAction::HumanReview, Tier::Two, 0.7)
    }

    fn workflow(config: ReviewConfig) -> (ReviewWorkflow, Arc<InMemoryAuditLog>) {
        let log = Arc::new(InMemoryAuditLog::new());
        (ReviewWorkflow::new(log.clone(), config), log)
    }

    #[tokio::test]
    async fn enqueue_dispute_approve_is_fully_audited() {
        let (workflow, _) = workflow(ReviewConfig::default());
        let record = workflow.enqueue(pending()).await.unwrap();
        assert_eq!(record.state, ReviewState::Pending);

        workflow
            .dispute(
                record.id,
                Decision::by("alice").with_notes("contrast looks fine"),
            )
            .await
            .unwrap();
        let approved = workflow
            .approve(record.id, Decision::by("bob"))
            .await
            .unwrap();
        assert_eq!(approved.state, ReviewState::Approved);
        assert_eq!(approved.version, 2);
        assert_eq!(approved.reviewer_id.as_deref(), Some("bob"));

        let trail = workflow.audit_trail(record.id).await.unwrap();
        let actions: Vec<ReviewAction> =
            trail.iter().map(|entry| entry.action).collect();
        assert_eq!(
            actions,
            vec![
                ReviewAction::Enqueue,
                ReviewAction::Dispute,
                ReviewAction::Approve
            ]
        );
        assert!(
            trail
                .windows(2)
                .all(|pair| pair[0].timestamp <= pair[1].timestamp)
        );

        let err = workflow
            .approve(record.id, Decision::by("carol"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::InvalidTransition { .. }));
        assert_eq!(workflow.audit_trail(record.id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn terminal_states_refuse_everything() {
        let (workflow, _) = workflow(ReviewConfig::default());
        let record = workflow.enqueue(pending()).await.unwrap();
        workflow
            .reject(record.id, Decision::by("alice").with_notes("false positive"))
            .await
            .unwrap();

        for action in [
            ReviewAction::Approve,
            ReviewAction::Dispute,
            ReviewAction::Reject,
            ReviewAction::MarkExported,
        ] {
            let decision = Decision::by("bob").with_notes("again");
            let err = workflow
                .transition(record.id, action, decision)
                .await
                .unwrap_err();
            assert!(matches!(err, AuditError::InvalidTransition { .. }));
        }

        let unchanged = workflow.record(record.id).await.unwrap();
        assert_eq!(unchanged.state, ReviewState::Rejected);
        assert_eq!(unchanged.version, 1);
    }

    #[tokio::test]
    async fn dispute_and_reject_require_notes() {
        let (workflow, _) = workflow(ReviewConfig::default());
        let record = workflow.enqueue(pending()).await.unwrap();

        let err = workflow
            .dispute(record.id, Decision::by("alice").with_notes("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::InvalidInput(_)));
        assert_eq!(
            workflow.record(record.id).await.unwrap().state,
            ReviewState::Pending
        );
    }

    #[tokio::test]
    async fn auto_approved_findings_skip_the_queue() {
        let (workflow, log) = workflow(ReviewConfig::default());
        let record = workflow
            .enqueue(submission(RecommendedAction::AutoApprove, Tier::One, 0.9))
            .await
            .unwrap();

        assert_eq!(record.state, ReviewState::Approved);
        assert_eq!(record.reviewer_id.as_deref(), Some(SYSTEM_ACTOR));
        assert!(workflow.pending_queue().await.is_empty());
        assert_eq!(log.snapshot()[0].actor_id, SYSTEM_ACTOR);
    }

    #[tokio::test]
    async fn auto_reject_rejects_with_reasoning() {
        let (workflow, _) = workflow(ReviewConfig { auto_reject: true });
        let record = workflow
            .enqueue(submission(RecommendedAction::Reject, Tier::Three, 0.2))
            .await
            .unwrap();

        assert_eq!(record.state, ReviewState::Rejected);
        assert!(record.notes.unwrap().contains("weighted score"));
        assert_eq!(workflow.audit_trail(record.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let (workflow, _) = workflow(ReviewConfig::default());
        let record = workflow.enqueue(pending()).await.unwrap();

        workflow
            .dispute(record.id, Decision::by("alice").with_notes("check"))
            .await
            .unwrap();
        let err = workflow
            .approve(record.id, Decision::by("bob").expecting(0))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::Conflict { .. }));
    }

    #[tokio::test]
    async fn held_record_lock_surfaces_as_conflict() {
        let (workflow, _) = workflow(ReviewConfig::default());
        let record = workflow.enqueue(pending()).await.unwrap();

        let cell = workflow.cell(record.id).unwrap();
        let guard = cell.lock().await;
        let err = workflow
            .approve(record.id, Decision::by("bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::Conflict { .. }));
        drop(guard);

        workflow
            .approve(record.id, Decision::by("bob"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_records_are_not_found_but_still_audited() {
        let (workflow, log) = workflow(ReviewConfig::default());
        let missing = RecordId::new();

        let err = workflow
            .approve(missing, Decision::by("bob"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::NotFound(_)));
        assert_eq!(log.snapshot().len(), 1);
        assert_eq!(log.snapshot()[0].review_record_ref, missing);
    }

    #[tokio::test]
    async fn queue_orders_by_tier_then_score() {
        let (workflow, _) = workflow(ReviewConfig::default());
        let low = workflow
            .enqueue(submission(RecommendedAction::HumanReview, Tier::Two, 0.6))
            .await
            .unwrap();
        let urgent = workflow
            .enqueue(submission(RecommendedAction::HumanReview, Tier::One, 0.55))
            .await
            .unwrap();
        let high = workflow
            .enqueue(submission(RecommendedAction::HumanReview, Tier::Two, 0.8))
            .await
            .unwrap();

        let order: Vec<RecordId> = workflow
            .pending_queue()
            .await
            .into_iter()
            .map(|record| record.id)
            .collect();
        assert_eq!(order, vec![urgent.id, high.id, low.id]);
    }
}
