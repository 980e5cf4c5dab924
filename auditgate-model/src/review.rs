use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    finding::{Finding, FindingRef},
    ids::{EntryId, RecordId},
    score::ScoreOutcome,
};

/// Review states. `Rejected` and `Exported` are terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    Pending,
    Approved,
    Disputed,
    Rejected,
    Exported,
}

impl ReviewState {
    pub fn is_terminal(self) -> bool {
        matches!(self, ReviewState::Rejected | ReviewState::Exported)
    }

    /// Awaiting a human decision.
    pub fn is_open(self) -> bool {
        matches!(self, ReviewState::Pending | ReviewState::Disputed)
    }

    /// The state reached by applying `action`, or `None` when the transition
    /// is illegal from `self`.
    pub fn apply(self, action: ReviewAction) -> Option<ReviewState> {
        use ReviewAction as A;
        use ReviewState as S;

        match (self, action) {
            (S::Pending | S::Disputed, A::Approve) => Some(S::Approved),
            (S::Pending, A::Dispute) => Some(S::Disputed),
            (S::Pending | S::Disputed, A::Reject) => Some(S::Rejected),
            (S::Approved, A::MarkExported) => Some(S::Exported),
            _ => None,
        }
    }
}

impl fmt::Display for ReviewState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewState::Pending => write!(f, "pending"),
            ReviewState::Approved => write!(f, "approved"),
            ReviewState::Disputed => write!(f, "disputed"),
            ReviewState::Rejected => write!(f, "rejected"),
            ReviewState::Exported => write!(f, "exported"),
        }
    }
}

/// Operations recorded in the audit log.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewAction {
    Enqueue,
    Approve,
    Dispute,
    Reject,
    MarkExported,
}

impl fmt::Display for ReviewAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewAction::Enqueue => write!(f, "enqueue"),
            ReviewAction::Approve => write!(f, "approve"),
            ReviewAction::Dispute => write!(f, "dispute"),
            ReviewAction::Reject => write!(f, "reject"),
            ReviewAction::MarkExported => write!(f, "mark_exported"),
        }
    }
}

/// One finding moving through the review gate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub id: RecordId,
    pub finding_ref: FindingRef,
    pub finding: Finding,
    pub score: ScoreOutcome,
    pub state: ReviewState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    /// Bumped on every applied transition; used for optimistic checks.
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

/// Write-once audit row. Entries for failed attempts are kept as well.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub entry_id: EntryId,
    pub review_record_ref: RecordId,
    pub action: ReviewAction,
    pub actor_id: String,
    pub timestamp: DateTime<Utc>,
    pub details: serde_json::Value,
}
