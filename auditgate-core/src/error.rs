use std::time::Duration;

use auditgate_model::{ModelError, RecordId, ReviewAction, ReviewState};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Dependency unavailable: circuit '{dependency}' is open")]
    CircuitOpen { dependency: String },

    #[error("Timed out after {after:?} waiting on '{dependency}'")]
    Timeout { dependency: String, after: Duration },

    #[error("Accessibility check failed: {0}")]
    CheckFailed(String),

    #[error("Remediation draft failed: {0}")]
    DraftFailed(String),

    #[error("Cannot {action} review record {record_id} in state {from}")]
    InvalidTransition {
        record_id: RecordId,
        from: ReviewState,
        action: ReviewAction,
    },

    #[error("Conflicting update on review record {record_id}: {reason}")]
    Conflict { record_id: RecordId, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuditError {
    /// Whether another attempt against the same dependency may succeed.
    /// An open circuit is never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            AuditError::Timeout { .. }
            | AuditError::CheckFailed(_)
            | AuditError::DraftFailed(_)
            | AuditError::Http(_) => true,
            AuditError::CircuitOpen { .. }
            | AuditError::InvalidTransition { .. }
            | AuditError::Conflict { .. }
            | AuditError::NotFound(_)
            | AuditError::NotReady(_)
            | AuditError::InvalidInput(_)
            | AuditError::Export(_)
            | AuditError::Io(_)
            | AuditError::Serialization(_)
            | AuditError::Internal(_) => false,
        }
    }

    /// Stable reason string recorded on a failed target.
    pub fn target_reason(&self) -> String {
        match self {
            AuditError::CircuitOpen { .. } => {
                format!("dependency_unavailable: {self}")
            }
            AuditError::Timeout { .. } => format!("timeout: {self}"),
            AuditError::CheckFailed(msg) => format!("check_failed: {msg}"),
            AuditError::Http(err) if err.is_timeout() => {
                format!("timeout: {err}")
            }
            AuditError::Http(err) => format!("check_failed: {err}"),
            other => format!("error: {other}"),
        }
    }
}

impl From<ModelError> for AuditError {
    fn from(err: ModelError) -> Self {
        AuditError::InvalidInput(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_circuit_reason_mentions_unavailable() {
        let err = AuditError::CircuitOpen {
            dependency: "dom-scanner".into(),
        };
        assert!(err.target_reason().starts_with("dependency_unavailable"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn timeouts_are_retryable_and_labelled() {
        let err = AuditError::Timeout {
            dependency: "dom-scanner".into(),
            after: Duration::from_secs(30),
        };
        assert!(err.is_retryable());
        assert!(err.target_reason().starts_with("timeout"));
    }
}
