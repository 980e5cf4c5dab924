//! AI-drafted remediation text for findings that go to human review.
//!
//! Drafting is strictly best-effort: any failure, including an open
//! `ai-draft-service` circuit, degrades to "no suggested fix" and never blocks
//! a review record from being created.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use auditgate_model::{Finding, Severity};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use crate::{
    error::{AuditError, Result},
    resilience::{AI_DRAFT_SERVICE, BreakerRegistry, CircuitBreaker},
};

/// Context handed to the draft service for one finding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DraftRequest {
    pub target: Url,
    pub criterion_id: String,
    pub severity: Severity,
    pub evidence: String,
}

impl DraftRequest {
    pub fn for_finding(target: &Url, finding: &Finding) -> Self {
        Self {
            target: target.clone(),
            criterion_id: finding.criterion_id.clone(),
            severity: finding.severity,
            evidence: finding.evidence.clone(),
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DraftService: Send + Sync {
    async fn draft(&self, request: &DraftRequest) -> Result<String>;
}

/// Calls the draft service through its circuit breaker with a time budget.
#[derive(Clone)]
pub struct RemediationDrafter {
    service: Arc<dyn DraftService>,
    breaker: Arc<CircuitBreaker>,
    timeout: Duration,
}

impl fmt::Debug for RemediationDrafter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemediationDrafter")
            .field("breaker", &self.breaker.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RemediationDrafter {
    pub fn new(
        service: Arc<dyn DraftService>,
        breakers: &BreakerRegistry,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            breaker: breakers.get(AI_DRAFT_SERVICE),
            timeout,
        }
    }

    /// Returns a suggested fix, or `None` when the service is unavailable,
    /// slow, or answers with nothing useful.
    pub async fn draft(&self, target: &Url, finding: &Finding) -> Option<String> {
        let request = DraftRequest::for_finding(target, finding);
        let request = &request;
        let service = &self.service;
        let timeout = self.timeout;

        let outcome = self
            .breaker
            .call(move || async move {
                match tokio::time::timeout(timeout, service.draft(request))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(AuditError::Timeout {
                        dependency: AI_DRAFT_SERVICE.to_string(),
                        after: timeout,
                    }),
                }
            })
            .await;

        match outcome {
            Ok(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Ok(_) => {
                debug!(
                    url = %target,
                    criterion = %finding.criterion_id,
                    "draft service returned empty text"
                );
                None
            }
            Err(err) => {
                warn!(
                    url = %target,
                    criterion = %finding.criterion_id,
                    error = %err,
                    "remediation draft unavailable; continuing without suggested fix"
                );
                None
            }
        }
    }
}
