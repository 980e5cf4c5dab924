use std::time::Duration;

use async_trait::async_trait;
use auditgate_model::Finding;
use url::Url;

use crate::error::Result;

/// Black-box DOM accessibility checker. The orchestrator only ever reaches it
/// through the `dom-scanner` circuit breaker.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessibilityChecker: Send + Sync {
    /// Audits one page. `timeout` is the caller's budget for the whole check;
    /// implementations may pass it on to the scanner.
    async fn check(&self, target: &Url, timeout: Duration)
    -> Result<Vec<Finding>>;
}
