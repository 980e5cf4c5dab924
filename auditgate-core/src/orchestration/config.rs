use std::time::Duration;

use crate::resilience::RetryPolicy;

/// Upper bound on per-job parallelism accepted from callers.
pub const MAX_CONCURRENCY_LIMIT: usize = 16;

/// Knobs for the batch audit service.
#[derive(Clone, Debug, PartialEq)]
pub struct OrchestratorConfig {
    /// Worker count used when a submission does not name one.
    pub default_concurrency: usize,
    /// Budget for one target, shared by every retry attempt and the backoff
    /// between them. Config validation refuses values longer than the
    /// scanner breaker's cooldown.
    pub target_timeout: Duration,
    /// Applied around every guarded checker call, inside the target budget.
    pub retry: RetryPolicy,
    /// Feed findings of successful targets straight into the review
    /// workflow.
    pub auto_enqueue_reviews: bool,
    pub event_channel_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            default_concurrency: 4,
            target_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            auto_enqueue_reviews: true,
            event_channel_capacity: 256,
        }
    }
}
