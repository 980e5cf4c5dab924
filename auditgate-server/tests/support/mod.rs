#![allow(dead_code)]

use std::{collections::HashMap, path::Path, sync::Arc, time::Duration};

use async_trait::async_trait;
use auditgate_core::{
    AccessibilityChecker, AuditError, BatchAuditService, BreakerConfig,
    BreakerRegistry, Finding, InMemoryAuditLog, InMemoryJobStore,
    JsonReportExporter, OrchestratorConfig, Result, RetryPolicy,
    ReviewConfig, ReviewFeed, ReviewWorkflow,
};
use auditgate_server::{AppState, create_app};
use axum_test::TestServer;
use url::Url;

/// Per-host canned answers. `None` makes the check fail; unknown hosts
/// report nothing.
#[derive(Debug, Default)]
pub struct FakeChecker {
    answers: HashMap<String, Option<Vec<Finding>>>,
    delay: Option<Duration>,
}

impl FakeChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn findings(mut self, host: &str, findings: Vec<Finding>) -> Self {
        self.answers.insert(host.to_string(), Some(findings));
        self
    }

    pub fn failing(mut self, host: &str) -> Self {
        self.answers.insert(host.to_string(), None);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl AccessibilityChecker for FakeChecker {
    async fn check(
        &self,
        target: &Url,
        _timeout: Duration,
    ) -> Result<Vec<Finding>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let host = target.host_str().unwrap_or_default();
        match self.answers.get(host) {
            Some(Some(findings)) => Ok(findings.clone()),
            Some(None) => {
                Err(AuditError::CheckFailed(format!("{host} is unreachable")))
            }
            None => Ok(Vec::new()),
        }
    }
}

pub struct Harness {
    pub server: TestServer,
    pub state: AppState,
}

/// Builds the full router over in-memory stores with reviews fed
/// automatically from finished targets.
pub fn harness(checker: FakeChecker, export_dir: &Path) -> Harness {
    let breakers = BreakerRegistry::new(BreakerConfig {
        failure_threshold: 2,
        ..BreakerConfig::default()
    });
    let reviews = ReviewWorkflow::new(
        Arc::new(InMemoryAuditLog::new()),
        ReviewConfig::default(),
    );
    let audits = BatchAuditService::builder(
        Arc::new(InMemoryJobStore::new()),
        Arc::new(checker),
    )
    .config(OrchestratorConfig {
        retry: RetryPolicy::none(),
        auto_enqueue_reviews: true,
        ..OrchestratorConfig::default()
    })
    .breakers(breakers)
    .review_feed(ReviewFeed {
        workflow: reviews.clone(),
        drafter: None,
    })
    .build();

    let state = AppState::new(
        audits,
        reviews,
        Arc::new(JsonReportExporter::new(export_dir)),
    );
    let server =
        TestServer::new(create_app(state.clone())).expect("test server");
    Harness { server, state }
}
