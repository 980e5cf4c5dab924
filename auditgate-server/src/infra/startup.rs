use std::sync::Arc;

use auditgate_config::Config;
use auditgate_core::{
    BatchAuditService, BreakerRegistry, InMemoryAuditLog, InMemoryJobStore,
    JsonReportExporter, RemediationDrafter, ReviewFeed, ReviewWorkflow,
    ScoringEngine,
    infrastructure::{HttpAccessibilityChecker, HttpDraftService},
};
use tracing::info;

use super::app_state::AppState;

/// Wires the in-memory stores, HTTP adapters and services described by
/// `config` into handler state.
pub fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let breakers = BreakerRegistry::new(config.breaker);
    let reviews = ReviewWorkflow::new(
        Arc::new(InMemoryAuditLog::new()),
        config.review,
    );

    let checker = Arc::new(HttpAccessibilityChecker::new(
        config.scanner.endpoint.clone(),
    )?);
    info!(
        endpoint = %config.scanner.endpoint,
        "accessibility scanner configured"
    );

    let drafter = match &config.drafts {
        Some(drafts) => {
            let service =
                Arc::new(HttpDraftService::new(drafts.endpoint.clone())?);
            info!(
                endpoint = %drafts.endpoint,
                timeout = ?drafts.timeout,
                "remediation drafts enabled"
            );
            Some(RemediationDrafter::new(service, &breakers, drafts.timeout))
        }
        None => None,
    };

    let audits = BatchAuditService::builder(
        Arc::new(InMemoryJobStore::new()),
        checker,
    )
    .config(config.orchestrator.clone())
    .breakers(breakers)
    .scoring(ScoringEngine::new(config.scoring.clone()))
    .review_feed(ReviewFeed {
        workflow: reviews.clone(),
        drafter,
    })
    .build();

    let exporter =
        Arc::new(JsonReportExporter::new(config.export.dir.clone()));

    Ok(AppState::new(audits, reviews, exporter)
        .with_cors_origins(config.server.cors_allowed_origins.clone()))
}
