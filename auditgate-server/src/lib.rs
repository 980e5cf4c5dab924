//! # auditgate server
//!
//! HTTP surface over the batch audit service and the review workflow.
//! Handlers translate requests into core operations and map core errors onto
//! status codes; no business rules live here.

pub mod handlers;
pub mod infra;
pub mod routes;

pub use infra::app_state::AppState;

use axum::{Router, http::HeaderValue, routing::get};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use handlers::health::health_handler;

/// Assembles the router with health, the versioned API and the CORS and
/// tracing layers.
pub fn create_app(state: AppState) -> Router {
    let cors_layer = {
        let wildcard = state.cors_allowed_origins.is_empty()
            || state.cors_allowed_origins.iter().any(|origin| origin == "*");
        let allow_origin = if wildcard {
            AllowOrigin::any()
        } else {
            let origins: Vec<HeaderValue> = state
                .cors_allowed_origins
                .iter()
                .filter_map(|origin| HeaderValue::from_str(origin).ok())
                .collect();
            AllowOrigin::list(origins)
        };

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(health_handler))
        .merge(routes::create_api_router())
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use async_trait::async_trait;
    use auditgate_core::{
        AccessibilityChecker, BatchAuditService, Finding, InMemoryAuditLog,
        InMemoryJobStore, JsonReportExporter, ReviewConfig, ReviewWorkflow,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;
    use url::Url;

    use super::*;

    struct Clean;

    #[async_trait]
    impl AccessibilityChecker for Clean {
        async fn check(
            &self,
            _target: &Url,
            _timeout: Duration,
        ) -> auditgate_core::Result<Vec<Finding>> {
            Ok(Vec::new())
        }
    }

    fn app(origins: &[&str]) -> Router {
        let audits = BatchAuditService::builder(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(Clean),
        )
        .build();
        let reviews = ReviewWorkflow::new(
            Arc::new(InMemoryAuditLog::new()),
            ReviewConfig::default(),
        );
        let state = AppState::new(
            audits,
            reviews,
            Arc::new(JsonReportExporter::new(std::env::temp_dir())),
        )
        .with_cors_origins(origins.iter().map(|o| o.to_string()).collect());
        create_app(state)
    }

    async fn allowed_origin(app: Router, origin: &str) -> Option<String> {
        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    }

    #[tokio::test]
    async fn cors_allows_only_listed_origins() {
        let listed = ["http://localhost:3000"];
        assert_eq!(
            allowed_origin(app(&listed), "http://localhost:3000").await,
            Some("http://localhost:3000".to_string())
        );
        assert_eq!(
            allowed_origin(app(&listed), "http://elsewhere.example").await,
            None
        );
    }

    #[tokio::test]
    async fn cors_wildcard_or_empty_list_allows_any_origin() {
        for origins in [&["*"][..], &[][..]] {
            assert_eq!(
                allowed_origin(app(origins), "http://elsewhere.example").await,
                Some("*".to_string())
            );
        }
    }
}
