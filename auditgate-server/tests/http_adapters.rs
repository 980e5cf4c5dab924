use std::time::Duration;

use auditgate_core::{
    AccessibilityChecker, AuditError, DraftRequest, DraftService, Finding,
    Severity,
    infrastructure::{HttpAccessibilityChecker, HttpDraftService},
};
use axum::{Json, Router, http::StatusCode, routing::post};
use serde_json::{Value, json};
use url::Url;

/// Serves `router` on an ephemeral local port and returns its base URL.
async fn spawn(router: Router) -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake dependency");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("fake dependency");
    });
    Url::parse(&format!("http://{addr}/")).expect("base url")
}

async fn fake_scanner(Json(body): Json<Value>) -> Json<Value> {
    assert_eq!(body["url"], "https://shop.example/cart");
    assert_eq!(body["timeout_ms"], 2000);
    Json(json!({
        "findings": [{
            "criterion_id": "1.1.1",
            "severity": "critical",
            "evidence": "img.hero",
            "detection_confidence": 1.7,
        }]
    }))
}

#[tokio::test]
async fn checker_posts_the_target_and_normalizes_findings() {
    let base = spawn(Router::new().route("/check", post(fake_scanner))).await;
    let checker = HttpAccessibilityChecker::new(
        base.join("check").expect("endpoint"),
    )
    .expect("client");

    let findings = checker
        .check(
            &Url::parse("https://shop.example/cart").expect("target"),
            Duration::from_secs(2),
        )
        .await
        .expect("scanner answers");

    assert_eq!(
        findings,
        vec![Finding::new("1.1.1", Severity::Critical, "img.hero", 1.0)]
    );
}

#[tokio::test]
async fn checker_maps_server_errors_to_check_failed() {
    let base = spawn(Router::new().route(
        "/check",
        post(|| async { StatusCode::BAD_GATEWAY }),
    ))
    .await;
    let checker = HttpAccessibilityChecker::new(
        base.join("check").expect("endpoint"),
    )
    .expect("client");

    let err = checker
        .check(
            &Url::parse("https://shop.example/").expect("target"),
            Duration::from_secs(2),
        )
        .await
        .expect_err("502 is a failure");
    assert!(
        matches!(err, AuditError::CheckFailed(ref msg) if msg.contains("502"))
    );
}

#[tokio::test]
async fn draft_service_returns_text_and_reports_failures() {
    let base = spawn(
        Router::new()
            .route(
                "/draft",
                post(|Json(body): Json<Value>| async move {
                    let criterion =
                        body["criterion_id"].as_str().unwrap_or_default();
                    Json(json!({ "text": format!("add alt text ({criterion})") }))
                }),
            )
            .route(
                "/broken",
                post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            ),
    )
    .await;

    let request = DraftRequest::for_finding(
        &Url::parse("https://shop.example/").expect("target"),
        &Finding::new("1.1.1", Severity::Serious, "img.hero", 0.9),
    );

    let drafts = HttpDraftService::new(base.join("draft").expect("endpoint"))
        .expect("client");
    assert_eq!(
        drafts.draft(&request).await.expect("draft"),
        "add alt text (1.1.1)"
    );

    let broken =
        HttpDraftService::new(base.join("broken").expect("endpoint"))
            .expect("client");
    let err = broken.draft(&request).await.expect_err("500 is a failure");
    assert!(matches!(err, AuditError::DraftFailed(_)));
}
