use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    handlers::{breakers, exports, jobs, reviews},
};

/// Create all v1 API routes
pub fn create_v1_router() -> Router<AppState> {
    Router::new()
        .merge(create_job_routes())
        .merge(create_review_routes())
        .route("/exports", post(exports::export_approved))
        .route("/breakers", get(breakers::list_breakers))
        .route("/breakers/{name}/reset", post(breakers::reset_breaker))
}

fn create_job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", post(jobs::submit_job))
        .route("/jobs/{id}", get(jobs::job_status))
        .route("/jobs/{id}/results", get(jobs::job_results))
        .route("/jobs/{id}/cancel", post(jobs::cancel_job))
        .route("/jobs/{id}/resubmit", post(jobs::resubmit_failed))
}

fn create_review_routes() -> Router<AppState> {
    Router::new()
        .route("/reviews", post(reviews::enqueue_review))
        .route("/reviews/queue", get(reviews::pending_queue))
        .route("/reviews/{id}", get(reviews::get_record))
        .route("/reviews/{id}/audit", get(reviews::audit_trail))
        .route("/reviews/{id}/approve", post(reviews::approve))
        .route("/reviews/{id}/dispute", post(reviews::dispute))
        .route("/reviews/{id}/reject", post(reviews::reject))
}
