use axum::{extract::State, response::Json};
use serde_json::{Value, json};

use auditgate_model::CircuitState;

use crate::infra::app_state::AppState;

/// Liveness plus a summary of dependency breakers. An open breaker does not
/// make the service unhealthy; jobs still run and record the failures.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let snapshots = state.breakers.snapshots();
    let degraded = snapshots
        .iter()
        .any(|snapshot| snapshot.state != CircuitState::Closed);
    let breakers: Vec<Value> = snapshots
        .into_iter()
        .map(|snapshot| {
            json!({ "name": snapshot.name, "state": snapshot.state })
        })
        .collect();

    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "checks": {
            "breakers": breakers,
            "degraded": degraded,
        }
    }))
}
