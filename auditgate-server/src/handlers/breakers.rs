use axum::{
    extract::{Path, State},
    response::Json,
};
use tracing::info;

use auditgate_model::{ApiResponse, BreakerSnapshot};

use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn list_breakers(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<BreakerSnapshot>>> {
    Json(ApiResponse::success(state.breakers.snapshots()))
}

/// Operator override that closes a breaker and clears its history.
pub async fn reset_breaker(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<ApiResponse<BreakerSnapshot>>> {
    state.breakers.reset(&name)?;
    info!(dependency = %name, "breaker reset through the API");
    Ok(Json(ApiResponse::success(state.breakers.get(&name).snapshot())))
}
