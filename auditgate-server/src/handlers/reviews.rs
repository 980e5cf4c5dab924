use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use auditgate_core::{Decision, ReviewSubmission};
use auditgate_model::{ApiResponse, AuditLogEntry, RecordId, ReviewRecord};

use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn enqueue_review(
    State(state): State<AppState>,
    Json(submission): Json<ReviewSubmission>,
) -> AppResult<impl IntoResponse> {
    let record = state.reviews.enqueue(submission).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

pub async fn pending_queue(
    State(state): State<AppState>,
) -> Json<ApiResponse<Vec<ReviewRecord>>> {
    Json(ApiResponse::success(state.reviews.pending_queue().await))
}

pub async fn get_record(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReviewRecord>>> {
    let record = state.reviews.record(RecordId(record_id)).await?;
    Ok(Json(ApiResponse::success(record)))
}

pub async fn audit_trail(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<AuditLogEntry>>>> {
    let entries = state.reviews.audit_trail(RecordId(record_id)).await?;
    Ok(Json(ApiResponse::success(entries)))
}

pub async fn approve(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
    Json(decision): Json<Decision>,
) -> AppResult<Json<ApiResponse<ReviewRecord>>> {
    let record = state.reviews.approve(RecordId(record_id), decision).await?;
    Ok(Json(ApiResponse::success(record)))
}

pub async fn dispute(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
    Json(decision): Json<Decision>,
) -> AppResult<Json<ApiResponse<ReviewRecord>>> {
    let record = state.reviews.dispute(RecordId(record_id), decision).await?;
    Ok(Json(ApiResponse::success(record)))
}

pub async fn reject(
    State(state): State<AppState>,
    Path(record_id): Path<Uuid>,
    Json(decision): Json<Decision>,
) -> AppResult<Json<ApiResponse<ReviewRecord>>> {
    let record = state.reviews.reject(RecordId(record_id), decision).await?;
    Ok(Json(ApiResponse::success(record)))
}
