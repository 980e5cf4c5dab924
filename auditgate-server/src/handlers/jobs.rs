use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use uuid::Uuid;

use auditgate_model::{
    ApiResponse, Job, JobAccepted, JobId, ResultsMode, SubmitRequest,
    TargetResult,
};

use crate::infra::{app_state::AppState, errors::AppResult};

#[derive(Debug, Default, Deserialize)]
pub struct ResultsQuery {
    /// Return whatever has finished instead of refusing unfinished jobs.
    #[serde(default)]
    pub partial: bool,
}

pub async fn submit_job(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> AppResult<impl IntoResponse> {
    let job_id = state.audits.submit(request).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(JobAccepted { job_id })),
    ))
}

pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Job>>> {
    let job = state.audits.status(JobId(job_id)).await?;
    Ok(Json(ApiResponse::success(job)))
}

pub async fn job_results(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Query(query): Query<ResultsQuery>,
) -> AppResult<Json<ApiResponse<Vec<TargetResult>>>> {
    let mode = if query.partial {
        ResultsMode::Partial
    } else {
        ResultsMode::Final
    };
    let results = state.audits.results(JobId(job_id), mode).await?;
    Ok(Json(ApiResponse::success(results)))
}

pub async fn cancel_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Job>>> {
    let job = state.audits.cancel(JobId(job_id)).await?;
    Ok(Json(ApiResponse::success(job)))
}

pub async fn resubmit_failed(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let job_id = state.audits.resubmit_failed(JobId(job_id)).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(JobAccepted { job_id })),
    ))
}
