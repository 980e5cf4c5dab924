use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;

use auditgate_core::ExportFilter;
use auditgate_model::{ApiResponse, JobId};

use crate::infra::{app_state::AppState, errors::AppResult};

#[derive(Debug, Deserialize)]
pub struct ExportRequest {
    pub actor_id: String,
    /// Restrict the export to findings from one job.
    #[serde(default)]
    pub job_id: Option<JobId>,
}

pub async fn export_approved(
    State(state): State<AppState>,
    Json(request): Json<ExportRequest>,
) -> AppResult<impl IntoResponse> {
    let receipt = state
        .reviews
        .export_approved(
            state.exporter.as_ref(),
            ExportFilter {
                job_id: request.job_id,
            },
            &request.actor_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(receipt))))
}
