use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use docsmith_core::models::ConversionJobResponse;
use docsmith_core::AppError;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

/// Fetch one conversion job, including its download URL once completed.
#[utoipa::path(
    get,
    path = "/api/v0/jobs/{job_id}",
    tag = "conversions",
    params(
        ("job_id" = Uuid, Path, description = "Conversion job ID")
    ),
    responses(
        (status = 200, description = "Job record", body = ConversionJobResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state), fields(job_id = %job_id, operation = "get_job"))]
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let job = state
        .jobs
        .get_by_id(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Conversion job not found".to_string()))?;

    Ok(Json(ConversionJobResponse::from(job)))
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListJobsQuery {
    /// Maximum number of jobs to return (capped at 200)
    pub limit: Option<i64>,
    /// Number of jobs to skip
    pub offset: Option<i64>,
}

/// List conversion jobs, newest first.
#[utoipa::path(
    get,
    path = "/api/v0/jobs",
    tag = "conversions",
    params(ListJobsQuery),
    responses(
        (status = 200, description = "Conversion jobs", body = Vec<ConversionJobResponse>)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state), fields(operation = "list_jobs"))]
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListJobsQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let jobs = state.jobs.list(limit, offset).await?;
    let responses: Vec<ConversionJobResponse> =
        jobs.into_iter().map(ConversionJobResponse::from).collect();

    Ok(Json(responses))
}
