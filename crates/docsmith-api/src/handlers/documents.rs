use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use docsmith_core::models::{ConversionJobResponse, DocumentResponse};
use docsmith_core::AppError;
use docsmith_storage::StorageError;

#[derive(Debug, Serialize, ToSchema)]
pub struct DocumentDetailResponse {
    #[serde(flatten)]
    pub document: DocumentResponse,
    /// Conversion jobs run against this document, newest first
    pub jobs: Vec<ConversionJobResponse>,
}

/// Fetch one document record together with its conversion history.
#[utoipa::path(
    get,
    path = "/api/v0/documents/{id}",
    tag = "documents",
    params(
        ("id" = Uuid, Path, description = "Document ID")
    ),
    responses(
        (status = 200, description = "Document record with job history", body = DocumentDetailResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state), fields(document_id = %id, operation = "get_document"))]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let document = state
        .documents
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    let jobs = state
        .jobs
        .list_for_document(document.id)
        .await?
        .into_iter()
        .map(ConversionJobResponse::from)
        .collect();

    Ok(Json(DocumentDetailResponse {
        document: DocumentResponse::from(document),
        jobs,
    }))
}

/// Delete a document, its stored file, its jobs, and any undownloaded
/// artifacts.
#[utoipa::path(
    delete,
    path = "/api/v0/documents/{id}",
    tag = "documents",
    params(
        ("id" = Uuid, Path, description = "Document ID")
    ),
    responses(
        (status = 204, description = "Document deleted"),
        (status = 404, description = "Document not found", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state), fields(document_id = %id, operation = "delete_document"))]
pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    // Collect artifact keys before the cascade wipes the job rows.
    let jobs = state.jobs.list_for_document(id).await?;

    let document = state
        .documents
        .delete(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Document not found".to_string()))?;

    delete_quietly(&state, &document.storage_key).await;
    for job in jobs {
        if let Some(output_key) = &job.output_key {
            delete_quietly(&state, output_key).await;
        }
    }

    tracing::info!(document_id = %id, "document and artifacts deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Remove a stored file, tolerating files already reclaimed by download.
async fn delete_quietly(state: &AppState, storage_key: &str) {
    match state.storage.delete(storage_key).await {
        Ok(()) | Err(StorageError::NotFound(_)) => {}
        Err(err) => {
            tracing::warn!(
                storage_key = %storage_key,
                error = %err,
                "failed to delete stored file"
            );
        }
    }
}
