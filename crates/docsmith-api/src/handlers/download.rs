use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, Response, StatusCode},
    response::IntoResponse,
};
use futures::StreamExt;
use uuid::Uuid;

use crate::error::{storage_error_to_app, ErrorResponse, HttpAppError};
use crate::state::AppState;
use docsmith_core::models::JobStatus;
use docsmith_core::AppError;

/// Download the artifact of a completed conversion job.
///
/// The artifact is streamed out and deleted once the transfer finishes, so
/// each job's output can be fetched exactly once.
#[utoipa::path(
    get,
    path = "/api/v0/download/{job_id}",
    tag = "conversions",
    params(
        ("job_id" = Uuid, Path, description = "Conversion job ID")
    ),
    responses(
        (status = 200, description = "Converted file", content_type = "application/octet-stream"),
        (status = 404, description = "Job unknown, not completed, or artifact already downloaded", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state), fields(job_id = %job_id, operation = "download_artifact"))]
pub async fn download_artifact(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let job = state
        .jobs
        .get_by_id(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Conversion job not found".to_string()))?;

    match job.status {
        JobStatus::Completed => {}
        JobStatus::Pending | JobStatus::Processing => {
            return Err(AppError::NotFound(
                "Conversion has not completed; no artifact to download".to_string(),
            )
            .into());
        }
        JobStatus::Failed | JobStatus::TimedOut => {
            return Err(AppError::NotFound(
                "Conversion did not produce an artifact".to_string(),
            )
            .into());
        }
    }

    // Normally recorded on the job; fall back to scanning the artifact dir
    // by job id, which is how the output is named on disk.
    let output_key = match job.output_key.clone() {
        Some(key) => key,
        None => state
            .storage
            .find_by_id_prefix(state.config.output_prefix(), &job.id.to_string())
            .await
            .map_err(storage_error_to_app)?
            .ok_or_else(|| {
                AppError::NotFound("Conversion did not produce an artifact".to_string())
            })?,
    };

    let download_name = download_filename(&state, &job.document_id, &job.target_format).await;
    let content_length = state
        .storage
        .content_length(&output_key)
        .await
        .map_err(storage_error_to_app)?;

    tracing::debug!(output_key = %output_key, content_length, "streaming artifact with reclamation");

    // The underlying file is removed when this stream is dropped, after a
    // full read or an aborted transfer alike.
    let stream = state
        .storage
        .reclaim_stream(&output_key)
        .await
        .map_err(storage_error_to_app)?;
    let body_stream = stream.map(|result| {
        result.map_err(|e| std::io::Error::other(format!("Storage stream error: {}", e)))
    });

    let content_disposition = format!("attachment; filename=\"{}\"", download_name);

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type_for(&job.target_format))
        .header(header::CONTENT_LENGTH, content_length)
        .header(header::CONTENT_DISPOSITION, content_disposition.as_str())
        .body(Body::from_stream(body_stream))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))?;

    Ok(response)
}

/// Name the download after the original upload where possible, falling back
/// to the job id when the document was already deleted.
async fn download_filename(state: &AppState, document_id: &Uuid, target_format: &str) -> String {
    let stem = match state.documents.get_by_id(*document_id).await {
        Ok(Some(document)) => {
            let name = document.original_filename;
            name.rsplit_once('.')
                .map(|(stem, _)| stem.to_string())
                .unwrap_or(name)
        }
        _ => document_id.to_string(),
    };
    format!("{stem}.{target_format}")
}

fn content_type_for(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "doc" => "application/msword",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "tex" => "application/x-tex",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::content_type_for;

    #[test]
    fn known_extensions_map_to_concrete_types() {
        assert_eq!(content_type_for("pdf"), "application/pdf");
        assert_eq!(content_type_for("jpg"), "image/jpeg");
        assert_eq!(content_type_for("weird"), "application/octet-stream");
    }
}
