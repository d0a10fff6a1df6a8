use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::{convert_error_to_app, storage_error_to_app, ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::{
    extract_conversion_request, sanitize_filename, validate_file_extension, validate_file_size,
};
use docsmith_convert::{ConversionKind, ConvertError};
use docsmith_core::models::{ConversionJob, ConversionJobResponse, Document, DocumentStatus, JobStatus};
use docsmith_core::AppError;

/// Upload a document and convert it in one request.
///
/// The multipart form carries the file plus a `target_format` field, which
/// may be a bare format (`docx`) or an action id (`pdf_to_word`). The
/// response is the finished job record; on failure the uploaded original is
/// kept so the conversion can be retried.
#[utoipa::path(
    post,
    path = "/api/v0/convert",
    tag = "conversions",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Conversion completed", body = ConversionJobResponse),
        (status = 400, description = "Invalid file type or unsupported conversion", body = ErrorResponse),
        (status = 413, description = "File exceeds upload limit", body = ErrorResponse),
        (status = 500, description = "Conversion tool failed", body = ErrorResponse),
        (status = 503, description = "Required tool not installed", body = ErrorResponse),
        (status = 504, description = "Conversion timed out", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "convert_document"))]
pub async fn convert_document(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let (data, filename, target_format) = extract_conversion_request(multipart).await?;
    validate_file_size(data.len(), state.config.max_upload_size_bytes)?;

    let safe_name = sanitize_filename(&filename);
    let extension = validate_file_extension(&safe_name, &state.config.allowed_extensions)?;

    // Resolve against the dispatch table before touching storage, so an
    // unsupported request leaves nothing behind.
    let kind = state
        .dispatcher
        .resolve(&extension, &target_format)
        .map_err(convert_error_to_app)?;

    let document_id = Uuid::new_v4();
    let storage_key = format!(
        "{}/{}_{}",
        state.config.upload_prefix(),
        document_id,
        safe_name
    );
    let file_size = data.len() as i64;

    state
        .storage
        .save(&storage_key, data)
        .await
        .map_err(storage_error_to_app)?;

    let document = match state
        .documents
        .create(
            document_id,
            &safe_name,
            &extension,
            file_size,
            &storage_key,
            None,
        )
        .await
    {
        Ok(document) => document,
        Err(err) => {
            // Stored bytes must not outlive a failed record insert.
            if let Err(cleanup_err) = state.storage.delete(&storage_key).await {
                tracing::warn!(
                    storage_key = %storage_key,
                    error = %cleanup_err,
                    "failed to clean up orphaned upload"
                );
            }
            return Err(err.into());
        }
    };

    let job = state
        .jobs
        .create(document.id, kind.target_extension())
        .await?;

    let response = run_conversion(&state, kind, &document, job).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Drive one job through its state machine: claim it, execute the tool
/// passes, and record the outcome on both the job and the document.
async fn run_conversion(
    state: &AppState,
    kind: ConversionKind,
    document: &Document,
    job: ConversionJob,
) -> Result<ConversionJobResponse, HttpAppError> {
    state
        .documents
        .transition_status(
            document.id,
            DocumentStatus::Uploaded,
            DocumentStatus::Processing,
        )
        .await?;
    state
        .jobs
        .mark_processing(job.id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("job {} was already claimed", job.id)))?;

    // From here the job is claimed; any exit must land it in a terminal state.
    let paths = state.storage.fs_path(&document.storage_key).and_then(|input| {
        let output_dir = state.storage.fs_path(state.config.output_prefix())?;
        Ok((input, output_dir))
    });
    let (input, output_dir) = match paths {
        Ok(paths) => paths,
        Err(err) => {
            let app_err = storage_error_to_app(err);
            fail_job(state, document.id, job.id, JobStatus::Failed, &app_err.to_string()).await;
            return Err(app_err.into());
        }
    };

    match state
        .dispatcher
        .execute(kind, job.id, &input, &output_dir)
        .await
    {
        Ok(_artifact) => {
            let output_key = format!(
                "{}/{}.{}",
                state.config.output_prefix(),
                job.id,
                kind.target_extension()
            );
            let job = state
                .jobs
                .mark_completed(job.id, &output_key)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(format!("job {} left processing unexpectedly", job.id))
                })?;
            state
                .documents
                .transition_status(
                    document.id,
                    DocumentStatus::Processing,
                    DocumentStatus::Converted,
                )
                .await?;
            Ok(job.into())
        }
        Err(err) => {
            let status = if matches!(err, ConvertError::TimedOut { .. }) {
                JobStatus::TimedOut
            } else {
                JobStatus::Failed
            };
            let app_err = convert_error_to_app(err);
            fail_job(state, document.id, job.id, status, &app_err.to_string()).await;
            Err(app_err.into())
        }
    }
}

/// Record a failure on both the job and the document. Losing the record is
/// worse than losing the response, so bookkeeping errors are logged rather
/// than propagated.
async fn fail_job(
    state: &AppState,
    document_id: Uuid,
    job_id: Uuid,
    status: JobStatus,
    detail: &str,
) {
    if let Err(db_err) = state.jobs.mark_failed(job_id, status, detail).await {
        tracing::error!(job_id = %job_id, error = %db_err, "failed to record job failure");
    }
    if let Err(db_err) = state
        .documents
        .transition_status(
            document_id,
            DocumentStatus::Processing,
            DocumentStatus::Failed,
        )
        .await
    {
        tracing::error!(
            document_id = %document_id,
            error = %db_err,
            "failed to record document failure"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use std::path::{Path, PathBuf};
    use tower::ServiceExt;

    use docsmith_convert::{CapabilityMap, ConvertOptions, Dispatcher, ToolchainPaths};
    use docsmith_core::config::ToolPaths;
    use docsmith_core::Config;
    use docsmith_db::{DocumentRepository, JobRepository};
    use docsmith_storage::{LocalStorage, Storage};

    const BOUNDARY: &str = "A1b2C3d4e5F6g7H8";

    fn test_config(storage_root: &Path, max_upload: usize) -> Config {
        Config {
            server_port: 0,
            // Lazy pool; rejected requests must never reach it.
            database_url: "postgres://docsmith@localhost:1/docsmith".to_string(),
            environment: "development".to_string(),
            cors_origins: vec!["*".to_string()],
            api_key: None,
            db_max_connections: 1,
            db_timeout_seconds: 1,
            storage_root: storage_root.display().to_string(),
            max_upload_size_bytes: max_upload,
            allowed_extensions: ["pdf", "doc", "docx", "tex", "jpg", "jpeg", "png"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            tool_paths: ToolPaths {
                soffice: "true".to_string(),
                magick: "true".to_string(),
                pandoc: "true".to_string(),
                pdflatex: "true".to_string(),
            },
            tool_timeout_secs: 5,
            raster_density: 300,
            raster_quality: 90,
            http_concurrency_limit: 16,
        }
    }

    async fn test_app(storage_root: &Path, max_upload: usize) -> Router {
        let config = test_config(storage_root, max_upload);
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&config.database_url)
            .unwrap();
        let storage: Arc<dyn Storage> = Arc::new(
            LocalStorage::new(storage_root.to_path_buf()).await.unwrap(),
        );
        let tools = ToolchainPaths {
            soffice: "true".into(),
            magick: "true".into(),
            pandoc: "true".into(),
            pdflatex: "true".into(),
        };
        let capabilities = CapabilityMap::probe(&tools).await;
        let dispatcher = Arc::new(Dispatcher::new(
            tools,
            capabilities,
            ConvertOptions::default(),
        ));
        let state = Arc::new(AppState {
            config,
            documents: DocumentRepository::new(pool.clone()),
            jobs: JobRepository::new(pool.clone()),
            pool,
            storage,
            dispatcher,
        });
        Router::new()
            .route("/api/v0/convert", post(convert_document))
            .with_state(state)
    }

    fn multipart_request(parts: &[(&str, Option<&str>, &[u8])]) -> HttpRequest<Body> {
        let mut body = Vec::new();
        for (name, filename, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match filename {
                Some(filename) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        HttpRequest::post("/api/v0/convert")
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn error_code(response: axum::response::Response) -> (StatusCode, String) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        (status, json["code"].as_str().unwrap_or_default().to_string())
    }

    fn stored_files(root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    stack.push(path);
                } else {
                    files.push(path);
                }
            }
        }
        files
    }

    #[tokio::test]
    async fn missing_file_field_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let app = test_app(root.path(), 1024).await;

        let response = app
            .oneshot(multipart_request(&[("target_format", None, b"docx")]))
            .await
            .unwrap();

        let (status, code) = error_code(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "EMPTY_UPLOAD");
        assert!(stored_files(root.path()).is_empty());
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let app = test_app(root.path(), 1024).await;

        let response = app
            .oneshot(multipart_request(&[
                ("file", Some("report.pdf"), b""),
                ("target_format", None, b"docx"),
            ]))
            .await
            .unwrap();

        let (status, code) = error_code(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "EMPTY_UPLOAD");
        assert!(stored_files(root.path()).is_empty());
    }

    #[tokio::test]
    async fn duplicate_file_fields_are_rejected() {
        let root = tempfile::tempdir().unwrap();
        let app = test_app(root.path(), 1024).await;

        let response = app
            .oneshot(multipart_request(&[
                ("file", Some("a.pdf"), b"pdf-bytes"),
                ("file", Some("b.pdf"), b"pdf-bytes"),
                ("target_format", None, b"docx"),
            ]))
            .await
            .unwrap();

        let (status, code) = error_code(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "INVALID_INPUT");
        assert!(stored_files(root.path()).is_empty());
    }

    #[tokio::test]
    async fn disallowed_extension_leaves_nothing_behind() {
        let root = tempfile::tempdir().unwrap();
        let app = test_app(root.path(), 1024).await;

        let response = app
            .oneshot(multipart_request(&[
                ("file", Some("setup.exe"), b"MZ..."),
                ("target_format", None, b"pdf"),
            ]))
            .await
            .unwrap();

        let (status, code) = error_code(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "INVALID_FILE_TYPE");
        assert!(stored_files(root.path()).is_empty());
    }

    #[tokio::test]
    async fn oversized_payload_leaves_nothing_behind() {
        let root = tempfile::tempdir().unwrap();
        let app = test_app(root.path(), 8).await;

        let response = app
            .oneshot(multipart_request(&[
                ("file", Some("report.pdf"), &[0u8; 64]),
                ("target_format", None, b"docx"),
            ]))
            .await
            .unwrap();

        let (status, code) = error_code(response).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(code, "PAYLOAD_TOO_LARGE");
        assert!(stored_files(root.path()).is_empty());
    }

    #[tokio::test]
    async fn unsupported_pair_is_rejected_before_storage() {
        let root = tempfile::tempdir().unwrap();
        let app = test_app(root.path(), 1024).await;

        let response = app
            .oneshot(multipart_request(&[
                ("file", Some("report.pdf"), b"pdf-bytes"),
                ("target_format", None, b"png"),
            ]))
            .await
            .unwrap();

        let (status, code) = error_code(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "UNSUPPORTED_CONVERSION");
        assert!(stored_files(root.path()).is_empty());
    }

    #[tokio::test]
    async fn action_field_aliases_target_format() {
        let root = tempfile::tempdir().unwrap();
        let app = test_app(root.path(), 1024).await;

        // An unsupported target through the alias proves the field was read:
        // a dropped alias would surface as INVALID_INPUT instead.
        let response = app
            .oneshot(multipart_request(&[
                ("file", Some("report.pdf"), b"pdf-bytes"),
                ("action", None, b"png"),
            ]))
            .await
            .unwrap();

        let (status, code) = error_code(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "UNSUPPORTED_CONVERSION");
        assert!(stored_files(root.path()).is_empty());
    }

    #[tokio::test]
    async fn missing_target_format_is_rejected() {
        let root = tempfile::tempdir().unwrap();
        let app = test_app(root.path(), 1024).await;

        let response = app
            .oneshot(multipart_request(&[(
                "file",
                Some("report.pdf"),
                b"pdf-bytes",
            )]))
            .await
            .unwrap();

        let (status, code) = error_code(response).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "INVALID_INPUT");
        assert!(stored_files(root.path()).is_empty());
    }
}
