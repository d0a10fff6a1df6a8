//! OpenAPI documentation.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use docsmith_core::models;

struct ApiKeySecurity;

impl Modify for ApiKeySecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Api-Key"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Docsmith API",
        version = "0.1.0",
        description = "Document conversion service. Upload a document, convert it through a fixed tool table (LibreOffice, ImageMagick, pandoc, pdflatex), and download the result once. All endpoints are versioned under /api/v0/."
    ),
    paths(
        handlers::convert::convert_document,
        handlers::download::download_artifact,
        handlers::jobs::get_job,
        handlers::jobs::list_jobs,
        handlers::conversions::list_conversions,
        handlers::documents::get_document,
        handlers::documents::delete_document,
        handlers::health::health,
    ),
    components(schemas(
        models::ConversionJobResponse,
        models::DocumentResponse,
        models::JobStatus,
        models::DocumentStatus,
        handlers::conversions::SupportedConversion,
        handlers::documents::DocumentDetailResponse,
        error::ErrorResponse,
    )),
    modifiers(&ApiKeySecurity),
    tags(
        (name = "conversions", description = "Upload, convert, and retrieve documents"),
        (name = "documents", description = "Stored document records"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
