use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::HttpAppError;
use crate::state::AppState;
use docsmith_convert::ConversionKind;

#[derive(Debug, Serialize, ToSchema)]
pub struct SupportedConversion {
    /// Action id, usable as the `target_format` form field
    pub id: &'static str,
    pub source_extensions: Vec<&'static str>,
    pub target_extension: &'static str,
    pub tool: &'static str,
    /// False when the tool was not found at startup
    pub enabled: bool,
}

/// List every conversion in the dispatch table, flagging which ones are
/// usable on this host.
#[utoipa::path(
    get,
    path = "/api/v0/conversions",
    tag = "conversions",
    responses(
        (status = 200, description = "Supported conversions", body = Vec<SupportedConversion>)
    ),
    security(("api_key" = []))
)]
pub async fn list_conversions(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let capabilities = state.dispatcher.capabilities();
    let listing: Vec<SupportedConversion> = ConversionKind::ALL
        .into_iter()
        .map(|kind| SupportedConversion {
            id: kind.id(),
            source_extensions: kind.source_extensions().to_vec(),
            target_extension: kind.target_extension(),
            tool: kind.tool().name(),
            enabled: capabilities.available(kind.tool()),
        })
        .collect();

    Ok(Json(listing))
}
