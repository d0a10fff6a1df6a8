use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::error::HttpAppError;
use crate::state::AppState;

/// Service health: database reachability and which conversion tools were
/// detected at startup.
#[utoipa::path(
    get,
    path = "/api/v0/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health report")
    )
)]
pub async fn health(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let database = match sqlx::query("SELECT 1").execute(&state.pool).await {
        Ok(_) => "ok",
        Err(err) => {
            tracing::error!(error = %err, "health check failed to reach database");
            "unreachable"
        }
    };

    let capabilities = state.dispatcher.capabilities();
    let status = if database == "ok" { "ok" } else { "degraded" };

    Ok(Json(json!({
        "status": status,
        "database": database,
        "tools": capabilities.summary(),
        "missing_tools": capabilities.missing(),
    })))
}
