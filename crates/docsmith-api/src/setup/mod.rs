//! Application setup and initialization.
//!
//! Everything main.rs needs to bring the service up: database pool and
//! migrations, storage root, tool probing, and the router.

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use crate::state::AppState;
use docsmith_convert::{
    CapabilityMap, ConvertOptions, Dispatcher, RasterOptions, ToolchainPaths,
};
use docsmith_core::Config;
use docsmith_db::{DocumentRepository, JobRepository};

/// Initialize the entire application.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    let pool = database::setup_database(&config).await?;

    let storage = storage::setup_storage(&config).await?;

    let tools = ToolchainPaths {
        soffice: config.tool_paths.soffice.clone(),
        magick: config.tool_paths.magick.clone(),
        pandoc: config.tool_paths.pandoc.clone(),
        pdflatex: config.tool_paths.pdflatex.clone(),
    };
    let capabilities = CapabilityMap::probe(&tools).await;
    let missing = capabilities.missing();
    if !missing.is_empty() {
        tracing::warn!(
            tools = ?missing,
            "conversion tools not found; their conversions will be refused"
        );
    }
    let dispatcher = Arc::new(Dispatcher::new(
        tools,
        capabilities,
        ConvertOptions {
            tool_timeout: Duration::from_secs(config.tool_timeout_secs),
            raster: RasterOptions {
                density: config.raster_density,
                quality: config.raster_quality,
            },
        },
    ));

    let state = Arc::new(AppState {
        documents: DocumentRepository::new(pool.clone()),
        jobs: JobRepository::new(pool.clone()),
        pool,
        storage,
        dispatcher,
        config: config.clone(),
    });

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
