//! Configuration module
//!
//! Environment-driven configuration for the API, storage layout, and the
//! external conversion tool chain. Every knob has a default so the service
//! starts with only `DATABASE_URL` set.

use std::env;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_UPLOAD_MB: usize = 16;
const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 120;
const DEFAULT_ALLOWED_EXTENSIONS: &str = "pdf,doc,docx,tex,jpg,jpeg,png";

/// Paths to the external conversion binaries. Constructed once and handed to
/// the dispatcher; never probed lazily per request.
#[derive(Clone, Debug)]
pub struct ToolPaths {
    pub soffice: String,
    pub magick: String,
    pub pandoc: String,
    pub pdflatex: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub environment: String,
    pub cors_origins: Vec<String>,
    pub api_key: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// Root directory holding `uploads/` and `jobs/` subtrees.
    pub storage_root: String,
    pub max_upload_size_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub tool_paths: ToolPaths,
    pub tool_timeout_secs: u64,
    /// Raster density passed to the image converter for pdf -> jpg.
    pub raster_density: u32,
    pub raster_quality: u32,
    pub http_concurrency_limit: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let cors_origins = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_upload_size_mb = env::var("MAX_UPLOAD_SIZE_MB")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_UPLOAD_MB);

        let allowed_extensions = env::var("ALLOWED_EXTENSIONS")
            .unwrap_or_else(|_| DEFAULT_ALLOWED_EXTENSIONS.to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Config {
            server_port: env::var("PORT")
                .ok()
                .and_then(|s| s.parse::<u16>().ok())
                .unwrap_or(8080),
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            environment,
            cors_origins,
            api_key: env::var("API_KEY").ok().filter(|k| !k.is_empty()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            storage_root: env::var("STORAGE_ROOT").unwrap_or_else(|_| "./data".to_string()),
            max_upload_size_bytes: max_upload_size_mb * 1024 * 1024,
            allowed_extensions,
            tool_paths: ToolPaths {
                soffice: env::var("SOFFICE_PATH").unwrap_or_else(|_| "soffice".to_string()),
                magick: env::var("MAGICK_PATH").unwrap_or_else(|_| "convert".to_string()),
                pandoc: env::var("PANDOC_PATH").unwrap_or_else(|_| "pandoc".to_string()),
                pdflatex: env::var("PDFLATEX_PATH").unwrap_or_else(|_| "pdflatex".to_string()),
            },
            tool_timeout_secs: env::var("TOOL_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS),
            raster_density: env::var("RASTER_DENSITY")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(300),
            raster_quality: env::var("RASTER_QUALITY")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(90),
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(1024)
                .max(1),
        })
    }

    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn upload_prefix(&self) -> &'static str {
        "uploads"
    }

    pub fn output_prefix(&self) -> &'static str {
        "jobs"
    }
}
