//! Error types module
//!
//! All errors in the conversion pipeline are unified under the `AppError`
//! enum: intake validation, dispatch, external tool execution, storage and
//! database failures. Each variant self-describes its HTTP presentation
//! through the `ErrorMetadata` trait so callers can distinguish "your input
//! was wrong" from "the tool chain failed" programmatically.

use std::io;

use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
/// This trait allows errors to self-describe their HTTP response characteristics.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "UNSUPPORTED_CONVERSION")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("No file or empty filename supplied")]
    EmptyUpload,

    #[error("File type '{extension}' is not allowed (allowed: {allowed:?})")]
    InvalidFileType {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("File size {size} bytes exceeds maximum of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Conversion from '{source_format}' to '{target}' is not supported (valid targets: {supported:?})")]
    UnsupportedConversion {
        source_format: String,
        target: String,
        supported: Vec<String>,
    },

    #[error("Required external tool '{tool}' is not available on this host")]
    ToolNotAvailable { tool: String },

    #[error("Conversion failed: {detail}")]
    ConversionFailed { detail: String },

    #[error("Conversion timed out: '{tool}' exceeded {timeout_secs}s")]
    ConversionTimedOut { tool: String, timeout_secs: u64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// Reduces duplication in the ErrorMetadata impl; client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::EmptyUpload => (
            400,
            "EMPTY_UPLOAD",
            false,
            Some("Send exactly one non-empty multipart field named 'file'"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidFileType { .. } => (
            400,
            "INVALID_FILE_TYPE",
            false,
            Some("Upload a file with an allowed extension"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge { .. } => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::UnsupportedConversion { .. } => (
            400,
            "UNSUPPORTED_CONVERSION",
            false,
            Some("Request one of the listed valid target formats"),
            false,
            LogLevel::Debug,
        ),
        AppError::ToolNotAvailable { .. } => (
            503,
            "TOOL_NOT_AVAILABLE",
            false,
            Some("Install the named tool on the host, then retry"),
            false,
            LogLevel::Warn,
        ),
        AppError::ConversionFailed { .. } => (
            500,
            "CONVERSION_FAILED",
            false,
            Some("Check the input file; the uploaded original is preserved for retry"),
            false,
            LogLevel::Error,
        ),
        AppError::ConversionTimedOut { .. } => (
            504,
            "CONVERSION_TIMED_OUT",
            true,
            Some("Retry with a smaller input or raise the tool timeout"),
            false,
            LogLevel::Warn,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists and was not already reclaimed"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check the X-Api-Key header"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::EmptyUpload => "EmptyUpload",
            AppError::InvalidFileType { .. } => "InvalidFileType",
            AppError::PayloadTooLarge { .. } => "PayloadTooLarge",
            AppError::UnsupportedConversion { .. } => "UnsupportedConversion",
            AppError::ToolNotAvailable { .. } => "ToolNotAvailable",
            AppError::ConversionFailed { .. } => "ConversionFailed",
            AppError::ConversionTimedOut { .. } => "ConversionTimedOut",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::Internal(_) => "Internal",
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            // Validation and conversion errors carry caller-actionable text
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_unsupported_conversion() {
        let err = AppError::UnsupportedConversion {
            source_format: "pdf".to_string(),
            target: "mp4".to_string(),
            supported: vec!["docx".to_string(), "jpg".to_string(), "tex".to_string()],
        };
        assert_eq!(err.http_status_code(), 400);
        assert_eq!(err.error_code(), "UNSUPPORTED_CONVERSION");
        assert!(!err.is_recoverable());
        // The client message must enumerate valid targets for caller guidance
        assert!(err.client_message().contains("docx"));
        assert!(err.client_message().contains("jpg"));
        assert!(err.client_message().contains("tex"));
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_unsupported_conversion_names_both_formats() {
        let err = AppError::UnsupportedConversion {
            source_format: "png".to_string(),
            target: "docx".to_string(),
            supported: vec![],
        };
        assert!(err.to_string().contains("'png'"));
        assert!(err.to_string().contains("'docx'"));
        // the format fields are payload, not a wrapped error
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn test_error_metadata_tool_not_available() {
        let err = AppError::ToolNotAvailable {
            tool: "pdflatex".to_string(),
        };
        assert_eq!(err.http_status_code(), 503);
        assert_eq!(err.error_code(), "TOOL_NOT_AVAILABLE");
        // The response must name the missing tool (actionable detail)
        assert!(err.client_message().contains("pdflatex"));
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_timed_out() {
        let err = AppError::ConversionTimedOut {
            tool: "soffice".to_string(),
            timeout_secs: 120,
        };
        assert_eq!(err.http_status_code(), 504);
        assert_eq!(err.error_code(), "CONVERSION_TIMED_OUT");
        assert!(err.is_recoverable());
        assert!(err.client_message().contains("120"));
    }

    #[test]
    fn test_error_metadata_payload_too_large() {
        let err = AppError::PayloadTooLarge {
            size: 20 * 1024 * 1024,
            max: 16 * 1024 * 1024,
        };
        assert_eq!(err.http_status_code(), 413);
        assert_eq!(err.error_code(), "PAYLOAD_TOO_LARGE");
        assert!(!err.is_sensitive());
    }

    #[test]
    fn test_sensitive_errors_hide_detail() {
        let err = AppError::Internal("connection pool exhausted".to_string());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Internal server error");

        let err = AppError::Storage("disk full at /var/lib".to_string());
        assert!(err.is_sensitive());
        assert_eq!(err.client_message(), "Failed to access storage");
    }

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("Artifact not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(err.client_message(), "Not found: Artifact not found");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }
}
