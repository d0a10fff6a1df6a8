use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("unsupported conversion: {source_ext} -> {target}")]
    Unsupported {
        source_ext: String,
        target: String,
        supported: Vec<String>,
    },

    #[error("conversion tool not available: {tool}")]
    ToolNotAvailable { tool: String },

    #[error("{tool} exited with {}: {detail}", exit_label(*.exit_code))]
    ToolFailed {
        tool: String,
        exit_code: Option<i32>,
        detail: String,
    },

    #[error("{tool} did not finish within {}s", .timeout.as_secs())]
    TimedOut { tool: String, timeout: Duration },

    #[error("tool reported success but produced no output at {}", .expected.display())]
    OutputMissing { expected: PathBuf },

    #[error("io error during conversion: {0}")]
    Io(#[from] std::io::Error),
}

fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "signal".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_display_names_the_pair() {
        let err = ConvertError::Unsupported {
            source_ext: "png".to_string(),
            target: "docx".to_string(),
            supported: vec![],
        };
        assert_eq!(err.to_string(), "unsupported conversion: png -> docx");
        // the extension fields are payload, not a wrapped error
        assert!(std::error::Error::source(&err).is_none());
    }

    #[test]
    fn tool_failed_labels_signal_deaths() {
        let err = ConvertError::ToolFailed {
            tool: "soffice".to_string(),
            exit_code: None,
            detail: "killed".to_string(),
        };
        assert!(err.to_string().contains("signal"));
    }
}
