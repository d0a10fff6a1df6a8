use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle of an uploaded source file. Transitions are forward-only:
/// `uploaded -> processing -> converted | failed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "document_status", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Uploaded,
    Processing,
    Converted,
    Failed,
}

impl DocumentStatus {
    /// Whether moving from `self` to `next` is a legal forward transition.
    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        matches!(
            (self, next),
            (DocumentStatus::Uploaded, DocumentStatus::Processing)
                | (DocumentStatus::Processing, DocumentStatus::Converted)
                | (DocumentStatus::Processing, DocumentStatus::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Converted | DocumentStatus::Failed)
    }
}

impl Display for DocumentStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            DocumentStatus::Uploaded => write!(f, "uploaded"),
            DocumentStatus::Processing => write!(f, "processing"),
            DocumentStatus::Converted => write!(f, "converted"),
            DocumentStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for DocumentStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(DocumentStatus::Uploaded),
            "processing" => Ok(DocumentStatus::Processing),
            "converted" => Ok(DocumentStatus::Converted),
            "failed" => Ok(DocumentStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid document status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Document {
    pub id: Uuid,
    pub original_filename: String,
    pub file_extension: String,
    pub file_size: i64,
    /// Storage key under the upload root; unique per document.
    pub storage_key: String,
    pub status: DocumentStatus,
    /// Opaque reference to the uploading principal (auth is external).
    pub owner: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub original_filename: String,
    pub file_extension: String,
    pub file_size: i64,
    pub status: DocumentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(doc: Document) -> Self {
        DocumentResponse {
            id: doc.id,
            original_filename: doc.original_filename,
            file_extension: doc.file_extension,
            file_size: doc.file_size,
            status: doc.status,
            created_at: doc.created_at,
            updated_at: doc.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions_forward_only() {
        use DocumentStatus::*;

        assert!(Uploaded.can_transition_to(Processing));
        assert!(Processing.can_transition_to(Converted));
        assert!(Processing.can_transition_to(Failed));

        // No skips
        assert!(!Uploaded.can_transition_to(Converted));
        assert!(!Uploaded.can_transition_to(Failed));
        // No backward moves and no exits from terminal states
        assert!(!Processing.can_transition_to(Uploaded));
        assert!(!Converted.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Uploaded));
        assert!(!Converted.can_transition_to(Failed));
    }

    #[test]
    fn test_status_display_from_str_round_trip() {
        for status in [
            DocumentStatus::Uploaded,
            DocumentStatus::Processing,
            DocumentStatus::Converted,
            DocumentStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<DocumentStatus>().unwrap(), status);
        }
        assert!("uploading".parse::<DocumentStatus>().is_err());
    }

    #[test]
    fn test_document_response_from_document() {
        let now = Utc::now();
        let doc = Document {
            id: Uuid::new_v4(),
            original_filename: "report.pdf".to_string(),
            file_extension: "pdf".to_string(),
            file_size: 204800,
            storage_key: "uploads/abc_report.pdf".to_string(),
            status: DocumentStatus::Uploaded,
            owner: None,
            created_at: now,
            updated_at: now,
        };

        let response = DocumentResponse::from(doc.clone());
        assert_eq!(response.id, doc.id);
        assert_eq!(response.original_filename, "report.pdf");
        assert_eq!(response.file_size, 204800);
        assert_eq!(response.status, DocumentStatus::Uploaded);
    }
}
