use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use docsmith_core::models::{Document, DocumentStatus};
use docsmith_core::AppError;

const DOCUMENT_COLUMNS: &str = r#"
    id,
    original_filename,
    file_extension,
    file_size,
    storage_key,
    status,
    owner,
    created_at,
    updated_at
"#;

#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a freshly uploaded document. The caller has already written the
    /// bytes to storage under `storage_key`, which is derived from `id`.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "insert"))]
    pub async fn create(
        &self,
        id: Uuid,
        original_filename: &str,
        file_extension: &str,
        file_size: i64,
        storage_key: &str,
        owner: Option<&str>,
    ) -> Result<Document, AppError> {
        let document: Document = sqlx::query_as::<Postgres, Document>(&format!(
            r#"
            INSERT INTO documents (
                id, original_filename, file_extension, file_size,
                storage_key, status, owner, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW(), NOW())
            RETURNING {DOCUMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(original_filename)
        .bind(file_extension)
        .bind(file_size)
        .bind(storage_key)
        .bind(DocumentStatus::Uploaded)
        .bind(owner)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            document_id = %document.id,
            filename = %document.original_filename,
            size = document.file_size,
            "document record created"
        );
        Ok(document)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        let document = sqlx::query_as::<Postgres, Document>(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(document)
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<Postgres, Document>(&format!(
            r#"
            SELECT {DOCUMENT_COLUMNS} FROM documents
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(documents)
    }

    /// Move a document from `from` to `to`. Returns `None` when the row is no
    /// longer in `from`, which means another writer got there first.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "update"))]
    pub async fn transition_status(
        &self,
        id: Uuid,
        from: DocumentStatus,
        to: DocumentStatus,
    ) -> Result<Option<Document>, AppError> {
        let document = sqlx::query_as::<Postgres, Document>(&format!(
            r#"
            UPDATE documents
            SET status = $3,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {DOCUMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(doc) = &document {
            tracing::debug!(document_id = %doc.id, status = %doc.status, "document status updated");
        }
        Ok(document)
    }

    /// Delete a document row, returning it so the caller can reclaim the
    /// stored file. Conversion jobs referencing it go with it via cascade.
    #[tracing::instrument(skip(self), fields(db.table = "documents", db.operation = "delete"))]
    pub async fn delete(&self, id: Uuid) -> Result<Option<Document>, AppError> {
        let document = sqlx::query_as::<Postgres, Document>(&format!(
            "DELETE FROM documents WHERE id = $1 RETURNING {DOCUMENT_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(doc) = &document {
            tracing::info!(document_id = %doc.id, "document record deleted");
        }
        Ok(document)
    }
}
