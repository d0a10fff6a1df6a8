use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use docsmith_core::models::{ConversionJob, JobStatus};
use docsmith_core::AppError;

const JOB_COLUMNS: &str = r#"
    id,
    document_id,
    target_format,
    status,
    output_key,
    error_detail,
    created_at,
    started_at,
    completed_at
"#;

#[derive(Clone)]
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "conversion_jobs", db.operation = "insert"))]
    pub async fn create(
        &self,
        document_id: Uuid,
        target_format: &str,
    ) -> Result<ConversionJob, AppError> {
        let job: ConversionJob = sqlx::query_as::<Postgres, ConversionJob>(&format!(
            r#"
            INSERT INTO conversion_jobs (
                id, document_id, target_format, status, created_at
            )
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(document_id)
        .bind(target_format)
        .bind(JobStatus::Pending)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            job_id = %job.id,
            document_id = %document_id,
            target_format = %job.target_format,
            "conversion job created"
        );
        Ok(job)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<ConversionJob>, AppError> {
        let job = sqlx::query_as::<Postgres, ConversionJob>(&format!(
            "SELECT {JOB_COLUMNS} FROM conversion_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<ConversionJob>, AppError> {
        let jobs = sqlx::query_as::<Postgres, ConversionJob>(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM conversion_jobs
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }

    pub async fn list_for_document(
        &self,
        document_id: Uuid,
    ) -> Result<Vec<ConversionJob>, AppError> {
        let jobs = sqlx::query_as::<Postgres, ConversionJob>(&format!(
            r#"
            SELECT {JOB_COLUMNS} FROM conversion_jobs
            WHERE document_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }

    /// Claim a pending job for execution, stamping `started_at`. Returns
    /// `None` when the job was already claimed or finished.
    #[tracing::instrument(skip(self), fields(db.table = "conversion_jobs", db.operation = "update"))]
    pub async fn mark_processing(&self, id: Uuid) -> Result<Option<ConversionJob>, AppError> {
        let job = sqlx::query_as::<Postgres, ConversionJob>(&format!(
            r#"
            UPDATE conversion_jobs
            SET status = $2,
                started_at = NOW()
            WHERE id = $1 AND status = $3
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(JobStatus::Processing)
        .bind(JobStatus::Pending)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    /// Record a successful run and where the artifact lives.
    #[tracing::instrument(skip(self), fields(db.table = "conversion_jobs", db.operation = "update"))]
    pub async fn mark_completed(
        &self,
        id: Uuid,
        output_key: &str,
    ) -> Result<Option<ConversionJob>, AppError> {
        let job = sqlx::query_as::<Postgres, ConversionJob>(&format!(
            r#"
            UPDATE conversion_jobs
            SET status = $2,
                output_key = $3,
                completed_at = NOW()
            WHERE id = $1 AND status = $4
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(JobStatus::Completed)
        .bind(output_key)
        .bind(JobStatus::Processing)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(job) = &job {
            tracing::info!(job_id = %job.id, output_key, "conversion job completed");
        }
        Ok(job)
    }

    /// Record a failed or timed-out run. Only a claimed job can fail;
    /// anything else was never started and stays where it is.
    #[tracing::instrument(skip(self, error_detail), fields(db.table = "conversion_jobs", db.operation = "update"))]
    pub async fn mark_failed(
        &self,
        id: Uuid,
        status: JobStatus,
        error_detail: &str,
    ) -> Result<Option<ConversionJob>, AppError> {
        debug_assert!(matches!(status, JobStatus::Failed | JobStatus::TimedOut));
        let job = sqlx::query_as::<Postgres, ConversionJob>(&format!(
            r#"
            UPDATE conversion_jobs
            SET status = $2,
                error_detail = $3,
                completed_at = NOW()
            WHERE id = $1 AND status = $4
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(error_detail)
        .bind(JobStatus::Processing)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(job) = &job {
            tracing::warn!(job_id = %job.id, status = %job.status, "conversion job failed");
        }
        Ok(job)
    }
}
