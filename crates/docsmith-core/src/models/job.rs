use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

/// State machine of one conversion attempt:
/// `pending -> processing -> {completed, failed, timed_out}`.
/// No transition skips `processing`; no transition leaves a terminal state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq, ToSchema)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    TimedOut,
}

impl JobStatus {
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Pending, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
                | (JobStatus::Processing, JobStatus::TimedOut)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::TimedOut
        )
    }
}

impl Display for JobStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

impl FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "timed_out" => Ok(JobStatus::TimedOut),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversionJob {
    pub id: Uuid,
    pub document_id: Uuid,
    pub target_format: String,
    pub status: JobStatus,
    /// Set if and only if status is `completed`.
    pub output_key: Option<String>,
    /// Set if and only if status is `failed` or `timed_out`.
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ConversionJob {
    /// Invariant check: a terminal job has exactly one of output/error set,
    /// matching its status.
    pub fn is_consistent(&self) -> bool {
        match self.status {
            JobStatus::Completed => self.output_key.is_some() && self.error_detail.is_none(),
            JobStatus::Failed | JobStatus::TimedOut => {
                self.output_key.is_none() && self.error_detail.is_some()
            }
            JobStatus::Pending | JobStatus::Processing => {
                self.output_key.is_none() && self.error_detail.is_none()
            }
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ConversionJobResponse {
    pub id: Uuid,
    pub document_id: Uuid,
    pub target_format: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl From<ConversionJob> for ConversionJobResponse {
    fn from(job: ConversionJob) -> Self {
        let download_url = match job.status {
            JobStatus::Completed => Some(format!("/api/v0/download/{}", job.id)),
            _ => None,
        };
        ConversionJobResponse {
            id: job.id,
            document_id: job.document_id,
            target_format: job.target_format,
            status: job.status,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            error_message: job.error_detail,
            download_url,
        }
    }
}
