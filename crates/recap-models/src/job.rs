//! Generation job records and the status read model.

use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::ContentGenerationRequest;

/// Unique identifier for a generation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting in queue
    #[default]
    Queued,
    /// Job is being processed
    Processing,
    /// Job completed successfully (terminal)
    Completed,
    /// Job failed (terminal)
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Structured pipeline progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct JobProgress {
    /// Name of the step about to run
    pub step: String,
    /// 1-based step index
    pub current: u32,
    /// Total number of steps
    pub total: u32,
}

/// One generation job record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobState {
    /// Unique job ID
    pub job_id: JobId,

    /// Job status
    #[serde(default)]
    pub status: JobStatus,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp; strictly increases with every mutation
    pub updated_at: DateTime<Utc>,

    /// When the record may be reaped by the cleanup sweep
    pub expires_at: DateTime<Utc>,

    /// Progress of the current pipeline step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<JobProgress>,

    /// Original generation request
    pub request: ContentGenerationRequest,

    /// Result payload (set on completion)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,

    /// Error message (set on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Worker that owns / owned the job
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,

    /// Started at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// Completed at timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobState {
    /// Create a new queued job.
    pub fn new(request: ContentGenerationRequest, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            job_id: JobId::new(),
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
            expires_at: now + ttl,
            progress: None,
            request,
            results: None,
            error_message: None,
            worker_id: None,
            started_at: None,
            completed_at: None,
        }
    }

    /// Bump `updated_at`, keeping it strictly increasing even when the
    /// clock has not advanced since the previous mutation.
    fn touch(&mut self) {
        let floor = self.updated_at + Duration::milliseconds(1);
        self.updated_at = Utc::now().max(floor);
    }

    /// Start processing the job.
    pub fn start(mut self, worker_id: Option<String>) -> Self {
        self.status = JobStatus::Processing;
        self.worker_id = worker_id;
        if self.started_at.is_none() {
            self.started_at = Some(Utc::now());
        }
        self.touch();
        self
    }

    /// Record the step about to run.
    pub fn with_progress(mut self, step: impl Into<String>, current: u32, total: u32) -> Self {
        self.progress = Some(JobProgress {
            step: step.into(),
            current,
            total,
        });
        self.touch();
        self
    }

    /// Mark the job completed with its result payload.
    ///
    /// Clears any error so exactly one of {results, error_message} is set.
    pub fn complete(mut self, results: serde_json::Value) -> Self {
        self.status = JobStatus::Completed;
        self.results = Some(results);
        self.error_message = None;
        self.completed_at = Some(Utc::now());
        self.touch();
        self
    }

    /// Mark the job failed with an error message.
    ///
    /// Clears any partial results so exactly one of {results, error_message}
    /// is set.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = JobStatus::Failed;
        self.error_message = Some(error.into());
        self.results = None;
        self.completed_at = Some(Utc::now());
        self.touch();
        self
    }

    /// Whether the record is past its expiry.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Build the polling read model for this record.
    pub fn status_view(&self) -> JobStatusView {
        JobStatusView {
            job_id: self.job_id.clone(),
            status: self.status,
            status_url: format!("/api/jobs/{}", self.job_id),
            expires_at: self.expires_at,
            progress: self.progress.clone(),
            results: self.results.clone(),
            error: self.error_message.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}

/// Read model returned to status-polling clients.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct JobStatusView {
    pub job_id: JobId,
    pub status: JobStatus,
    pub status_url: String,
    pub expires_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<JobProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}
