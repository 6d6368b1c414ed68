//! Worker error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Job failed: {0}")]
    JobFailed(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job {0} is already terminal")]
    TerminalState(String),

    #[error("Judging failed: {0}")]
    JudgeFailed(String),

    #[error("Notification failed: {0}")]
    NotifyFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] recap_storage::StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] recap_queue::QueueError),

    #[error("Engine error: {0}")]
    Engine(#[from] recap_engine::EngineError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_failed(msg: impl Into<String>) -> Self {
        Self::JobFailed(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn job_not_found(id: impl Into<String>) -> Self {
        Self::JobNotFound(id.into())
    }

    pub fn terminal_state(id: impl Into<String>) -> Self {
        Self::TerminalState(id.into())
    }

    pub fn judge_failed(msg: impl Into<String>) -> Self {
        Self::JudgeFailed(msg.into())
    }

    pub fn notify_failed(msg: impl Into<String>) -> Self {
        Self::NotifyFailed(msg.into())
    }

    /// Terminal-state rejections are no-ops, not pipeline failures.
    pub fn is_terminal_rejection(&self) -> bool {
        matches!(self, WorkerError::TerminalState(_))
    }
}
