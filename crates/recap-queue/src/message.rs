//! Queue message for generation jobs.

use serde::{Deserialize, Serialize};

use recap_models::{ContentGenerationRequest, JobId};

/// Message handed to the execution substrate for one generation job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJobMessage {
    /// Job ID allocated by `create_job`
    pub job_id: JobId,

    /// Original generation request
    pub request_data: ContentGenerationRequest,

    /// Worker that claimed the message, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<String>,
}

impl GenerationJobMessage {
    /// Create a new message.
    pub fn new(job_id: JobId, request_data: ContentGenerationRequest) -> Self {
        Self {
            job_id,
            request_data,
            worker_id: None,
        }
    }

    /// Tag the message with the claiming worker.
    pub fn with_worker(mut self, worker_id: impl Into<String>) -> Self {
        self.worker_id = Some(worker_id.into());
        self
    }

    /// Generate idempotency key for deduplication.
    pub fn idempotency_key(&self) -> String {
        format!("generate:{}", self.job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_idempotency_key_is_stable() {
        let end = Utc::now();
        let request = ContentGenerationRequest::daily(end - Duration::days(1), end);
        let msg = GenerationJobMessage::new(JobId::from_string("j-1"), request);

        assert_eq!(msg.idempotency_key(), "generate:j-1");
        assert_eq!(msg.clone().idempotency_key(), msg.idempotency_key());
    }

    #[test]
    fn test_message_roundtrip() {
        let end = Utc::now();
        let request = ContentGenerationRequest::daily(end - Duration::days(1), end);
        let msg = GenerationJobMessage::new(JobId::new(), request).with_worker("worker-1");

        let json = serde_json::to_string(&msg).unwrap();
        let back: GenerationJobMessage = serde_json::from_str(&json).unwrap();

        assert_eq!(back.job_id, msg.job_id);
        assert_eq!(back.worker_id.as_deref(), Some("worker-1"));
    }
}
