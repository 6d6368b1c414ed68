//! Injected collaborator contracts.
//!
//! The processor's decision logic (step sequencing, state transitions)
//! only ever talks to these traits, so it is testable without network I/O.

use async_trait::async_trait;
use tracing::{debug, error, warn};

use recap_models::{JobId, JobState, JudgeVerdict, Manifest};

use crate::error::{WorkerError, WorkerResult};

/// Automated judgment of draft content.
#[async_trait]
pub trait Judge: Send + Sync {
    /// Evaluate a draft manifest. The verdict is opaque to the pipeline.
    async fn evaluate(&self, draft: &Manifest) -> WorkerResult<JudgeVerdict>;
}

/// Fire-and-forget delivery of job lifecycle events.
///
/// Failures here must never fail the job; callers wrap delivery in a
/// bounded wait and drop errors.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn job_completed(&self, job: &JobState) -> WorkerResult<()>;

    async fn job_failed(&self, job: &JobState) -> WorkerResult<()>;
}

/// External error-tracking collaborator.
#[async_trait]
pub trait ErrorTracker: Send + Sync {
    async fn report(&self, job_id: &JobId, error: &str);
}

/// Judge used when no judging service is configured: every draft passes
/// with an empty verdict.
#[derive(Default)]
pub struct NoopJudge;

#[async_trait]
impl Judge for NoopJudge {
    async fn evaluate(&self, _draft: &Manifest) -> WorkerResult<JudgeVerdict> {
        Ok(JudgeVerdict {
            overall: 0.0,
            axes: Default::default(),
        })
    }
}

/// Event feed used when no code-hosting client is configured: no events,
/// so every clip matches with zero confidence.
#[derive(Default)]
pub struct EmptyEventFeed;

#[async_trait]
impl recap_engine::DevEventFeed for EmptyEventFeed {
    async fn events_between(
        &self,
        _start: chrono::DateTime<chrono::Utc>,
        _end: chrono::DateTime<chrono::Utc>,
    ) -> recap_engine::EngineResult<Vec<recap_models::DevEvent>> {
        Ok(Vec::new())
    }
}

/// Notifier that posts job events to a Discord webhook.
pub struct DiscordNotifier {
    webhook_url: String,
    client: reqwest::Client,
}

impl DiscordNotifier {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Create from the `DISCORD_WEBHOOK_URL` environment variable.
    pub fn from_env() -> Option<Self> {
        std::env::var("DISCORD_WEBHOOK_URL").ok().map(Self::new)
    }

    async fn post(&self, content: String) -> WorkerResult<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(&serde_json::json!({ "content": content }))
            .send()
            .await
            .map_err(|e| WorkerError::notify_failed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(WorkerError::notify_failed(format!(
                "Webhook returned {}",
                response.status()
            )));
        }

        debug!("Delivered Discord notification");
        Ok(())
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn job_completed(&self, job: &JobState) -> WorkerResult<()> {
        let sections = job
            .results
            .as_ref()
            .and_then(|r| r.get("section_count"))
            .and_then(|v| v.as_u64())
            .unwrap_or(0);

        self.post(format!(
            "Digest job `{}` completed with {} sections",
            job.job_id, sections
        ))
        .await
    }

    async fn job_failed(&self, job: &JobState) -> WorkerResult<()> {
        let reason = job.error_message.as_deref().unwrap_or("unknown error");
        self.post(format!("Digest job `{}` failed: {}", job.job_id, reason))
            .await
    }
}

/// Notifier that drops all events. Used in tests and when no webhook is
/// configured.
#[derive(Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn job_completed(&self, job: &JobState) -> WorkerResult<()> {
        debug!(job_id = %job.job_id, "Notification skipped (noop notifier)");
        Ok(())
    }

    async fn job_failed(&self, job: &JobState) -> WorkerResult<()> {
        debug!(job_id = %job.job_id, "Notification skipped (noop notifier)");
        Ok(())
    }
}

/// Error tracker that logs reports at error level.
#[derive(Default)]
pub struct TracingErrorTracker;

#[async_trait]
impl ErrorTracker for TracingErrorTracker {
    async fn report(&self, job_id: &JobId, error: &str) {
        error!(job_id = %job_id, "Job error reported: {}", error);
    }
}

/// Deliver a notification with a bounded wait, swallowing failures.
pub(crate) async fn notify_bounded<F>(timeout: std::time::Duration, delivery: F)
where
    F: std::future::Future<Output = WorkerResult<()>>,
{
    match tokio::time::timeout(timeout, delivery).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Notification delivery failed: {}", e),
        Err(_) => warn!("Notification delivery timed out"),
    }
}
