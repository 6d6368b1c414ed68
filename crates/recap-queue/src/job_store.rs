//! Durable job state store.
//!
//! `JobState` rows are stored whole and replaced in a single write, so a
//! concurrent status read always observes a complete row. Rows are only
//! mutated by the task that owns the job id.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use recap_models::{JobId, JobState, JobStatus};

use crate::error::QueueResult;

/// Aggregate job counts by status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStats {
    pub total: usize,
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl JobStats {
    fn count(mut jobs: Vec<JobState>) -> Self {
        let mut stats = Self {
            total: jobs.len(),
            ..Self::default()
        };
        for job in jobs.drain(..) {
            match job.status {
                JobStatus::Queued => stats.queued += 1,
                JobStatus::Processing => stats.processing += 1,
                JobStatus::Completed => stats.completed += 1,
                JobStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }
}

/// Durable record store for job state rows.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Write a row, replacing any previous version in one atomic update.
    async fn put(&self, job: &JobState) -> QueueResult<()>;

    /// Read a row by job id.
    async fn get(&self, id: &JobId) -> QueueResult<Option<JobState>>;

    /// Delete a row.
    async fn delete(&self, id: &JobId) -> QueueResult<()>;

    /// Most recently created rows first, up to `limit`.
    async fn list_recent(&self, limit: usize) -> QueueResult<Vec<JobState>>;

    /// Delete rows whose `expires_at` is in the past. Returns the number
    /// of rows reaped.
    async fn reap_expired(&self, now: DateTime<Utc>) -> QueueResult<u32>;

    /// Aggregate counts by status.
    async fn stats(&self) -> QueueResult<JobStats>;
}

/// Redis-backed job store.
///
/// Rows live at `recap:job:{id}`; an index set at `recap:job-index` makes
/// listing and the expiry sweep cheap.
pub struct RedisJobStore {
    client: redis::Client,
}

const JOB_INDEX_KEY: &str = "recap:job-index";

fn job_key(id: &JobId) -> String {
    format!("recap:job:{}", id)
}

impl RedisJobStore {
    /// Create a new store.
    pub fn new(redis_url: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Create from environment variables.
    pub fn from_env() -> QueueResult<Self> {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&redis_url)
    }

    async fn load_all(&self) -> QueueResult<Vec<JobState>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let ids: Vec<String> = conn.smembers(JOB_INDEX_KEY).await?;

        let mut jobs = Vec::with_capacity(ids.len());
        for id in ids {
            let payload: Option<String> = conn.get(job_key(&JobId::from_string(&id))).await?;
            match payload {
                Some(json) => match serde_json::from_str::<JobState>(&json) {
                    Ok(job) => jobs.push(job),
                    Err(e) => warn!(job_id = %id, error = %e, "Skipping unreadable job row"),
                },
                // Row gone but index entry left behind; clean it up.
                None => {
                    conn.srem::<_, _, ()>(JOB_INDEX_KEY, &id).await?;
                }
            }
        }

        Ok(jobs)
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn put(&self, job: &JobState) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(job)?;

        conn.set::<_, _, ()>(job_key(&job.job_id), payload).await?;
        conn.sadd::<_, _, ()>(JOB_INDEX_KEY, job.job_id.as_str())
            .await?;

        debug!(job_id = %job.job_id, status = job.status.as_str(), "Stored job row");
        Ok(())
    }

    async fn get(&self, id: &JobId) -> QueueResult<Option<JobState>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(job_key(id)).await?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, id: &JobId) -> QueueResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del::<_, ()>(job_key(id)).await?;
        conn.srem::<_, _, ()>(JOB_INDEX_KEY, id.as_str()).await?;
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> QueueResult<Vec<JobState>> {
        let mut jobs = self.load_all().await?;
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn reap_expired(&self, now: DateTime<Utc>) -> QueueResult<u32> {
        let jobs = self.load_all().await?;
        let mut reaped = 0;

        for job in jobs {
            if job.is_expired(now) {
                self.delete(&job.job_id).await?;
                reaped += 1;
            }
        }

        if reaped > 0 {
            info!("Reaped {} expired job rows", reaped);
        }
        Ok(reaped)
    }

    async fn stats(&self) -> QueueResult<JobStats> {
        Ok(JobStats::count(self.load_all().await?))
    }
}

/// In-memory job store for tests.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<String, JobState>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn put(&self, job: &JobState) -> QueueResult<()> {
        self.jobs
            .write()
            .await
            .insert(job.job_id.to_string(), job.clone());
        Ok(())
    }

    async fn get(&self, id: &JobId) -> QueueResult<Option<JobState>> {
        Ok(self.jobs.read().await.get(id.as_str()).cloned())
    }

    async fn delete(&self, id: &JobId) -> QueueResult<()> {
        self.jobs.write().await.remove(id.as_str());
        Ok(())
    }

    async fn list_recent(&self, limit: usize) -> QueueResult<Vec<JobState>> {
        let mut jobs: Vec<JobState> = self.jobs.read().await.values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs.truncate(limit);
        Ok(jobs)
    }

    async fn reap_expired(&self, now: DateTime<Utc>) -> QueueResult<u32> {
        let mut jobs = self.jobs.write().await;
        let before = jobs.len();
        jobs.retain(|_, job| !job.is_expired(now));
        Ok((before - jobs.len()) as u32)
    }

    async fn stats(&self) -> QueueResult<JobStats> {
        let jobs: Vec<JobState> = self.jobs.read().await.values().cloned().collect();
        Ok(JobStats::count(jobs))
    }
}
