//! Worker configuration.

use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs in a batch
    pub max_concurrent_jobs: usize,
    /// Job record time-to-live, hours
    pub job_ttl_hours: i64,
    /// Bounded wait applied to notification delivery
    pub notify_timeout: Duration,
    /// How often the expiry sweep runs
    pub sweep_interval: Duration,
    /// How long one consume call blocks waiting for messages, milliseconds
    pub consume_block_ms: u64,
    /// Graceful shutdown timeout
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 5,
            job_ttl_hours: 24,
            notify_timeout: Duration::from_secs(5),
            sweep_interval: Duration::from_secs(300),
            consume_block_ms: 1000,
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            job_ttl_hours: std::env::var("WORKER_JOB_TTL_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(24),
            notify_timeout: Duration::from_secs(
                std::env::var("WORKER_NOTIFY_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            sweep_interval: Duration::from_secs(
                std::env::var("WORKER_SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(300),
            ),
            consume_block_ms: std::env::var("WORKER_CONSUME_BLOCK_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}
