//! Job executor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use recap_queue::JobQueue;

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::processor::JobProcessor;

/// Consumes generation jobs from the queue and drives them through the
/// processor.
pub struct JobExecutor {
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    processor: JobProcessor,
    job_semaphore: Arc<Semaphore>,
    shutdown: tokio::sync::watch::Sender<bool>,
    consumer_name: String,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(config: WorkerConfig, queue: JobQueue, processor: JobProcessor) -> Self {
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
        let (shutdown, _) = tokio::sync::watch::channel(false);
        let consumer_name = format!("worker-{}", Uuid::new_v4());

        Self {
            config,
            queue: Arc::new(queue),
            processor,
            job_semaphore,
            shutdown,
            consumer_name,
        }
    }

    /// Start the executor.
    pub async fn run(&self) -> WorkerResult<()> {
        info!(
            "Starting job executor '{}' with {} max concurrent jobs",
            self.consumer_name, self.config.max_concurrent_jobs
        );

        self.queue.init().await?;

        let mut shutdown_rx = self.shutdown.subscribe();

        // Periodic sweep reaping job rows past their expiry.
        let sweep_processor = self.processor.clone();
        let sweep_interval = self.config.sweep_interval;
        let mut shutdown_rx_sweep = self.shutdown.subscribe();

        let sweep_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            loop {
                tokio::select! {
                    _ = shutdown_rx_sweep.changed() => {
                        if *shutdown_rx_sweep.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        match sweep_processor.reap_expired().await {
                            Ok(0) => {}
                            Ok(reaped) => info!("Expiry sweep reaped {} job rows", reaped),
                            Err(e) => warn!("Expiry sweep failed: {}", e),
                        }
                    }
                }
            }
        });

        // Main job consumption loop
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Shutdown signal received, stopping executor");
                        break;
                    }
                }
                result = self.consume_jobs() => {
                    if let Err(e) = result {
                        error!("Error consuming jobs: {}", e);
                        // Back off on error
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }

        sweep_task.abort();

        info!("Waiting for in-flight jobs to complete...");
        let _ = tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs()).await;

        info!("Job executor stopped");
        Ok(())
    }

    /// Consume and process jobs from the queue.
    async fn consume_jobs(&self) -> WorkerResult<()> {
        let available = self.job_semaphore.available_permits();
        if available == 0 {
            // All slots busy, wait a bit
            tokio::time::sleep(Duration::from_millis(100)).await;
            return Ok(());
        }

        let messages = self
            .queue
            .consume(
                &self.consumer_name,
                self.config.consume_block_ms,
                available.min(self.config.max_concurrent_jobs),
            )
            .await?;

        if messages.is_empty() {
            return Ok(());
        }

        debug!("Consumed {} jobs from queue", messages.len());

        for (message_id, message) in messages {
            let message = message.with_worker(self.consumer_name.clone());
            let processor = self.processor.clone();
            let queue = Arc::clone(&self.queue);
            let permit = self
                .job_semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| WorkerError::job_failed("Semaphore closed"))?;

            tokio::spawn(async move {
                let _permit = permit;
                Self::execute_job(processor, queue, message_id, message).await;
            });
        }

        Ok(())
    }

    /// Execute a single job and acknowledge the message.
    ///
    /// Both outcomes ack: the result lives on the job record, and retry
    /// policy belongs to an external scheduler, not this worker.
    async fn execute_job(
        processor: JobProcessor,
        queue: Arc<JobQueue>,
        message_id: String,
        message: recap_queue::GenerationJobMessage,
    ) {
        let job_id = message.job_id.clone();
        info!("Executing job {}", job_id);

        match processor.process_job(&message).await {
            Ok(_) => info!("Job {} completed successfully", job_id),
            Err(e) if e.is_terminal_rejection() => {
                warn!("Job {} already terminal, dropping duplicate delivery", job_id);
            }
            Err(e) => error!("Job {} failed: {}", job_id, e),
        }

        if let Err(e) = queue.ack(&message_id).await {
            error!("Failed to ack job {}: {}", job_id, e);
        }
    }

    /// Wait for all in-flight jobs to complete.
    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.config.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }
}
