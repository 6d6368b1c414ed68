//! Content generation worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use recap_engine::{ManifestBuilder, ManifestConfig, ScoringConfig, TemporalMatcher};
use recap_queue::{JobQueue, RedisJobStore};
use recap_storage::{BlobStore, ContentItemStore, R2Client};
use recap_worker::collaborators::{
    DiscordNotifier, EmptyEventFeed, NoopJudge, NoopNotifier, Notifier, TracingErrorTracker,
};
use recap_worker::{JobExecutor, JobProcessor, ProcessingContext, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("recap=info".parse().expect("valid directive"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting recap-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let blob_store: Arc<dyn BlobStore> = match R2Client::from_env().await {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to create R2 client: {}", e);
            std::process::exit(1);
        }
    };

    let job_store = match RedisJobStore::from_env() {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to create job store: {}", e);
            std::process::exit(1);
        }
    };

    let queue = match JobQueue::from_env() {
        Ok(q) => q,
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };

    let scoring = ScoringConfig::from_env();
    let builder = match ManifestBuilder::new(ManifestConfig::default(), scoring) {
        Ok(b) => b,
        Err(e) => {
            error!("Invalid scoring configuration: {}", e);
            std::process::exit(1);
        }
    };

    let notifier: Arc<dyn Notifier> = match DiscordNotifier::from_env() {
        Some(discord) => Arc::new(discord),
        None => {
            info!("DISCORD_WEBHOOK_URL not set, notifications disabled");
            Arc::new(NoopNotifier)
        }
    };

    let ctx = ProcessingContext {
        config: config.clone(),
        item_store: ContentItemStore::new(Arc::clone(&blob_store)),
        blob_store,
        job_store,
        event_feed: Arc::new(EmptyEventFeed),
        judge: Arc::new(NoopJudge),
        notifier,
        error_tracker: Arc::new(TracingErrorTracker),
        matcher: TemporalMatcher::new(),
        builder,
    };

    let processor = JobProcessor::new(Arc::new(ctx));
    let executor = JobExecutor::new(config, queue, processor);

    // Setup signal handlers
    let shutdown_handle = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    shutdown_handle.await.ok();

    info!("Worker shutdown complete");
}
