//! Content generation worker.
//!
//! This crate provides:
//! - Collaborator contracts (judge, notifier, error tracker)
//! - The job processor driving the five-step generation pipeline
//! - Batched processing with bounded fan-out
//! - The queue-consuming executor with graceful shutdown and the
//!   job-expiry sweep

pub mod collaborators;
pub mod config;
pub mod data_source;
pub mod error;
pub mod executor;
pub mod logging;
pub mod processor;

pub use collaborators::{
    DiscordNotifier, EmptyEventFeed, ErrorTracker, Judge, NoopJudge, NoopNotifier, Notifier,
    TracingErrorTracker,
};
pub use config::WorkerConfig;
pub use data_source::StoredItemData;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
pub use processor::{JobProcessor, ProcessingContext};
