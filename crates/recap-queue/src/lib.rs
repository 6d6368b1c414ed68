//! Job queue and durable job state store for the DevRecap backend.
//!
//! This crate provides:
//! - The queue message for generation jobs
//! - A Redis Streams queue (enqueue with dedup, consume, ack)
//! - The durable `JobStore` contract with Redis and in-memory
//!   implementations, including the expiry sweep

pub mod error;
pub mod job_store;
pub mod message;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job_store::{JobStats, JobStore, MemoryJobStore, RedisJobStore};
pub use message::GenerationJobMessage;
pub use queue::{JobQueue, QueueConfig};
