//! Blob storage for the DevRecap backend.
//!
//! This crate provides:
//! - The narrow blob-store contract consumed by the pipeline
//! - A Cloudflare R2 implementation (S3 API)
//! - An in-memory implementation for tests
//! - Transcript / development-context artifact persistence
//! - The content item store

pub mod artifacts;
pub mod blob;
pub mod client;
pub mod error;
pub mod item_store;

pub use artifacts::{
    context_key, load_context, load_transcript, store_context, store_transcript, transcript_key,
};
pub use blob::{BlobStore, MemoryBlobStore};
pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
pub use item_store::ContentItemStore;
