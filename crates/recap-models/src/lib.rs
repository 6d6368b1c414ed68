//! Shared data models for the DevRecap backend.
//!
//! This crate provides Serde-serializable types for:
//! - Content items (clips) and their processing lifecycle
//! - Development events and correlated GitHub context
//! - Generation jobs and their status read model
//! - Content generation requests
//! - Manifests and manifest sections

pub mod github;
pub mod item;
pub mod job;
pub mod manifest;
pub mod request;

// Re-export common types
pub use github::{repo_from_pr_url, DevEvent, DevEventKind, GitHubContext, MatchReason};
pub use item::{
    ArtifactRef, ClipId, ClipIdError, ContentItem, ItemStateError, ProcessingStatus, Transcript,
};
pub use job::{JobId, JobProgress, JobState, JobStatus, JobStatusView};
pub use manifest::{
    AlignmentStatus, JudgeVerdict, Manifest, ManifestSection, ManifestStatus, MAX_BULLETS,
    MIN_BULLETS,
};
pub use request::{ContentGenerationRequest, ContentType, DateRange, RequestFilters};
