//! Content generation core for the DevRecap backend.
//!
//! This crate provides:
//! - The temporal matcher correlating clips with development events
//! - The weighted scoring engine
//! - The manifest builder (selection and composition)
//!
//! Everything here is deterministic given its injected collaborators; all
//! I/O happens behind the `DevEventFeed` and `ItemDataSource` traits.

pub mod error;
pub mod manifest;
pub mod matcher;
pub mod scoring;

pub use error::{EngineError, EngineResult};
pub use manifest::{ItemDataSource, ManifestBuilder, ManifestConfig};
pub use matcher::{DevEventFeed, TemporalMatcher};
pub use scoring::{normalize_weights, CandidateSignals, ScoringConfig, ScoringWeights};
