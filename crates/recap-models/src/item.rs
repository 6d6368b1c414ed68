//! Content item (clip) models and processing lifecycle.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type ClipIdResult<T> = Result<T, ClipIdError>;

/// Error for invalid clip identifiers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClipIdError {
    #[error("Clip ID is empty")]
    Empty,

    #[error("Clip ID contains invalid characters: {0}")]
    InvalidCharacters(String),
}

/// Unique identifier for a content item (clip).
///
/// Valid IDs contain only ASCII alphanumerics, hyphens, and underscores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ClipId(String);

impl ClipId {
    /// Parse and validate a clip ID.
    pub fn parse(s: impl Into<String>) -> ClipIdResult<Self> {
        let s = s.into();
        let trimmed = s.trim();

        if trimmed.is_empty() {
            return Err(ClipIdError::Empty);
        }

        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ClipIdError::InvalidCharacters(trimmed.to_string()));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Processing status of a content item.
///
/// Statuses only advance forward; regressions are rejected by
/// [`ContentItem::advance_to`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
    Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Clip registered, nothing extracted yet
    #[default]
    Pending,
    /// Audio extracted and stored
    AudioReady,
    /// Transcript stored
    Transcribed,
    /// Development context attached
    Enhanced,
    /// Eligible for manifest selection
    ReadyForContent,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::AudioReady => "audio_ready",
            ProcessingStatus::Transcribed => "transcribed",
            ProcessingStatus::Enhanced => "enhanced",
            ProcessingStatus::ReadyForContent => "ready_for_content",
        }
    }
}

/// An externally produced transcript, consumed as an opaque input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transcript {
    /// Full transcript text
    pub text: String,

    /// Detected language, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Transcript {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language: None,
        }
    }

    /// Number of whitespace-separated words.
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Short summary used on artifact references.
    pub fn summary(&self, max_chars: usize) -> String {
        self.text.chars().take(max_chars).collect::<String>().trim().to_string()
    }
}

/// Reference to an externally stored artifact (transcript, context object).
///
/// Carries the stored byte size so emptiness checks need no storage
/// round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ArtifactRef {
    /// Storage key or URL of the artifact
    pub url: String,

    /// Size of the stored object in bytes
    pub size_bytes: u64,

    /// Short text summary of the artifact content
    #[serde(default)]
    pub summary: String,
}

impl ArtifactRef {
    /// Create a new artifact reference.
    pub fn new(url: impl Into<String>, size_bytes: u64, summary: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            size_bytes,
            summary: summary.into(),
        }
    }

    /// A reference is valid when it points at a non-empty object.
    pub fn is_valid(&self) -> bool {
        !self.url.is_empty() && self.size_bytes > 0
    }
}

/// Error for invalid content item state transitions.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ItemStateError {
    #[error("Cannot move item from {from} back to {to}")]
    Backward { from: &'static str, to: &'static str },

    #[error("Item {0} has no transcript reference but was marked ready for content")]
    MissingTranscript(String),
}

/// One content item per clip.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContentItem {
    /// Clip ID
    pub id: ClipId,

    /// Clip title
    pub title: String,

    /// Source URL of the clip
    pub source_url: String,

    /// Duration in seconds
    pub duration_seconds: f64,

    /// View count at ingestion time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,

    /// When the clip was created on the source platform
    pub created_at: DateTime<Utc>,

    /// Processing status
    #[serde(default)]
    pub status: ProcessingStatus,

    /// Reference to the stored transcript
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<ArtifactRef>,

    /// Reference to the stored development-context object
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_context: Option<ArtifactRef>,

    /// Externally supplied quality score in [0, 1]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,

    /// Derived content score (0-100)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_score: Option<u32>,

    /// Category/tag labels
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,

    /// When the item record was first stored
    pub stored_at: DateTime<Utc>,

    /// When the development context was attached
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_at: Option<DateTime<Utc>>,

    /// When the item became ready for content generation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_ready_at: Option<DateTime<Utc>>,
}

impl ContentItem {
    /// Create a new pending item.
    pub fn new(
        id: ClipId,
        title: impl Into<String>,
        source_url: impl Into<String>,
        duration_seconds: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            source_url: source_url.into(),
            duration_seconds,
            view_count: None,
            created_at,
            status: ProcessingStatus::Pending,
            transcript: None,
            github_context: None,
            quality_score: None,
            content_score: None,
            categories: Vec::new(),
            stored_at: Utc::now(),
            enhanced_at: None,
            content_ready_at: None,
        }
    }

    /// Set the view count.
    pub fn with_view_count(mut self, views: u64) -> Self {
        self.view_count = Some(views);
        self
    }

    /// Set category labels.
    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    /// Advance the processing status; backward transitions are rejected.
    pub fn advance_to(&mut self, next: ProcessingStatus) -> Result<(), ItemStateError> {
        if next < self.status {
            return Err(ItemStateError::Backward {
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        if next == ProcessingStatus::ReadyForContent
            && !self.transcript.as_ref().is_some_and(ArtifactRef::is_valid)
        {
            return Err(ItemStateError::MissingTranscript(self.id.to_string()));
        }
        self.status = next;
        Ok(())
    }

    /// Attach a transcript reference and mark the item transcribed.
    pub fn transcribed(mut self, transcript: ArtifactRef) -> Self {
        self.transcript = Some(transcript);
        self.status = self.status.max(ProcessingStatus::Transcribed);
        self
    }

    /// Attach a development-context reference and mark the item enhanced.
    pub fn enhanced(mut self, context: ArtifactRef) -> Self {
        self.github_context = Some(context);
        self.status = self.status.max(ProcessingStatus::Enhanced);
        self.enhanced_at = Some(Utc::now());
        self
    }

    /// Mark the item ready for content generation.
    ///
    /// Requires a valid transcript reference.
    pub fn ready_for_content(mut self) -> Result<Self, ItemStateError> {
        self.advance_to(ProcessingStatus::ReadyForContent)?;
        self.content_ready_at = Some(Utc::now());
        Ok(self)
    }

    /// Set the externally supplied quality score.
    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality_score = Some(quality);
        self
    }

    /// Record the derived content score.
    pub fn with_score(mut self, score: u32) -> Self {
        self.content_score = Some(score);
        self
    }
}
