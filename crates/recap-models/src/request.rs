//! Content generation request types.
//!
//! Requests are validated synchronously before a job is created; invalid
//! requests are never enqueued.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Maximum category labels per request.
const MAX_CATEGORIES: usize = 10;

/// Kind of digest to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// One day of activity
    #[default]
    DailyRecap,
    /// One week of activity
    WeeklySummary,
    /// A single topic across the range
    TopicFocus,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::DailyRecap => "daily_recap",
            ContentType::WeeklySummary => "weekly_summary",
            ContentType::TopicFocus => "topic_focus",
        }
    }
}

/// Inclusive time range for candidate selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// Optional candidate filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct RequestFilters {
    /// Minimum view count
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_views: Option<u64>,

    /// Minimum clip duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_duration: Option<f64>,

    /// Maximum clip duration in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<f64>,

    /// Category labels to keep
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,

    /// Minimum development-context confidence
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,
}

/// A request to generate a digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
pub struct ContentGenerationRequest {
    /// Time range to select candidates from
    #[validate(custom(function = validate_date_range))]
    pub date_range: DateRange,

    /// Optional candidate filters
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom(function = validate_filters))]
    pub filters: Option<RequestFilters>,

    /// Kind of digest to generate
    #[serde(default)]
    pub content_type: ContentType,

    /// Restrict to a single repository (owner/repo)
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1))]
    pub repository: Option<String>,
}

impl ContentGenerationRequest {
    /// Daily recap over the given range, no filters.
    pub fn daily(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            date_range: DateRange { start, end },
            filters: None,
            content_type: ContentType::DailyRecap,
            repository: None,
        }
    }

    /// Set candidate filters.
    pub fn with_filters(mut self, filters: RequestFilters) -> Self {
        self.filters = Some(filters);
        self
    }
}

fn validate_date_range(range: &DateRange) -> Result<(), ValidationError> {
    if range.end <= range.start {
        return Err(ValidationError::new("date_range_end_before_start"));
    }
    Ok(())
}

fn validate_filters(filters: &RequestFilters) -> Result<(), ValidationError> {
    if filters.min_duration.is_some_and(|d| d < 0.0) || filters.max_duration.is_some_and(|d| d < 0.0)
    {
        return Err(ValidationError::new("negative_duration_bound"));
    }
    if let (Some(min), Some(max)) = (filters.min_duration, filters.max_duration) {
        if max < min {
            return Err(ValidationError::new("max_duration_below_min"));
        }
    }
    if filters.categories.len() > MAX_CATEGORIES {
        return Err(ValidationError::new("too_many_categories"));
    }
    if filters.categories.iter().any(|c| c.trim().is_empty()) {
        return Err(ValidationError::new("empty_category"));
    }
    if filters
        .min_confidence
        .is_some_and(|c| !(0.0..=1.0).contains(&c))
    {
        return Err(ValidationError::new("confidence_out_of_range"));
    }
    Ok(())
}
