//! Development events and correlated GitHub context.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Kind of development event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DevEventKind {
    /// Pull request activity
    PullRequest,
    /// Push / commit set
    Push,
    /// Issue activity
    Issue,
}

/// A single development event (commit push, PR, issue activity).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DevEvent {
    /// Event kind
    pub kind: DevEventKind,

    /// Reference: HTML URL for PRs/issues, commit SHA for pushes
    pub reference: String,

    /// When the event happened
    pub timestamp: DateTime<Utc>,
}

impl DevEvent {
    pub fn new(kind: DevEventKind, reference: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            reference: reference.into(),
            timestamp,
        }
    }
}

/// How a clip was matched to its development context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    /// Matched by time distance to nearby development events
    #[default]
    TemporalProximity,
}

impl MatchReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchReason::TemporalProximity => "temporal_proximity",
        }
    }
}

/// Development context correlated with one clip.
///
/// Immutable once computed for a given clip/time-window pair; recomputing
/// with a wider window may produce a different context.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default)]
pub struct GitHubContext {
    /// Linked pull request HTML URLs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pull_requests: Vec<String>,

    /// Linked commit SHAs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commits: Vec<String>,

    /// Linked issue HTML URLs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,

    /// Match confidence in [0, 1]
    pub confidence: f64,

    /// Matching strategy that produced this context
    #[serde(default)]
    pub match_reason: MatchReason,
}

impl GitHubContext {
    /// Context with no matched events.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether any development event was linked.
    pub fn has_matches(&self) -> bool {
        !self.pull_requests.is_empty() || !self.commits.is_empty() || !self.issues.is_empty()
    }
}

/// Extract the `owner/repo` segment from a PR or issue HTML URL.
///
/// Returns `None` for URLs that do not carry both path segments.
pub fn repo_from_pr_url(pr_url: &str) -> Option<String> {
    let url = Url::parse(pr_url).ok()?;
    let mut segments = url.path_segments()?;

    let owner = segments.next().filter(|s| !s.is_empty())?;
    let repo = segments.next().filter(|s| !s.is_empty())?;

    Some(format!("{}/{}", owner, repo))
}
