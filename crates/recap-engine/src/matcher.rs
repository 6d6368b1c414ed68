//! Temporal correlation of clips with development events.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use recap_models::{DevEvent, DevEventKind, GitHubContext, MatchReason};

use crate::error::EngineResult;

/// Feed of development events, queried by time range.
#[async_trait]
pub trait DevEventFeed: Send + Sync {
    /// All events with `start <= timestamp <= end`.
    async fn events_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EngineResult<Vec<DevEvent>>;
}

/// Correlates a clip's creation timestamp against nearby development
/// events.
///
/// Confidence is computed from the time distance to the event with the
/// earliest timestamp inside the window (not the nearest one): the clip is
/// assumed to capture work that started at the beginning of the matched
/// activity burst. Identical clip timestamp and event set always produce
/// the identical context.
#[derive(Debug, Clone)]
pub struct TemporalMatcher {
    window: Duration,
}

impl Default for TemporalMatcher {
    fn default() -> Self {
        Self {
            window: Duration::hours(2),
        }
    }
}

impl TemporalMatcher {
    /// Matcher with the default ±2 hour window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Matcher with a custom symmetric window.
    pub fn with_window(window: Duration) -> Self {
        Self { window }
    }

    /// The symmetric window applied on each side of the clip timestamp.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Correlate one clip against the event feed.
    pub async fn match_clip(
        &self,
        feed: &dyn DevEventFeed,
        clip_ts: DateTime<Utc>,
    ) -> EngineResult<GitHubContext> {
        let start = clip_ts - self.window;
        let end = clip_ts + self.window;

        let mut events = feed.events_between(start, end).await?;
        // The feed contract already bounds the range; keep the guard so a
        // sloppy feed cannot inflate confidence.
        events.retain(|e| e.timestamp >= start && e.timestamp <= end);

        if events.is_empty() {
            debug!(%clip_ts, "No development events in window");
            return Ok(GitHubContext::empty());
        }

        let mut context = GitHubContext {
            confidence: self.confidence(clip_ts, &events),
            match_reason: MatchReason::TemporalProximity,
            ..Default::default()
        };

        for event in &events {
            match event.kind {
                DevEventKind::PullRequest => context.pull_requests.push(event.reference.clone()),
                DevEventKind::Push => context.commits.push(event.reference.clone()),
                DevEventKind::Issue => context.issues.push(event.reference.clone()),
            }
        }

        debug!(
            %clip_ts,
            prs = context.pull_requests.len(),
            commits = context.commits.len(),
            issues = context.issues.len(),
            confidence = context.confidence,
            "Matched development context"
        );

        Ok(context)
    }

    /// `max(0, 1 - |Δt| / window)` against the earliest event in the window.
    fn confidence(&self, clip_ts: DateTime<Utc>, events: &[DevEvent]) -> f64 {
        let Some(earliest) = events.iter().map(|e| e.timestamp).min() else {
            return 0.0;
        };

        let delta_ms = (clip_ts - earliest).num_milliseconds().abs() as f64;
        let window_ms = self.window.num_milliseconds() as f64;

        (1.0 - delta_ms / window_ms).max(0.0)
    }
}
