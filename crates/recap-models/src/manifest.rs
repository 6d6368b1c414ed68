//! Digest manifest models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::item::ClipId;

/// Maximum length of a section title.
pub const MAX_TITLE_LEN: usize = 80;

/// Maximum length of a single bullet point.
pub const MAX_BULLET_LEN: usize = 140;

/// Minimum bullets per section.
pub const MIN_BULLETS: usize = 2;

/// Maximum bullets per section.
pub const MAX_BULLETS: usize = 4;

/// Confidence that a clip's timestamp matches its claimed development
/// context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentStatus {
    /// High-confidence temporal match
    Exact,
    /// Plausible but uncertain match
    Estimated,
    /// No usable development context
    Missing,
}

impl AlignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlignmentStatus::Exact => "exact",
            AlignmentStatus::Estimated => "estimated",
            AlignmentStatus::Missing => "missing",
        }
    }
}

/// Verdict from the judging collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JudgeVerdict {
    /// Overall score
    pub overall: f64,

    /// Per-axis scores, keyed by axis name
    #[serde(default)]
    pub axes: HashMap<String, f64>,
}

/// One section of a digest, derived from one selected clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ManifestSection {
    /// Clip this section was derived from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_id: Option<ClipId>,

    /// Section title (bounded length)
    pub title: String,

    /// 2-4 bullet points (each bounded length)
    pub bullets: Vec<String>,

    /// Prose paragraph
    pub paragraph: String,

    /// The item's content score (0-100)
    pub score: u32,

    /// Repository the section's development context belongs to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Linked pull request URLs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pr_links: Vec<String>,

    /// Timestamp alignment status
    pub alignment_status: AlignmentStatus,

    /// Start offset into the source clip (seconds)
    pub start_seconds: f64,

    /// End offset into the source clip (seconds)
    pub end_seconds: f64,
}

impl ManifestSection {
    /// Build a section, truncating the title and bullets to their bounds
    /// and capping the bullet count.
    pub fn new(
        title: impl Into<String>,
        bullets: Vec<String>,
        paragraph: impl Into<String>,
        score: u32,
        alignment_status: AlignmentStatus,
    ) -> Self {
        let bullets = bullets
            .into_iter()
            .map(|b| truncate(&b, MAX_BULLET_LEN))
            .take(MAX_BULLETS)
            .collect();

        Self {
            clip_id: None,
            title: truncate(&title.into(), MAX_TITLE_LEN),
            bullets,
            paragraph: paragraph.into(),
            score,
            repository: None,
            pr_links: Vec::new(),
            alignment_status,
            start_seconds: 0.0,
            end_seconds: 0.0,
        }
    }

    /// Set the source clip ID.
    pub fn with_clip_id(mut self, clip_id: ClipId) -> Self {
        self.clip_id = Some(clip_id);
        self
    }

    /// Set the repository name.
    pub fn with_repository(mut self, repository: Option<String>) -> Self {
        self.repository = repository;
        self
    }

    /// Set the linked PR URLs.
    pub fn with_pr_links(mut self, pr_links: Vec<String>) -> Self {
        self.pr_links = pr_links;
        self
    }

    /// Set the clip offsets.
    pub fn with_offsets(mut self, start_seconds: f64, end_seconds: f64) -> Self {
        self.start_seconds = start_seconds;
        self.end_seconds = end_seconds;
        self
    }
}

/// Publication status of a manifest.
///
/// Strictly forward; every transition past `Draft` is driven by an
/// external collaborator.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    /// Composed by the manifest builder
    #[default]
    Draft,
    /// Publication PR opened
    PrOpen,
    /// PR approved
    Approved,
    /// PR merged
    Merged,
    /// Digest published
    Published,
}

impl ManifestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestStatus::Draft => "draft",
            ManifestStatus::PrOpen => "pr_open",
            ManifestStatus::Approved => "approved",
            ManifestStatus::Merged => "merged",
            ManifestStatus::Published => "published",
        }
    }
}

/// Error for invalid manifest state transitions.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Cannot move manifest from {from} back to {to}")]
pub struct ManifestStateError {
    pub from: &'static str,
    pub to: &'static str,
}

/// The day-level digest.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Manifest {
    /// Ordered sections, highest-scoring first
    pub sections: Vec<ManifestSection>,

    /// Canonical source video URL
    pub source_video_url: String,

    /// Target publication branch
    pub target_branch: String,

    /// Publication status
    #[serde(default)]
    pub status: ManifestStatus,

    /// Judge verdict, when judged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub judge: Option<JudgeVerdict>,

    /// Social-post blurbs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub social_posts: Vec<String>,
}

impl Manifest {
    /// Create a draft manifest.
    pub fn draft(
        sections: Vec<ManifestSection>,
        source_video_url: impl Into<String>,
        target_branch: impl Into<String>,
    ) -> Self {
        Self {
            sections,
            source_video_url: source_video_url.into(),
            target_branch: target_branch.into(),
            status: ManifestStatus::Draft,
            judge: None,
            social_posts: Vec::new(),
        }
    }

    /// Attach a judge verdict.
    pub fn with_judge(mut self, judge: JudgeVerdict) -> Self {
        self.judge = Some(judge);
        self
    }

    /// Advance the publication status; backward transitions are rejected.
    pub fn advance_to(&mut self, next: ManifestStatus) -> Result<(), ManifestStateError> {
        if next < self.status {
            return Err(ManifestStateError {
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }
        self.status = next;
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_truncates_title_and_bullets() {
        let long_title = "t".repeat(200);
        let long_bullet = "b".repeat(300);
        let section = ManifestSection::new(
            long_title,
            vec![long_bullet, "short".to_string()],
            "paragraph",
            80,
            AlignmentStatus::Estimated,
        );

        assert_eq!(section.title.chars().count(), MAX_TITLE_LEN);
        assert_eq!(section.bullets[0].chars().count(), MAX_BULLET_LEN);
        assert_eq!(section.bullets[1], "short");
    }

    #[test]
    fn test_section_caps_bullet_count() {
        let bullets = (0..6).map(|i| format!("bullet {}", i)).collect();
        let section =
            ManifestSection::new("title", bullets, "p", 50, AlignmentStatus::Missing);
        assert_eq!(section.bullets.len(), MAX_BULLETS);
    }

    #[test]
    fn test_manifest_status_forward_only() {
        let mut manifest = Manifest::draft(Vec::new(), "https://youtube.com/watch?v=x", "main");

        manifest.advance_to(ManifestStatus::PrOpen).unwrap();
        manifest.advance_to(ManifestStatus::Approved).unwrap();

        let err = manifest.advance_to(ManifestStatus::Draft).unwrap_err();
        assert_eq!(err.from, "approved");
        assert_eq!(manifest.status, ManifestStatus::Approved);
    }

    #[test]
    fn test_draft_is_default_status() {
        let manifest = Manifest::draft(Vec::new(), "url", "main");
        assert_eq!(manifest.status, ManifestStatus::Draft);
    }
}
