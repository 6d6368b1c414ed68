//! Manifest selection and composition.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{debug, info};

use recap_models::{
    repo_from_pr_url, AlignmentStatus, ClipId, ContentItem, GitHubContext, Manifest,
    ManifestSection, Transcript, MAX_BULLETS, MIN_BULLETS,
};

use crate::error::EngineResult;
use crate::scoring::{CandidateSignals, ScoringConfig};

/// Source of stored item artifacts.
///
/// Misses (absent or unreadable artifacts) are `None`, never errors; a
/// candidate without usable data is simply composed from what exists.
#[async_trait]
pub trait ItemDataSource: Send + Sync {
    /// Fetch the stored transcript for a clip.
    async fn transcript(&self, id: &ClipId) -> Option<Transcript>;

    /// Fetch the stored development context for a clip.
    async fn context(&self, id: &ClipId) -> Option<GitHubContext>;
}

/// Manifest builder configuration.
#[derive(Debug, Clone)]
pub struct ManifestConfig {
    /// Maximum sections per digest
    pub max_sections: usize,
    /// Minimum clip duration to qualify (seconds)
    pub min_duration_seconds: f64,
    /// Minimum transcript summary length to qualify without a size check
    pub min_summary_chars: usize,
    /// Confidence above which alignment is "exact"
    pub exact_confidence: f64,
    /// Confidence above which alignment is "estimated"
    pub estimated_confidence: f64,
    /// Target publication branch for draft manifests
    pub target_branch: String,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            max_sections: 5,
            min_duration_seconds: 15.0,
            min_summary_chars: 10,
            exact_confidence: 0.8,
            estimated_confidence: 0.3,
            target_branch: "content/daily".to_string(),
        }
    }
}

/// Prefetched per-item artifacts, cached for the duration of one build.
#[derive(Default)]
struct ItemData {
    transcript: Option<Transcript>,
    context: Option<GitHubContext>,
}

/// Selects and composes the day's digest from candidate items.
pub struct ManifestBuilder {
    config: ManifestConfig,
    scoring: ScoringConfig,
}

impl ManifestBuilder {
    /// Create a builder, validating the scoring configuration.
    pub fn new(config: ManifestConfig, scoring: ScoringConfig) -> EngineResult<Self> {
        scoring.validate()?;
        Ok(Self { config, scoring })
    }

    /// Whether an item qualifies as a candidate.
    ///
    /// Disqualified items are dropped before scoring.
    pub fn qualifies(&self, item: &ContentItem) -> bool {
        if item.duration_seconds < self.config.min_duration_seconds {
            return false;
        }

        match &item.transcript {
            Some(artifact) => {
                artifact.summary.trim().len() >= self.config.min_summary_chars
                    || artifact.is_valid()
            }
            None => false,
        }
    }

    /// Build a draft manifest from candidate items.
    pub async fn build(
        &self,
        items: &[ContentItem],
        source: &dyn ItemDataSource,
        source_video_url: &str,
    ) -> EngineResult<Manifest> {
        let candidates: Vec<&ContentItem> = items.iter().filter(|i| self.qualifies(i)).collect();
        debug!(
            total = items.len(),
            qualified = candidates.len(),
            "Filtered manifest candidates"
        );

        // Prefetch artifacts once per item; composition below never
        // re-fetches. Scoped to this build only.
        let mut cache: HashMap<String, ItemData> = HashMap::with_capacity(candidates.len());
        for item in &candidates {
            let data = ItemData {
                transcript: source.transcript(&item.id).await,
                context: source.context(&item.id).await,
            };
            cache.insert(item.id.to_string(), data);
        }

        let mut scored: Vec<(&ContentItem, u32)> = candidates
            .iter()
            .map(|item| {
                let data = &cache[item.id.as_str()];
                (*item, self.scoring.score(&self.signals(item, data)))
            })
            .collect();

        // Rank descending; ties broken by more recent creation.
        scored.sort_by(|a, b| {
            b.1.cmp(&a.1)
                .then_with(|| b.0.created_at.cmp(&a.0.created_at))
        });
        scored.truncate(self.config.max_sections);

        let sections: Vec<ManifestSection> = scored
            .into_iter()
            .map(|(item, score)| {
                let data = &cache[item.id.as_str()];
                self.compose_section(item, score, data)
            })
            .collect();

        info!(
            sections = sections.len(),
            branch = %self.config.target_branch,
            "Composed draft manifest"
        );

        Ok(Manifest::draft(
            sections,
            source_video_url,
            self.config.target_branch.clone(),
        ))
    }

    fn signals(&self, item: &ContentItem, data: &ItemData) -> CandidateSignals {
        CandidateSignals {
            quality: item.quality_score,
            context_confidence: data.context.as_ref().map(|c| c.confidence),
            view_count: item.view_count,
            transcript_words: data.transcript.as_ref().map(Transcript::word_count),
            duration_seconds: Some(item.duration_seconds),
        }
    }

    fn compose_section(&self, item: &ContentItem, score: u32, data: &ItemData) -> ManifestSection {
        let context = data.context.as_ref();
        let confidence = context.map(|c| c.confidence).unwrap_or(0.0);

        let alignment = if context.map_or(true, |c| !c.has_matches()) {
            AlignmentStatus::Missing
        } else if confidence > self.config.exact_confidence {
            AlignmentStatus::Exact
        } else if confidence > self.config.estimated_confidence {
            AlignmentStatus::Estimated
        } else {
            AlignmentStatus::Missing
        };

        let bullets = self.bullets(item, data);
        let paragraph = self.paragraph(item, data);

        let pr_links = context.map(|c| c.pull_requests.clone()).unwrap_or_default();
        let repository = pr_links.first().and_then(|url| repo_from_pr_url(url));

        ManifestSection::new(item.title.clone(), bullets, paragraph, score, alignment)
            .with_clip_id(item.id.clone())
            .with_repository(repository)
            .with_pr_links(pr_links)
            .with_offsets(0.0, item.duration_seconds)
    }

    /// Derive 2-4 bullets from the transcript, padding from the
    /// development context when the transcript is thin.
    fn bullets(&self, item: &ContentItem, data: &ItemData) -> Vec<String> {
        let mut bullets: Vec<String> = data
            .transcript
            .as_ref()
            .map(|t| sentences(&t.text))
            .unwrap_or_default()
            .into_iter()
            .take(MAX_BULLETS)
            .collect();

        if bullets.len() < MIN_BULLETS {
            if let Some(context) = &data.context {
                if !context.pull_requests.is_empty() {
                    bullets.push(format!(
                        "Linked to {} pull request(s) from the same working session",
                        context.pull_requests.len()
                    ));
                }
                if bullets.len() < MIN_BULLETS && !context.commits.is_empty() {
                    bullets.push(format!(
                        "Correlated with {} commit(s) pushed nearby",
                        context.commits.len()
                    ));
                }
            }
        }

        if bullets.len() < MIN_BULLETS {
            bullets.push(format!(
                "Clip \"{}\" runs {:.0} seconds",
                item.title, item.duration_seconds
            ));
        }
        if bullets.len() < MIN_BULLETS {
            bullets.push(format!(
                "Captured {}",
                item.created_at.format("%Y-%m-%d %H:%M UTC")
            ));
        }

        bullets.truncate(MAX_BULLETS);
        bullets
    }

    fn paragraph(&self, item: &ContentItem, data: &ItemData) -> String {
        if let Some(transcript) = &data.transcript {
            let opening: Vec<String> = sentences(&transcript.text).into_iter().take(2).collect();
            if !opening.is_empty() {
                return opening.join(" ");
            }
        }

        if let Some(artifact) = &item.transcript {
            if !artifact.summary.trim().is_empty() {
                return artifact.summary.trim().to_string();
            }
        }

        format!("Highlights from \"{}\".", item.title)
    }
}

/// Split text into trimmed, non-trivial sentences.
fn sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.len() >= 10)
        .map(|s| format!("{}.", s))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::ScoringWeights;
    use chrono::{DateTime, Duration, Utc};
    use recap_models::ArtifactRef;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    const VIDEO_URL: &str = "https://youtube.com/watch?v=daily";

    /// Data source over fixed maps, counting fetches per clip.
    #[derive(Default)]
    struct FixtureSource {
        transcripts: RwLock<HashMap<String, Transcript>>,
        contexts: RwLock<HashMap<String, GitHubContext>>,
        fetches: AtomicUsize,
    }

    impl FixtureSource {
        async fn with_transcript(self, id: &str, text: &str) -> Self {
            self.transcripts
                .write()
                .await
                .insert(id.to_string(), Transcript::new(text));
            self
        }

        async fn with_context(self, id: &str, context: GitHubContext) -> Self {
            self.contexts.write().await.insert(id.to_string(), context);
            self
        }
    }

    #[async_trait]
    impl ItemDataSource for FixtureSource {
        async fn transcript(&self, id: &ClipId) -> Option<Transcript> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.transcripts.read().await.get(id.as_str()).cloned()
        }

        async fn context(&self, id: &ClipId) -> Option<GitHubContext> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.contexts.read().await.get(id.as_str()).cloned()
        }
    }

    /// Scoring driven purely by the quality axis, for deterministic scores.
    fn quality_only_scoring() -> ScoringConfig {
        ScoringConfig {
            weights: ScoringWeights {
                quality: 1.0,
                context_confidence: 0.0,
                views: 0.0,
                transcript: 0.0,
                duration: 0.0,
            },
            ..ScoringConfig::default()
        }
    }

    fn builder(scoring: ScoringConfig) -> ManifestBuilder {
        ManifestBuilder::new(ManifestConfig::default(), scoring).unwrap()
    }

    fn item(id: &str, quality: f64, created_at: DateTime<Utc>) -> ContentItem {
        ContentItem::new(
            ClipId::parse(id).unwrap(),
            format!("Clip {}", id),
            "https://clips.twitch.tv/x",
            60.0,
            created_at,
        )
        .with_quality(quality)
        .transcribed(ArtifactRef::new(
            format!("transcripts/{}.json", id),
            256,
            "debugging the async scheduler live",
        ))
    }

    #[tokio::test]
    async fn test_selects_top_n_in_score_order() {
        let now = Utc::now();
        let items = vec![
            item("a", 0.80, now),
            item("b", 0.55, now),
            item("c", 0.90, now),
        ];
        let source = FixtureSource::default();

        let config = ManifestConfig {
            max_sections: 2,
            ..ManifestConfig::default()
        };
        let builder = ManifestBuilder::new(config, quality_only_scoring()).unwrap();

        let manifest = builder.build(&items, &source, VIDEO_URL).await.unwrap();

        let scores: Vec<u32> = manifest.sections.iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![90, 80]);
        assert_eq!(manifest.sections[0].title, "Clip c");
        assert_eq!(manifest.sections[1].title, "Clip a");
    }

    #[tokio::test]
    async fn test_short_clip_never_scored_or_selected() {
        let now = Utc::now();
        let mut short = item("short", 1.0, now);
        short.duration_seconds = 5.0; // below the 15s minimum
        let items = vec![short, item("ok", 0.2, now)];
        let source = FixtureSource::default();

        let manifest = builder(quality_only_scoring())
            .build(&items, &source, VIDEO_URL)
            .await
            .unwrap();

        assert_eq!(manifest.sections.len(), 1);
        assert_eq!(manifest.sections[0].title, "Clip ok");
    }

    #[tokio::test]
    async fn test_item_without_transcript_excluded() {
        let now = Utc::now();
        let bare = ContentItem::new(
            ClipId::parse("bare").unwrap(),
            "Clip bare",
            "https://clips.twitch.tv/x",
            60.0,
            now,
        )
        .with_quality(1.0);

        let mut empty_ref = item("emptyref", 1.0, now);
        empty_ref.transcript = Some(ArtifactRef::new("transcripts/emptyref.json", 0, "too short"));

        let items = vec![bare, empty_ref, item("ok", 0.5, now)];
        let source = FixtureSource::default();

        let manifest = builder(quality_only_scoring())
            .build(&items, &source, VIDEO_URL)
            .await
            .unwrap();

        assert_eq!(manifest.sections.len(), 2);
        assert!(manifest.sections.iter().all(|s| s.title != "Clip bare"));
    }

    #[tokio::test]
    async fn test_valid_ref_with_short_summary_qualifies() {
        let now = Utc::now();
        let mut short_summary = item("s", 0.5, now);
        short_summary.transcript = Some(ArtifactRef::new("transcripts/s.json", 128, ""));

        let manifest = builder(quality_only_scoring())
            .build(&[short_summary], &FixtureSource::default(), VIDEO_URL)
            .await
            .unwrap();
        assert_eq!(manifest.sections.len(), 1);
    }

    #[tokio::test]
    async fn test_tie_broken_by_newer_timestamp() {
        let now = Utc::now();
        let items = vec![
            item("older", 0.7, now - Duration::hours(3)),
            item("newer", 0.7, now),
        ];
        let source = FixtureSource::default();

        let manifest = builder(quality_only_scoring())
            .build(&items, &source, VIDEO_URL)
            .await
            .unwrap();

        assert_eq!(manifest.sections[0].title, "Clip newer");
        assert_eq!(manifest.sections[1].title, "Clip older");
    }

    #[tokio::test]
    async fn test_artifacts_fetched_once_per_item() {
        let now = Utc::now();
        let items = vec![item("a", 0.9, now), item("b", 0.8, now)];
        let source = FixtureSource::default()
            .with_transcript("a", "We shipped the new parser. It handles nested arrays now. Performance doubled too.")
            .await
            .with_context(
                "a",
                GitHubContext {
                    pull_requests: vec!["https://github.com/acme/widget/pull/7".to_string()],
                    confidence: 0.95,
                    ..Default::default()
                },
            )
            .await;

        builder(quality_only_scoring())
            .build(&items, &source, VIDEO_URL)
            .await
            .unwrap();

        // One transcript + one context fetch per item, nothing re-fetched
        // during composition.
        assert_eq!(source.fetches.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_section_composition_from_context() {
        let now = Utc::now();
        let items = vec![item("a", 0.9, now)];
        let source = FixtureSource::default()
            .with_transcript("a", "Today we rebuilt the retry logic from scratch. The old one dropped jobs under load. Watch what happens at high concurrency.")
            .await
            .with_context(
                "a",
                GitHubContext {
                    pull_requests: vec!["https://github.com/acme/widget/pull/7".to_string()],
                    commits: vec!["abc123".to_string()],
                    confidence: 0.95,
                    ..Default::default()
                },
            )
            .await;

        let manifest = builder(quality_only_scoring())
            .build(&items, &source, VIDEO_URL)
            .await
            .unwrap();

        let section = &manifest.sections[0];
        assert_eq!(section.alignment_status, AlignmentStatus::Exact);
        assert_eq!(section.repository.as_deref(), Some("acme/widget"));
        assert_eq!(section.pr_links.len(), 1);
        assert!(section.bullets.len() >= MIN_BULLETS && section.bullets.len() <= MAX_BULLETS);
        assert!(section.paragraph.contains("retry logic"));
        assert_eq!(section.end_seconds, 60.0);
    }

    #[tokio::test]
    async fn test_alignment_thresholds() {
        let now = Utc::now();
        let b = builder(quality_only_scoring());

        for (confidence, expected) in [
            (0.95, AlignmentStatus::Exact),
            (0.5, AlignmentStatus::Estimated),
            (0.1, AlignmentStatus::Missing),
        ] {
            let items = vec![item("a", 0.9, now)];
            let source = FixtureSource::default()
                .with_context(
                    "a",
                    GitHubContext {
                        commits: vec!["abc123".to_string()],
                        confidence,
                        ..Default::default()
                    },
                )
                .await;

            let manifest = b.build(&items, &source, VIDEO_URL).await.unwrap();
            assert_eq!(
                manifest.sections[0].alignment_status, expected,
                "confidence {}",
                confidence
            );
        }
    }

    #[tokio::test]
    async fn test_no_context_means_missing_alignment() {
        let now = Utc::now();
        let manifest = builder(quality_only_scoring())
            .build(&[item("a", 0.9, now)], &FixtureSource::default(), VIDEO_URL)
            .await
            .unwrap();

        let section = &manifest.sections[0];
        assert_eq!(section.alignment_status, AlignmentStatus::Missing);
        assert!(section.repository.is_none());
        assert!(section.pr_links.is_empty());
    }
}
