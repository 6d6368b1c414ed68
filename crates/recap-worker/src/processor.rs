//! Content generation orchestration.
//!
//! The processor owns job records and drives the five-step pipeline:
//! fetch candidates, generate draft content, run automated judgment,
//! prepare the response payload, finalize. Progress is persisted before
//! each step so a concurrent status read always observes the last fully
//! completed step.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use metrics::counter;
use tokio::sync::Semaphore;
use tracing::info;
use validator::Validate;

use recap_engine::{DevEventFeed, ItemDataSource, ManifestBuilder, TemporalMatcher};
use recap_models::{
    repo_from_pr_url, ContentGenerationRequest, ContentItem, JobId, JobState, JobStatusView,
    Manifest,
};
use recap_queue::{GenerationJobMessage, JobQueue, JobStore};
use recap_storage::{store_context, BlobStore, ContentItemStore};

use crate::collaborators::{notify_bounded, ErrorTracker, Judge, Notifier};
use crate::config::WorkerConfig;
use crate::data_source::StoredItemData;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

/// Number of pipeline steps.
const TOTAL_STEPS: u32 = 5;

/// Everything the processor needs, injected once at startup.
pub struct ProcessingContext {
    pub config: WorkerConfig,
    pub blob_store: Arc<dyn BlobStore>,
    pub item_store: ContentItemStore,
    pub job_store: Arc<dyn JobStore>,
    pub event_feed: Arc<dyn DevEventFeed>,
    pub judge: Arc<dyn Judge>,
    pub notifier: Arc<dyn Notifier>,
    pub error_tracker: Arc<dyn ErrorTracker>,
    pub matcher: TemporalMatcher,
    pub builder: ManifestBuilder,
}

/// Drives generation jobs through their lifecycle.
#[derive(Clone)]
pub struct JobProcessor {
    ctx: Arc<ProcessingContext>,
}

impl JobProcessor {
    pub fn new(ctx: Arc<ProcessingContext>) -> Self {
        Self { ctx }
    }

    /// Validate a request and allocate a queued job record.
    ///
    /// Invalid requests are rejected here and never enqueued.
    pub async fn create_job(&self, request: &ContentGenerationRequest) -> WorkerResult<JobId> {
        request
            .validate()
            .map_err(|e| WorkerError::validation(e.to_string()))?;

        let job = JobState::new(
            request.clone(),
            Duration::hours(self.ctx.config.job_ttl_hours),
        );
        let job_id = job.job_id.clone();
        self.ctx.job_store.put(&job).await?;

        info!(job_id = %job_id, "Created generation job");
        Ok(job_id)
    }

    /// Hand a job to the execution substrate.
    pub async fn enqueue_job(
        &self,
        queue: &JobQueue,
        job_id: &JobId,
        request: ContentGenerationRequest,
    ) -> WorkerResult<String> {
        let message = GenerationJobMessage::new(job_id.clone(), request);
        Ok(queue.enqueue(&message).await?)
    }

    /// Read the status view for a job.
    pub async fn job_status(&self, job_id: &JobId) -> WorkerResult<JobStatusView> {
        let job = self
            .ctx
            .job_store
            .get(job_id)
            .await?
            .ok_or_else(|| WorkerError::job_not_found(job_id.to_string()))?;
        Ok(job.status_view())
    }

    /// Delete job rows past their expiry.
    pub async fn reap_expired(&self) -> WorkerResult<u32> {
        Ok(self.ctx.job_store.reap_expired(Utc::now()).await?)
    }

    /// Process one dequeued job to completion or failure.
    ///
    /// The sole state-advancing operation: exactly one terminal transition
    /// happens here, and a job already terminal rejects reprocessing so
    /// duplicate queue delivery is a no-op.
    pub async fn process_job(
        &self,
        message: &GenerationJobMessage,
    ) -> WorkerResult<serde_json::Value> {
        let logger = JobLogger::new(&message.job_id, "content_generation");

        let job = self
            .ctx
            .job_store
            .get(&message.job_id)
            .await?
            .ok_or_else(|| WorkerError::job_not_found(message.job_id.to_string()))?;

        if job.status.is_terminal() {
            logger.log_warning("Rejecting duplicate delivery for terminal job");
            return Err(WorkerError::terminal_state(message.job_id.to_string()));
        }

        let mut job = job.start(message.worker_id.clone());
        self.ctx.job_store.put(&job).await?;
        logger.log_start("Starting content generation");

        match self.run_pipeline(&mut job, &logger).await {
            Ok(results) => {
                // One atomic update carries both the terminal status and
                // the full result payload.
                let completed = job.complete(results.clone());
                self.ctx.job_store.put(&completed).await?;

                counter!("recap_jobs_completed_total").increment(1);
                notify_bounded(
                    self.ctx.config.notify_timeout,
                    self.ctx.notifier.job_completed(&completed),
                )
                .await;

                logger.log_completion("Digest generated");
                Ok(results)
            }
            Err(e) => {
                let failed = job.fail(e.to_string());
                self.ctx.job_store.put(&failed).await?;
                self.ctx
                    .error_tracker
                    .report(&failed.job_id, &e.to_string())
                    .await;

                counter!("recap_jobs_failed_total").increment(1);
                notify_bounded(
                    self.ctx.config.notify_timeout,
                    self.ctx.notifier.job_failed(&failed),
                )
                .await;

                logger.log_error(&e.to_string());
                Err(e)
            }
        }
    }

    /// Process a batch of jobs with bounded fan-out.
    ///
    /// Every job's outcome is captured independently; one job's failure
    /// cannot abort its siblings.
    pub async fn process_jobs(
        &self,
        messages: Vec<GenerationJobMessage>,
    ) -> Vec<(JobId, WorkerResult<serde_json::Value>)> {
        let semaphore = Arc::new(Semaphore::new(self.ctx.config.max_concurrent_jobs));

        let handles: Vec<(JobId, tokio::task::JoinHandle<WorkerResult<serde_json::Value>>)> =
            messages
                .into_iter()
                .map(|message| {
                    let processor = self.clone();
                    let semaphore = Arc::clone(&semaphore);
                    let job_id = message.job_id.clone();

                    let handle = tokio::spawn(async move {
                        let _permit = semaphore
                            .acquire_owned()
                            .await
                            .map_err(|_| WorkerError::job_failed("Semaphore closed"))?;
                        processor.process_job(&message).await
                    });

                    (job_id, handle)
                })
                .collect();

        futures::future::join_all(handles.into_iter().map(|(job_id, handle)| async move {
            let outcome = match handle.await {
                Ok(result) => result,
                Err(e) => Err(WorkerError::job_failed(format!("Job task aborted: {}", e))),
            };
            (job_id, outcome)
        }))
        .await
    }

    /// Run the five pipeline steps in order, persisting progress before
    /// each one.
    async fn run_pipeline(
        &self,
        job: &mut JobState,
        logger: &JobLogger,
    ) -> WorkerResult<serde_json::Value> {
        let request = job.request.clone();

        self.advance(job, "fetch_content_items", 1).await?;
        let items = self.fetch_content_items(&request).await?;
        logger.log_progress(&format!("Fetched {} candidate items", items.len()));

        self.advance(job, "generate_draft_content", 2).await?;
        let (manifest, candidate_count) = self.generate_draft(&request, items).await?;

        self.advance(job, "run_automated_judgment", 3).await?;
        let verdict = self.ctx.judge.evaluate(&manifest).await?;
        let manifest = manifest.with_judge(verdict);

        self.advance(job, "prepare_response", 4).await?;
        let results = self.prepare_response(&request, &manifest, candidate_count)?;

        self.advance(job, "finalize", 5).await?;
        self.finalize(job, &manifest).await?;

        Ok(results)
    }

    /// Persist progress for the step about to run.
    async fn advance(&self, job: &mut JobState, step: &str, current: u32) -> WorkerResult<()> {
        *job = job.clone().with_progress(step, current, TOTAL_STEPS);
        self.ctx.job_store.put(job).await?;
        Ok(())
    }

    /// Step 1: load item records and apply the request's range and filters.
    async fn fetch_content_items(
        &self,
        request: &ContentGenerationRequest,
    ) -> WorkerResult<Vec<ContentItem>> {
        let all = self.ctx.item_store.list_items().await?;
        let range = &request.date_range;
        let filters = request.filters.clone().unwrap_or_default();

        let items = all
            .into_iter()
            .filter(|i| i.created_at >= range.start && i.created_at <= range.end)
            .filter(|i| {
                filters
                    .min_views
                    .map_or(true, |min| i.view_count.unwrap_or(0) >= min)
            })
            .filter(|i| {
                filters
                    .min_duration
                    .map_or(true, |min| i.duration_seconds >= min)
            })
            .filter(|i| {
                filters
                    .max_duration
                    .map_or(true, |max| i.duration_seconds <= max)
            })
            .filter(|i| {
                filters.categories.is_empty()
                    || i.categories.iter().any(|c| filters.categories.contains(c))
            })
            .collect();

        Ok(items)
    }

    /// Step 2: ensure development context exists for every candidate, then
    /// select and compose the draft manifest.
    async fn generate_draft(
        &self,
        request: &ContentGenerationRequest,
        mut items: Vec<ContentItem>,
    ) -> WorkerResult<(Manifest, usize)> {
        // Correlate clips that have no stored context yet. The matcher is
        // deterministic, so re-running a job never double-counts.
        for item in &mut items {
            if item.github_context.is_none() {
                let context = self
                    .ctx
                    .matcher
                    .match_clip(self.ctx.event_feed.as_ref(), item.created_at)
                    .await?;
                let artifact =
                    store_context(self.ctx.blob_store.as_ref(), &item.id, &context).await?;
                *item = item.clone().enhanced(artifact);
                self.ctx.item_store.put(item).await?;
            }
        }

        let source = StoredItemData::new(Arc::clone(&self.ctx.blob_store));

        // Confidence and repository filters need the matched context.
        let min_confidence = request.filters.as_ref().and_then(|f| f.min_confidence);
        if min_confidence.is_some() || request.repository.is_some() {
            let mut kept = Vec::with_capacity(items.len());
            for item in items {
                let context = source.context(&item.id).await;

                if let Some(min) = min_confidence {
                    if context.as_ref().map_or(0.0, |c| c.confidence) < min {
                        continue;
                    }
                }

                if let Some(repo) = &request.repository {
                    let linked = context.as_ref().map_or(false, |c| {
                        c.pull_requests
                            .iter()
                            .chain(c.issues.iter())
                            .filter_map(|url| repo_from_pr_url(url))
                            .any(|r| &r == repo)
                    });
                    if !linked {
                        continue;
                    }
                }

                kept.push(item);
            }
            items = kept;
        }

        let candidate_count = items.len();
        let source_video_url = items
            .first()
            .map(|i| i.source_url.clone())
            .unwrap_or_default();

        let manifest = self
            .ctx
            .builder
            .build(&items, &source, &source_video_url)
            .await?;

        Ok((manifest, candidate_count))
    }

    /// Step 4: assemble the result payload stored on the job record.
    fn prepare_response(
        &self,
        request: &ContentGenerationRequest,
        manifest: &Manifest,
        candidate_count: usize,
    ) -> WorkerResult<serde_json::Value> {
        Ok(serde_json::json!({
            "content_type": request.content_type.as_str(),
            "candidate_count": candidate_count,
            "section_count": manifest.sections.len(),
            "manifest": serde_json::to_value(manifest)?,
        }))
    }

    /// Step 5: persist the draft manifest and record scores on the
    /// selected items.
    async fn finalize(&self, job: &JobState, manifest: &Manifest) -> WorkerResult<()> {
        let key = format!("manifests/{}.json", job.job_id);
        let bytes = serde_json::to_vec(manifest)?;
        let metadata = HashMap::from([("job_id".to_string(), job.job_id.to_string())]);
        self.ctx.blob_store.put(&key, bytes, metadata).await?;

        for section in &manifest.sections {
            let Some(clip_id) = &section.clip_id else {
                continue;
            };
            let Some(item) = self.ctx.item_store.get(clip_id).await? else {
                continue;
            };

            let scored = item.with_score(section.score);
            let updated = match scored.clone().ready_for_content() {
                Ok(ready) => ready,
                // Items selected on summary strength alone may lack a
                // sized transcript; keep their current status.
                Err(_) => scored,
            };
            self.ctx.item_store.put(&updated).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use recap_engine::{EngineResult, ManifestConfig, ScoringConfig};
    use recap_models::{
        ArtifactRef, ClipId, DevEvent, DevEventKind, JobStatus, JudgeVerdict, Transcript,
    };
    use recap_queue::MemoryJobStore;
    use recap_storage::{store_transcript, MemoryBlobStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;

    struct FixedFeed {
        events: Vec<DevEvent>,
        fail: bool,
    }

    #[async_trait]
    impl DevEventFeed for FixedFeed {
        async fn events_between(
            &self,
            start: chrono::DateTime<Utc>,
            end: chrono::DateTime<Utc>,
        ) -> EngineResult<Vec<DevEvent>> {
            if self.fail {
                return Err(recap_engine::EngineError::event_feed("events API down"));
            }
            Ok(self
                .events
                .iter()
                .filter(|e| e.timestamp >= start && e.timestamp <= end)
                .cloned()
                .collect())
        }
    }

    /// Judge that fails on demand.
    struct StaticJudge {
        fail: bool,
    }

    #[async_trait]
    impl Judge for StaticJudge {
        async fn evaluate(&self, _draft: &Manifest) -> WorkerResult<JudgeVerdict> {
            if self.fail {
                return Err(WorkerError::judge_failed("model unavailable"));
            }
            Ok(JudgeVerdict {
                overall: 0.8,
                axes: HashMap::from([("clarity".to_string(), 0.9)]),
            })
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        completed: AtomicUsize,
        failed: AtomicUsize,
        error_out: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn job_completed(&self, _job: &JobState) -> WorkerResult<()> {
            self.completed.fetch_add(1, Ordering::SeqCst);
            if self.error_out {
                return Err(WorkerError::notify_failed("webhook down"));
            }
            Ok(())
        }

        async fn job_failed(&self, _job: &JobState) -> WorkerResult<()> {
            self.failed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingTracker {
        reports: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ErrorTracker for RecordingTracker {
        async fn report(&self, _job_id: &JobId, error: &str) {
            self.reports.lock().await.push(error.to_string());
        }
    }

    struct Fixture {
        processor: JobProcessor,
        blob_store: Arc<MemoryBlobStore>,
        job_store: Arc<MemoryJobStore>,
        notifier: Arc<RecordingNotifier>,
        tracker: Arc<RecordingTracker>,
    }

    #[derive(Default)]
    struct FixtureOptions {
        judge_fails: bool,
        notifier_fails: bool,
        feed_fails: bool,
    }

    async fn fixture_with(options: FixtureOptions) -> Fixture {
        let blob_store = Arc::new(MemoryBlobStore::new());
        let job_store = Arc::new(MemoryJobStore::new());
        let notifier = Arc::new(RecordingNotifier {
            error_out: options.notifier_fails,
            ..Default::default()
        });
        let tracker = Arc::new(RecordingTracker::default());

        let feed = FixedFeed {
            events: vec![DevEvent::new(
                DevEventKind::PullRequest,
                "https://github.com/acme/widget/pull/7",
                Utc::now() - Duration::minutes(10),
            )],
            fail: options.feed_fails,
        };

        let ctx = ProcessingContext {
            config: WorkerConfig::default(),
            blob_store: blob_store.clone() as Arc<dyn BlobStore>,
            item_store: ContentItemStore::new(blob_store.clone() as Arc<dyn BlobStore>),
            job_store: job_store.clone() as Arc<dyn JobStore>,
            event_feed: Arc::new(feed),
            judge: Arc::new(StaticJudge {
                fail: options.judge_fails,
            }),
            notifier: notifier.clone() as Arc<dyn Notifier>,
            error_tracker: tracker.clone() as Arc<dyn ErrorTracker>,
            matcher: TemporalMatcher::new(),
            builder: ManifestBuilder::new(ManifestConfig::default(), ScoringConfig::default())
                .unwrap(),
        };

        Fixture {
            processor: JobProcessor::new(Arc::new(ctx)),
            blob_store,
            job_store,
            notifier,
            tracker,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(FixtureOptions::default()).await
    }

    async fn seed_item(fx: &Fixture, id: &str, views: u64) -> ContentItem {
        let clip_id = ClipId::parse(id).unwrap();
        let transcript = Transcript::new(
            "Today we rewrote the retry logic from scratch. The old version dropped jobs under load.",
        );
        let artifact = store_transcript(fx.blob_store.as_ref(), &clip_id, &transcript)
            .await
            .unwrap();

        let item = ContentItem::new(
            clip_id,
            format!("Clip {}", id),
            "https://clips.twitch.tv/x",
            60.0,
            Utc::now() - Duration::minutes(30),
        )
        .with_view_count(views)
        .with_quality(0.8)
        .transcribed(artifact);

        let store = ContentItemStore::new(fx.blob_store.clone() as Arc<dyn BlobStore>);
        store.put(&item).await.unwrap();
        item
    }

    fn request() -> ContentGenerationRequest {
        let end = Utc::now();
        ContentGenerationRequest::daily(end - Duration::days(1), end)
    }

    async fn create_and_message(fx: &Fixture) -> GenerationJobMessage {
        let request = request();
        let job_id = fx.processor.create_job(&request).await.unwrap();
        GenerationJobMessage::new(job_id, request).with_worker("worker-test")
    }

    #[tokio::test]
    async fn test_create_job_rejects_invalid_request() {
        let fx = fixture().await;
        let now = Utc::now();
        let bad = ContentGenerationRequest::daily(now, now - Duration::hours(1));

        let err = fx.processor.create_job(&bad).await.unwrap_err();
        assert!(matches!(err, WorkerError::Validation(_)));
        assert_eq!(fx.job_store.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_successful_job_completes_with_results() {
        let fx = fixture().await;
        seed_item(&fx, "clip-a", 1200).await;
        let message = create_and_message(&fx).await;

        let results = fx.processor.process_job(&message).await.unwrap();

        let job = fx.job_store.get(&message.job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.results.is_some());
        assert!(job.error_message.is_none());
        assert_eq!(job.worker_id.as_deref(), Some("worker-test"));
        assert_eq!(results["section_count"], 1);

        // Progress shows the last step reached.
        let progress = job.progress.unwrap();
        assert_eq!(progress.step, "finalize");
        assert_eq!(progress.current, 5);
        assert_eq!(progress.total, 5);

        assert_eq!(fx.notifier.completed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failing_draft_step_marks_job_failed() {
        let fx = fixture_with(FixtureOptions {
            feed_fails: true,
            ..Default::default()
        })
        .await;
        seed_item(&fx, "clip-a", 1200).await;
        let message = create_and_message(&fx).await;

        let err = fx.processor.process_job(&message).await.unwrap_err();
        assert!(matches!(err, WorkerError::Engine(_)));

        let job = fx.job_store.get(&message.job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.results.is_none());
        assert!(!job.error_message.as_deref().unwrap_or_default().is_empty());

        // Failure happened at step 2; progress shows the step that was
        // about to run.
        assert_eq!(job.progress.unwrap().step, "generate_draft_content");
    }

    #[tokio::test]
    async fn test_failing_judge_marks_job_failed() {
        let fx = fixture_with(FixtureOptions {
            judge_fails: true,
            ..Default::default()
        })
        .await;
        seed_item(&fx, "clip-a", 1200).await;
        let message = create_and_message(&fx).await;

        let err = fx.processor.process_job(&message).await.unwrap_err();
        assert!(matches!(err, WorkerError::JudgeFailed(_)));

        let job = fx.job_store.get(&message.job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.results.is_none());
        assert!(job
            .error_message
            .as_deref()
            .unwrap()
            .contains("model unavailable"));

        // Exactly one error-tracking report, one failure notification.
        assert_eq!(fx.tracker.reports.lock().await.len(), 1);
        assert_eq!(fx.notifier.failed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_terminal_job_rejects_reprocessing() {
        let fx = fixture().await;
        seed_item(&fx, "clip-a", 1200).await;
        let message = create_and_message(&fx).await;

        fx.processor.process_job(&message).await.unwrap();
        let first = fx.job_store.get(&message.job_id).await.unwrap().unwrap();

        let err = fx.processor.process_job(&message).await.unwrap_err();
        assert!(err.is_terminal_rejection());

        // The stored row is untouched by the rejected call.
        let second = fx.job_store.get(&message.job_id).await.unwrap().unwrap();
        assert_eq!(second.updated_at, first.updated_at);
        assert_eq!(second.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_notifier_failure_never_fails_the_job() {
        let fx = fixture_with(FixtureOptions {
            notifier_fails: true,
            ..Default::default()
        })
        .await;
        seed_item(&fx, "clip-a", 1200).await;
        let message = create_and_message(&fx).await;

        fx.processor.process_job(&message).await.unwrap();

        let job = fx.job_store.get(&message.job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_batch_isolates_failures() {
        let fx = fixture().await;
        seed_item(&fx, "clip-a", 1200).await;
        let good = create_and_message(&fx).await;
        let bogus = GenerationJobMessage::new(JobId::from_string("missing-job"), request());

        let outcomes = fx.processor.process_jobs(vec![bogus, good.clone()]).await;

        assert_eq!(outcomes.len(), 2);
        assert!(outcomes[0].1.is_err());
        assert!(outcomes[1].1.is_ok());

        let job = fx.job_store.get(&good.job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_pipeline_attaches_context_and_scores_items() {
        let fx = fixture().await;
        let item = seed_item(&fx, "clip-a", 1200).await;
        let message = create_and_message(&fx).await;

        fx.processor.process_job(&message).await.unwrap();

        let store = ContentItemStore::new(fx.blob_store.clone() as Arc<dyn BlobStore>);
        let updated = store.get(&item.id).await.unwrap().unwrap();
        assert!(updated.github_context.is_some());
        assert!(updated.content_score.is_some());
        assert_eq!(
            updated.status,
            recap_models::ProcessingStatus::ReadyForContent
        );

        // Draft manifest persisted for downstream publication.
        let manifest_key = format!("manifests/{}", message.job_id);
        let keys = fx.blob_store.list("manifests/").await.unwrap();
        assert!(keys.iter().any(|k| k.starts_with(&manifest_key)));
    }

    #[tokio::test]
    async fn test_status_view_for_unknown_job() {
        let fx = fixture().await;
        let err = fx
            .processor
            .job_status(&JobId::from_string("absent"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn test_min_views_filter_drops_candidates() {
        let fx = fixture().await;
        seed_item(&fx, "clip-low", 5).await;
        seed_item(&fx, "clip-high", 50_000).await;

        let mut req = request();
        req.filters = Some(recap_models::RequestFilters {
            min_views: Some(1000),
            ..Default::default()
        });
        let job_id = fx.processor.create_job(&req).await.unwrap();
        let message = GenerationJobMessage::new(job_id, req);

        let results = fx.processor.process_job(&message).await.unwrap();
        assert_eq!(results["candidate_count"], 1);
        assert_eq!(results["section_count"], 1);
    }
}
