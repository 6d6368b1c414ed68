//! Redis queue and job store integration tests.

use chrono::{Duration, Utc};

/// Test Redis connection and basic queue operations.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_redis_connection() {
    dotenvy::dotenv().ok();

    let queue = recap_queue::JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let len = queue.len().await.expect("Failed to get queue length");
    println!("Queue length: {}", len);
}

/// Test job enqueue and dequeue cycle.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_job_enqueue_dequeue() {
    use recap_models::{ContentGenerationRequest, JobId};
    use recap_queue::GenerationJobMessage;

    dotenvy::dotenv().ok();

    let queue = recap_queue::JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let end = Utc::now();
    let request = ContentGenerationRequest::daily(end - Duration::days(1), end);
    let message = GenerationJobMessage::new(JobId::new(), request);
    let job_id = message.job_id.clone();

    // Enqueue
    let message_id = queue.enqueue(&message).await.expect("Failed to enqueue");
    println!("Enqueued job {} with message ID {}", job_id, message_id);

    // Consume
    let consumer_name = "test-consumer";
    let messages = queue
        .consume(consumer_name, 1000, 1)
        .await
        .expect("Failed to consume");

    assert_eq!(messages.len(), 1);
    let (msg_id, consumed) = &messages[0];
    assert_eq!(consumed.job_id, job_id);

    // Acknowledge
    queue.ack(msg_id).await.expect("Failed to ack");
    queue.clear_dedup(&message).await.expect("Failed to clear dedup");
    println!("Job {} acknowledged", job_id);
}

/// Test duplicate enqueue rejection via the dedup key.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_duplicate_enqueue_rejected() {
    use recap_models::{ContentGenerationRequest, JobId};
    use recap_queue::GenerationJobMessage;

    dotenvy::dotenv().ok();

    let queue = recap_queue::JobQueue::from_env().expect("Failed to create queue");
    queue.init().await.expect("Failed to initialize queue");

    let end = Utc::now();
    let request = ContentGenerationRequest::daily(end - Duration::days(1), end);
    let message = GenerationJobMessage::new(JobId::new(), request);

    queue.enqueue(&message).await.expect("First enqueue failed");
    let duplicate = queue.enqueue(&message).await;
    assert!(duplicate.is_err(), "Duplicate enqueue should be rejected");

    queue.clear_dedup(&message).await.expect("Failed to clear dedup");
}

/// Test job store row lifecycle against a real Redis.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_job_store_roundtrip() {
    use recap_models::{ContentGenerationRequest, JobState};
    use recap_queue::{JobStore, RedisJobStore};

    dotenvy::dotenv().ok();

    let store = RedisJobStore::from_env().expect("Failed to create job store");

    let end = Utc::now();
    let request = ContentGenerationRequest::daily(end - Duration::days(1), end);
    let job = JobState::new(request, Duration::hours(1));
    let job_id = job.job_id.clone();

    store.put(&job).await.expect("Failed to store job");

    let loaded = store
        .get(&job_id)
        .await
        .expect("Failed to load job")
        .expect("Job row missing");
    assert_eq!(loaded.job_id, job_id);

    store.delete(&job_id).await.expect("Failed to delete job");
    assert!(store.get(&job_id).await.expect("Failed to load").is_none());
}
