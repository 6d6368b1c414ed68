//! R2 storage integration tests.

/// Test R2 connectivity.
#[tokio::test]
#[ignore = "requires R2 credentials"]
async fn test_r2_connectivity() {
    dotenvy::dotenv().ok();

    let client = recap_storage::R2Client::from_env()
        .await
        .expect("Failed to create R2 client");

    client
        .check_connectivity()
        .await
        .expect("R2 connectivity check failed");
}

/// Test artifact store/load against a real bucket.
#[tokio::test]
#[ignore = "requires R2 credentials"]
async fn test_transcript_artifact_roundtrip() {
    use recap_models::{ClipId, Transcript};
    use recap_storage::{load_transcript, store_transcript, BlobStore};

    dotenvy::dotenv().ok();

    let client = recap_storage::R2Client::from_env()
        .await
        .expect("Failed to create R2 client");

    let clip_id = ClipId::parse("integration-test-clip").expect("valid clip id");
    let transcript = Transcript::new("integration test transcript body");

    let artifact = store_transcript(&client, &clip_id, &transcript)
        .await
        .expect("Failed to store transcript");
    assert!(artifact.is_valid());

    let loaded = load_transcript(&client, &clip_id)
        .await
        .expect("Transcript missing after store");
    assert_eq!(loaded, transcript);

    client
        .delete(&artifact.url)
        .await
        .expect("Failed to clean up test object");
}
