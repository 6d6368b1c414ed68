//! Transcript and development-context artifact persistence.
//!
//! Artifacts are stored as JSON blobs; the returned [`ArtifactRef`] carries
//! the true stored byte size so downstream validation needs no storage
//! round trip.

use std::collections::HashMap;

use tracing::debug;

use recap_models::{ArtifactRef, ClipId, GitHubContext, Transcript};

use crate::blob::BlobStore;
use crate::error::StorageResult;

/// Characters of transcript text kept as the reference summary.
const SUMMARY_CHARS: usize = 100;

/// Storage key for a clip's transcript.
pub fn transcript_key(id: &ClipId) -> String {
    format!("transcripts/{}.json", id)
}

/// Storage key for a clip's development-context object.
pub fn context_key(id: &ClipId) -> String {
    format!("github-context/{}.json", id)
}

fn clip_metadata(id: &ClipId) -> HashMap<String, String> {
    HashMap::from([("clip_id".to_string(), id.to_string())])
}

/// Store a transcript and return its reference.
pub async fn store_transcript(
    store: &dyn BlobStore,
    id: &ClipId,
    transcript: &Transcript,
) -> StorageResult<ArtifactRef> {
    let key = transcript_key(id);
    let bytes = serde_json::to_vec(transcript)?;
    let size_bytes = bytes.len() as u64;

    debug!(key = %key, size_bytes, "Storing transcript");
    store.put(&key, bytes, clip_metadata(id)).await?;

    Ok(ArtifactRef::new(key, size_bytes, transcript.summary(SUMMARY_CHARS)))
}

/// Load a transcript, `None` on missing key or corrupt data.
pub async fn load_transcript(store: &dyn BlobStore, id: &ClipId) -> Option<Transcript> {
    let key = transcript_key(id);
    let data = store.get(&key).await.ok().flatten()?;

    match serde_json::from_slice(&data) {
        Ok(transcript) => Some(transcript),
        Err(e) => {
            debug!(key = %key, error = %e, "Transcript artifact unreadable");
            None
        }
    }
}

/// Store a development-context object and return its reference.
pub async fn store_context(
    store: &dyn BlobStore,
    id: &ClipId,
    context: &GitHubContext,
) -> StorageResult<ArtifactRef> {
    let key = context_key(id);
    let bytes = serde_json::to_vec(context)?;
    let size_bytes = bytes.len() as u64;

    debug!(key = %key, size_bytes, "Storing github context");
    store.put(&key, bytes, clip_metadata(id)).await?;

    let summary = format!(
        "{} PRs, {} commits, {} issues",
        context.pull_requests.len(),
        context.commits.len(),
        context.issues.len()
    );
    Ok(ArtifactRef::new(key, size_bytes, summary))
}

/// Load a development-context object, `None` on missing key or corrupt data.
pub async fn load_context(store: &dyn BlobStore, id: &ClipId) -> Option<GitHubContext> {
    let key = context_key(id);
    let data = store.get(&key).await.ok().flatten()?;

    match serde_json::from_slice(&data) {
        Ok(context) => Some(context),
        Err(e) => {
            debug!(key = %key, error = %e, "Context artifact unreadable");
            None
        }
    }
}
