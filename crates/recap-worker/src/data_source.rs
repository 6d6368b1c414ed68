//! Manifest-builder data source over the blob store.

use std::sync::Arc;

use async_trait::async_trait;

use recap_engine::ItemDataSource;
use recap_models::{ClipId, GitHubContext, Transcript};
use recap_storage::{load_context, load_transcript, BlobStore};

/// Serves stored transcript/context artifacts to the manifest builder.
#[derive(Clone)]
pub struct StoredItemData {
    store: Arc<dyn BlobStore>,
}

impl StoredItemData {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ItemDataSource for StoredItemData {
    async fn transcript(&self, id: &ClipId) -> Option<Transcript> {
        load_transcript(self.store.as_ref(), id).await
    }

    async fn context(&self, id: &ClipId) -> Option<GitHubContext> {
        load_context(self.store.as_ref(), id).await
    }
}
