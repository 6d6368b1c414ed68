//! Content item store.
//!
//! Per-clip state records persisted as JSON blobs at `items/{id}.json`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use recap_models::{ClipId, ContentItem};

use crate::blob::BlobStore;
use crate::error::StorageResult;

const ITEM_PREFIX: &str = "items/";

/// Storage key for a content item record.
pub fn item_key(id: &ClipId) -> String {
    format!("{}{}.json", ITEM_PREFIX, id)
}

/// Store for per-clip state records.
#[derive(Clone)]
pub struct ContentItemStore {
    store: Arc<dyn BlobStore>,
}

impl ContentItemStore {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Persist an item record, replacing any previous version.
    pub async fn put(&self, item: &ContentItem) -> StorageResult<()> {
        let key = item_key(&item.id);
        let bytes = serde_json::to_vec(item)?;

        let metadata = HashMap::from([
            ("clip_id".to_string(), item.id.to_string()),
            ("status".to_string(), item.status.as_str().to_string()),
        ]);

        debug!(key = %key, status = item.status.as_str(), "Storing content item");
        self.store.put(&key, bytes, metadata).await
    }

    /// Fetch an item record by clip ID.
    pub async fn get(&self, id: &ClipId) -> StorageResult<Option<ContentItem>> {
        let key = item_key(id);
        match self.store.get(&key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// List all stored item records.
    ///
    /// Records that fail to parse are skipped with a warning rather than
    /// failing the whole listing.
    pub async fn list_items(&self) -> StorageResult<Vec<ContentItem>> {
        let keys = self.store.list(ITEM_PREFIX).await?;
        let mut items = Vec::with_capacity(keys.len());

        for key in keys {
            let Some(bytes) = self.store.get(&key).await? else {
                continue;
            };
            match serde_json::from_slice::<ContentItem>(&bytes) {
                Ok(item) => items.push(item),
                Err(e) => warn!(key = %key, error = %e, "Skipping unreadable item record"),
            }
        }

        Ok(items)
    }

    /// Delete an item record.
    pub async fn delete(&self, id: &ClipId) -> StorageResult<()> {
        self.store.delete(&item_key(id)).await
    }
}
