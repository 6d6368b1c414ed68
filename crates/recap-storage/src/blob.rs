//! Blob-store contract and in-memory implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StorageResult;

/// The narrow blob-store contract consumed by the pipeline.
///
/// Keys are content-addressed paths such as `transcripts/{id}.json`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Get an object's bytes, `None` when the key does not exist.
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Store an object with string metadata.
    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> StorageResult<()>;

    /// List all keys under a prefix.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> StorageResult<bool>;

    /// Delete an object. Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> StorageResult<()>;
}

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Vec<u8>,
    metadata: HashMap<String, String>,
}

/// In-memory blob store for tests and local development.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, StoredBlob>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Metadata stored with an object, for assertions in tests.
    pub async fn metadata_of(&self, key: &str) -> Option<HashMap<String, String>> {
        self.objects.read().await.get(key).map(|b| b.metadata.clone())
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.objects.read().await.get(key).map(|b| b.data.clone()))
    }

    async fn put(
        &self,
        key: &str,
        data: Vec<u8>,
        metadata: HashMap<String, String>,
    ) -> StorageResult<()> {
        self.objects
            .write()
            .await
            .insert(key.to_string(), StoredBlob { data, metadata });
        Ok(())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let store = MemoryBlobStore::new();
        store
            .put("items/a.json", b"{}".to_vec(), HashMap::new())
            .await
            .unwrap();

        let data = store.get("items/a.json").await.unwrap();
        assert_eq!(data, Some(b"{}".to_vec()));
        assert!(store.exists("items/a.json").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let store = MemoryBlobStore::new();
        assert_eq!(store.get("nope").await.unwrap(), None);
        assert!(!store.exists("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_respects_prefix() {
        let store = MemoryBlobStore::new();
        for key in ["transcripts/a.json", "transcripts/b.json", "items/a.json"] {
            store.put(key, Vec::new(), HashMap::new()).await.unwrap();
        }

        let keys = store.list("transcripts/").await.unwrap();
        assert_eq!(keys, vec!["transcripts/a.json", "transcripts/b.json"]);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = MemoryBlobStore::new();
        store.put("k", b"x".to_vec(), HashMap::new()).await.unwrap();

        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert!(store.is_empty().await);
    }
}
