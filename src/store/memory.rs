//! Process-local store.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::DocumentStore;
use super::collections::{Collections, WriteMode};
use crate::constants::DEFAULT_MAX_RECORD_BYTES;
use crate::error::Result;
use crate::types::{Filter, RecordId};

/// Store kept entirely in memory. Contents are lost on drop.
#[derive(Debug)]
pub struct InMemoryStore {
    inner: RwLock<Collections>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_record_bytes(DEFAULT_MAX_RECORD_BYTES)
    }

    #[must_use]
    pub fn with_max_record_bytes(max_record_bytes: usize) -> Self {
        Self {
            inner: RwLock::new(Collections::new(max_record_bytes)),
        }
    }

    /// Number of records in `collection`.
    pub async fn len(&self, collection: &str) -> usize {
        self.inner.read().await.len(collection)
    }

    async fn write(
        &self,
        collection: &'static str,
        document: Value,
        mode: WriteMode,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let id = inner.check_write(collection, &document, mode)?;
        inner.apply_write(collection, id, document);
        tracing::debug!(store.collection = collection, store.id = %id, "record written");
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert(&self, collection: &'static str, document: Value) -> Result<()> {
        self.write(collection, document, WriteMode::Insert).await
    }

    async fn upsert(&self, collection: &'static str, document: Value) -> Result<()> {
        self.write(collection, document, WriteMode::Upsert).await
    }

    async fn get(&self, collection: &'static str, id: RecordId) -> Result<Option<Value>> {
        Ok(self.inner.read().await.get(collection, id).cloned())
    }

    async fn find(
        &self,
        collection: &'static str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        Ok(self.inner.read().await.find(collection, filter, limit))
    }

    async fn delete(&self, collection: &'static str, id: RecordId) -> Result<bool> {
        Ok(self.inner.write().await.remove(collection, id))
    }

    async fn replace_if_revision(
        &self,
        collection: &'static str,
        document: Value,
        expected: u64,
    ) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let id = inner.check_write(collection, &document, WriteMode::Upsert)?;
        if !inner.revision_matches(collection, id, expected) {
            return Ok(false);
        }
        inner.apply_write(collection, id, document);
        tracing::debug!(store.collection = collection, store.id = %id, "record replaced");
        Ok(true)
    }
}
