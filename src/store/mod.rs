//! Document store contract and the two bundled implementations.
//!
//! Records are JSON documents grouped in named collections and identified by their `_id` field.
//! The store enforces the unique keys declared per collection in [`unique_keys`] and rejects
//! records above its size ceiling.

mod collections;
pub mod file;
pub mod journal;
pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::constants::{INTERLANGUAGE_LINKS_COLLECTION, PAGES_COLLECTION, REVISION_FIELD};
use crate::error::{MosaicoError, Result};
use crate::types::{Filter, RecordId};

pub use file::FileStore;
pub use journal::{Journal, JournalRecord};
pub use memory::InMemoryStore;

/// Persistence collaborator used by pages, links and the client.
///
/// Implementations must be safe to share between tasks. None of the operations retry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Write a new record.
    ///
    /// # Errors
    ///
    /// - `UniqueViolation` if a record with the same `_id` or the same value of a unique key exists
    /// - `RecordTooLarge` above the size ceiling
    async fn insert(&self, collection: &'static str, document: Value) -> Result<()>;

    /// Write a record, replacing the one with the same `_id` if present.
    async fn upsert(&self, collection: &'static str, document: Value) -> Result<()>;

    async fn get(&self, collection: &'static str, id: RecordId) -> Result<Option<Value>>;

    /// Records matching `filter`, in insertion order.
    async fn find(
        &self,
        collection: &'static str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Value>>;

    /// Remove a record. Returns whether it existed.
    async fn delete(&self, collection: &'static str, id: RecordId) -> Result<bool>;

    /// Replace the record with the same `_id` only while its stored [`REVISION_FIELD`] still
    /// equals `expected`, as one atomic step.
    ///
    /// Returns `false`, writing nothing, when the record is missing or its revision moved on.
    /// The caller bumps the revision inside `document`.
    async fn replace_if_revision(
        &self,
        collection: &'static str,
        document: Value,
        expected: u64,
    ) -> Result<bool>;

    async fn find_one(&self, collection: &'static str, filter: &Filter) -> Result<Option<Value>> {
        Ok(self
            .find(collection, filter, Some(1))
            .await?
            .into_iter()
            .next())
    }
}

/// Field sets that must be unique within `collection`.
#[must_use]
pub fn unique_keys(collection: &str) -> &'static [&'static [&'static str]] {
    match collection {
        PAGES_COLLECTION => &[&["title", "language"], &["document_id", "language"]],
        INTERLANGUAGE_LINKS_COLLECTION => &[&["wikidata_id"]],
        _ => &[],
    }
}

/// Revision carried by a stored document, 0 when the field is absent.
#[must_use]
pub fn revision_of(document: &Value) -> u64 {
    document
        .get(REVISION_FIELD)
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// Identity of a stored document.
pub fn record_id(document: &Value) -> Result<RecordId> {
    document
        .get("_id")
        .and_then(Value::as_str)
        .ok_or_else(|| MosaicoError::invalid_encoding("record without a string `_id`"))?
        .parse()
}
