//! Single-file persistent store.
//!
//! Every write is appended to a [`Journal`] before it is applied to the in-memory collections;
//! opening the file replays the journal. The file is locked exclusively for the lifetime of the
//! store.

use std::borrow::Cow;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;

use super::DocumentStore;
use super::collections::{Collections, WriteMode};
use super::journal::Journal;
use crate::error::{MosaicoError, Result};
use crate::types::{FileStoreOptions, Filter, RecordId};

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
enum JournalEntry<'a> {
    Put {
        collection: Cow<'a, str>,
        document: Cow<'a, Value>,
    },
    Delete {
        collection: Cow<'a, str>,
        id: RecordId,
    },
}

#[derive(Debug)]
struct FileState {
    collections: Collections,
    journal: Journal,
}

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    // held for the exclusive lock
    _lock: File,
    state: Mutex<FileState>,
}

impl FileStore {
    /// Open or create the store at `path` and replay its journal.
    pub fn open<P: AsRef<Path>>(path: P, options: FileStoreOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        file.try_lock_exclusive().map_err(|err| {
            MosaicoError::Lock(format!("{} is in use: {err}", path.display()))
        })?;

        let (journal, records) = Journal::open(file.try_clone()?, options.sync_writes)?;
        let mut collections = Collections::new(options.max_record_bytes);
        for record in &records {
            let entry: JournalEntry<'_> = serde_json::from_slice(&record.payload).map_err(|err| {
                MosaicoError::JournalCorruption {
                    offset: record.sequence,
                    reason: format!("undecodable entry: {err}"),
                }
            })?;
            match entry {
                JournalEntry::Put {
                    collection,
                    document,
                } => {
                    let document = document.into_owned();
                    let id = super::record_id(&document)?;
                    collections.apply_write(&collection, id, document);
                }
                JournalEntry::Delete { collection, id } => {
                    collections.remove(&collection, id);
                }
            }
        }
        tracing::info!(
            store.path = %path.display(),
            store.replayed = records.len(),
            "file store opened"
        );
        Ok(Self {
            path,
            _lock: file,
            state: Mutex::new(FileState {
                collections,
                journal,
            }),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// fsync the journal; only needed with `sync_writes` off.
    pub async fn flush(&self) -> Result<()> {
        self.state.lock().await.journal.flush()
    }

    async fn write(
        &self,
        collection: &'static str,
        document: Value,
        mode: WriteMode,
    ) -> Result<()> {
        let mut state = self.state.lock().await;
        let id = state.collections.check_write(collection, &document, mode)?;
        Self::put(&mut state, collection, id, document)
    }

    fn put(
        state: &mut FileState,
        collection: &'static str,
        id: RecordId,
        document: Value,
    ) -> Result<()> {
        let payload = serde_json::to_vec(&JournalEntry::Put {
            collection: Cow::Borrowed(collection),
            document: Cow::Borrowed(&document),
        })?;
        state.journal.append(&payload)?;
        state.collections.apply_write(collection, id, document);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn insert(&self, collection: &'static str, document: Value) -> Result<()> {
        self.write(collection, document, WriteMode::Insert).await
    }

    async fn upsert(&self, collection: &'static str, document: Value) -> Result<()> {
        self.write(collection, document, WriteMode::Upsert).await
    }

    async fn get(&self, collection: &'static str, id: RecordId) -> Result<Option<Value>> {
        Ok(self.state.lock().await.collections.get(collection, id).cloned())
    }

    async fn find(
        &self,
        collection: &'static str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        Ok(self
            .state
            .lock()
            .await
            .collections
            .find(collection, filter, limit))
    }

    async fn delete(&self, collection: &'static str, id: RecordId) -> Result<bool> {
        let mut state = self.state.lock().await;
        if state.collections.get(collection, id).is_none() {
            return Ok(false);
        }
        let payload = serde_json::to_vec(&JournalEntry::Delete {
            collection: Cow::Borrowed(collection),
            id,
        })?;
        state.journal.append(&payload)?;
        Ok(state.collections.remove(collection, id))
    }

    async fn replace_if_revision(
        &self,
        collection: &'static str,
        document: Value,
        expected: u64,
    ) -> Result<bool> {
        let mut state = self.state.lock().await;
        let id = state
            .collections
            .check_write(collection, &document, WriteMode::Upsert)?;
        if !state.collections.revision_matches(collection, id, expected) {
            return Ok(false);
        }
        Self::put(&mut state, collection, id, document)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{
        ANNOTATIONS_COLLECTION, INTERLANGUAGE_LINKS_COLLECTION, PAGES_COLLECTION,
    };
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test]
    async fn writes_survive_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("mosaico.journal");
        let kept = RecordId::random();
        let dropped = RecordId::random();
        {
            let store = FileStore::open(&path, FileStoreOptions::default()).expect("open");
            for id in [kept, dropped] {
                store
                    .insert(ANNOTATIONS_COLLECTION, json!({"_id": id.to_string(), "name": "wsd"}))
                    .await
                    .expect("insert");
            }
            store
                .upsert(ANNOTATIONS_COLLECTION, json!({"_id": kept.to_string(), "name": "srl"}))
                .await
                .expect("upsert");
            assert!(store.delete(ANNOTATIONS_COLLECTION, dropped).await.expect("delete"));
        }

        let store = FileStore::open(&path, FileStoreOptions::default()).expect("reopen");
        let record = store
            .get(ANNOTATIONS_COLLECTION, kept)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(record["name"], json!("srl"));
        assert!(store.get(ANNOTATIONS_COLLECTION, dropped).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn rejected_writes_are_not_journaled() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("mosaico.journal");
        {
            let store = FileStore::open(&path, FileStoreOptions::default()).expect("open");
            let page = |title: &str| {
                json!({"_id": RecordId::random().to_string(), "title": title,
                       "document_id": title, "language": "it"})
            };
            store.insert(PAGES_COLLECTION, page("Roma")).await.expect("first");
            let mut clash = page("Milano");
            clash["title"] = json!("Roma");
            assert!(store.insert(PAGES_COLLECTION, clash).await.is_err());
        }
        let store = FileStore::open(&path, FileStoreOptions::default()).expect("reopen");
        let pages = store.find(PAGES_COLLECTION, &Filter::new(), None).await.expect("find");
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn second_open_is_locked_out() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("mosaico.journal");
        let _store = FileStore::open(&path, FileStoreOptions::default()).expect("open");
        let err = FileStore::open(&path, FileStoreOptions::default()).expect_err("locked");
        assert!(matches!(err, MosaicoError::Lock(_)));
    }

    #[tokio::test]
    async fn stale_replace_is_not_journaled() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("mosaico.journal");
        let id = RecordId::random();
        let link = |wikidata_id: &str, revision: u64| {
            json!({"_id": id.to_string(), "wikidata_id": wikidata_id, "revision": revision})
        };
        {
            let store = FileStore::open(&path, FileStoreOptions::default()).expect("open");
            store
                .insert(INTERLANGUAGE_LINKS_COLLECTION, link("Q76", 0))
                .await
                .expect("insert");
            assert!(store
                .replace_if_revision(INTERLANGUAGE_LINKS_COLLECTION, link("Q76", 1), 0)
                .await
                .expect("current"));
            assert!(!store
                .replace_if_revision(INTERLANGUAGE_LINKS_COLLECTION, link("Q1", 1), 0)
                .await
                .expect("stale"));
        }
        let store = FileStore::open(&path, FileStoreOptions::default()).expect("reopen");
        let stored = store
            .get(INTERLANGUAGE_LINKS_COLLECTION, id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(stored["wikidata_id"], json!("Q76"));
        assert_eq!(stored["revision"], json!(1));
    }
}
