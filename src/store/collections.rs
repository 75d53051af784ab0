//! In-memory collection engine shared by both stores.

use std::collections::HashMap;

use serde_json::Value;

use super::{record_id, revision_of, unique_keys};
use crate::error::{MosaicoError, Result};
use crate::types::{Filter, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    Insert,
    Upsert,
}

#[derive(Debug, Default)]
struct Collection {
    order: Vec<RecordId>,
    records: HashMap<RecordId, Value>,
}

#[derive(Debug)]
pub(crate) struct Collections {
    collections: HashMap<String, Collection>,
    max_record_bytes: usize,
}

impl Collections {
    pub(crate) fn new(max_record_bytes: usize) -> Self {
        Self {
            collections: HashMap::new(),
            max_record_bytes,
        }
    }

    /// Validate a write without applying it; returns the record identity.
    pub(crate) fn check_write(
        &self,
        collection: &'static str,
        document: &Value,
        mode: WriteMode,
    ) -> Result<RecordId> {
        let id = record_id(document)?;
        let size = serde_json::to_vec(document)?.len();
        if size > self.max_record_bytes {
            return Err(MosaicoError::RecordTooLarge {
                collection,
                size,
                limit: self.max_record_bytes,
            });
        }
        let Some(existing) = self.collections.get(collection) else {
            return Ok(id);
        };
        if mode == WriteMode::Insert && existing.records.contains_key(&id) {
            return Err(MosaicoError::UniqueViolation {
                collection,
                fields: "_id".into(),
            });
        }
        for fields in unique_keys(collection) {
            let key = key_of(document, fields);
            let clash = existing
                .records
                .iter()
                .any(|(other_id, other)| *other_id != id && key_of(other, fields) == key);
            if clash {
                return Err(MosaicoError::UniqueViolation {
                    collection,
                    fields: fields.join(", "),
                });
            }
        }
        Ok(id)
    }

    /// Whether the stored record `id` exists and sits at revision `expected`.
    pub(crate) fn revision_matches(&self, collection: &str, id: RecordId, expected: u64) -> bool {
        self.get(collection, id)
            .is_some_and(|stored| revision_of(stored) == expected)
    }

    pub(crate) fn apply_write(&mut self, collection: &str, id: RecordId, document: Value) {
        let entry = self.collections.entry(collection.to_string()).or_default();
        if entry.records.insert(id, document).is_none() {
            entry.order.push(id);
        }
    }

    pub(crate) fn get(&self, collection: &str, id: RecordId) -> Option<&Value> {
        self.collections.get(collection)?.records.get(&id)
    }

    pub(crate) fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Vec<Value> {
        let Some(entry) = self.collections.get(collection) else {
            return Vec::new();
        };
        entry
            .order
            .iter()
            .filter_map(|id| entry.records.get(id))
            .filter(|document| filter.matches(document))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    pub(crate) fn remove(&mut self, collection: &str, id: RecordId) -> bool {
        let Some(entry) = self.collections.get_mut(collection) else {
            return false;
        };
        if entry.records.remove(&id).is_none() {
            return false;
        }
        entry.order.retain(|other| *other != id);
        true
    }

    pub(crate) fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map_or(0, |entry| entry.records.len())
    }
}

fn key_of<'a>(document: &'a Value, fields: &[&str]) -> Vec<&'a Value> {
    fields
        .iter()
        .map(|field| document.get(*field).unwrap_or(&Value::Null))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{ANNOTATIONS_COLLECTION, PAGES_COLLECTION};
    use serde_json::json;

    fn page(id: RecordId, title: &str, document_id: &str) -> Value {
        json!({"_id": id.to_string(), "title": title, "document_id": document_id, "language": "en"})
    }

    #[test]
    fn unique_keys_are_enforced() {
        let mut collections = Collections::new(1 << 20);
        let first = RecordId::random();
        let doc = page(first, "Barack Obama", "534366");
        let id = collections
            .check_write(PAGES_COLLECTION, &doc, WriteMode::Insert)
            .expect("first write");
        collections.apply_write(PAGES_COLLECTION, id, doc);

        let same_title = page(RecordId::random(), "Barack Obama", "1");
        let err = collections
            .check_write(PAGES_COLLECTION, &same_title, WriteMode::Insert)
            .expect_err("title clash");
        assert!(matches!(
            err,
            MosaicoError::UniqueViolation { ref fields, .. } if fields == "title, language"
        ));

        let same_document = page(RecordId::random(), "Obama", "534366");
        assert!(collections
            .check_write(PAGES_COLLECTION, &same_document, WriteMode::Insert)
            .is_err());

        // rewriting the record itself is not a clash
        let updated = page(first, "Barack Obama", "534366");
        assert!(collections
            .check_write(PAGES_COLLECTION, &updated, WriteMode::Upsert)
            .is_ok());
        assert!(collections
            .check_write(PAGES_COLLECTION, &updated, WriteMode::Insert)
            .is_err());
    }

    #[test]
    fn size_ceiling() {
        let collections = Collections::new(64);
        let doc = json!({"_id": RecordId::random().to_string(), "blob": "x".repeat(100)});
        let err = collections
            .check_write(ANNOTATIONS_COLLECTION, &doc, WriteMode::Upsert)
            .expect_err("too large");
        assert!(matches!(err, MosaicoError::RecordTooLarge { limit: 64, .. }));
    }

    #[test]
    fn find_keeps_insertion_order_and_limit() {
        let mut collections = Collections::new(1 << 20);
        let ids: Vec<RecordId> = (0..4).map(|_| RecordId::random()).collect();
        for (n, id) in ids.iter().enumerate() {
            collections.apply_write(
                ANNOTATIONS_COLLECTION,
                *id,
                json!({"_id": id.to_string(), "n": n, "even": n % 2 == 0}),
            );
        }
        let even = collections.find(ANNOTATIONS_COLLECTION, &Filter::new().eq("even", true), None);
        assert_eq!(
            even.iter().map(|d| d["n"].clone()).collect::<Vec<_>>(),
            vec![json!(0), json!(2)]
        );
        assert_eq!(collections.find(ANNOTATIONS_COLLECTION, &Filter::new(), Some(3)).len(), 3);

        assert!(collections.remove(ANNOTATIONS_COLLECTION, ids[0]));
        assert!(!collections.remove(ANNOTATIONS_COLLECTION, ids[0]));
        assert_eq!(collections.len(ANNOTATIONS_COLLECTION), 3);
        let first = &collections.find(ANNOTATIONS_COLLECTION, &Filter::new(), None)[0];
        assert_eq!(first["n"], json!(1));
        assert!(collections.get(ANNOTATIONS_COLLECTION, ids[1]).is_some());
    }

    #[test]
    fn revision_guard() {
        let mut collections = Collections::new(1 << 20);
        let id = RecordId::random();
        assert!(!collections.revision_matches(ANNOTATIONS_COLLECTION, id, 0));

        collections.apply_write(ANNOTATIONS_COLLECTION, id, json!({"_id": id.to_string()}));
        assert!(collections.revision_matches(ANNOTATIONS_COLLECTION, id, 0));
        assert!(!collections.revision_matches(ANNOTATIONS_COLLECTION, id, 1));

        collections.apply_write(
            ANNOTATIONS_COLLECTION,
            id,
            json!({"_id": id.to_string(), "revision": 1}),
        );
        assert!(!collections.revision_matches(ANNOTATIONS_COLLECTION, id, 0));
        assert!(collections.revision_matches(ANNOTATIONS_COLLECTION, id, 1));
    }
}
