//! End-to-end annotation access: embedded and linked storage, dependency preparation, caching.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mosaico_core::constants::ANNOTATIONS_COLLECTION;
use mosaico_core::{
    AnnotationKind, DocumentStore, Filter, InMemoryStore, Language, Mosaico, MosaicoConfig,
    MosaicoError, PageDraft, RecordId, Result,
};
use mosaico_core::annotations::{ReAnnotation, StanzaAnnotation, WsdAnnotation};
use serde_json::{Value, json};

const TEXT: &str = "Obama was president. He lived in Washington.";

/// Store wrapper counting reads of the linked annotation collection, optionally stalling them.
#[derive(Default)]
struct CountingStore {
    inner: InMemoryStore,
    annotation_reads: AtomicUsize,
    slow: AtomicBool,
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn insert(&self, collection: &'static str, document: Value) -> Result<()> {
        self.inner.insert(collection, document).await
    }

    async fn upsert(&self, collection: &'static str, document: Value) -> Result<()> {
        self.inner.upsert(collection, document).await
    }

    async fn get(&self, collection: &'static str, id: RecordId) -> Result<Option<Value>> {
        if collection == ANNOTATIONS_COLLECTION {
            self.annotation_reads.fetch_add(1, Ordering::SeqCst);
            if self.slow.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
        self.inner.get(collection, id).await
    }

    async fn find(
        &self,
        collection: &'static str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Value>> {
        self.inner.find(collection, filter, limit).await
    }

    async fn delete(&self, collection: &'static str, id: RecordId) -> Result<bool> {
        self.inner.delete(collection, id).await
    }

    async fn replace_if_revision(
        &self,
        collection: &'static str,
        document: Value,
        expected: u64,
    ) -> Result<bool> {
        self.inner
            .replace_if_revision(collection, document, expected)
            .await
    }
}

fn stanza() -> StanzaAnnotation {
    serde_json::from_value(json!({"document": {"sentences": [
        {"t": [
            {"d": [[0, 5], 11, [[1]]], "e": {"n": "S-PER"}},
            {"d": [[6, 9], 3, [[0]]], "e": {"l": "be"}},
            {"d": [[10, 19], 7, [[1]]]},
            {"d": [[19, 20], 12, [[0]]]}
        ]},
        {"t": [
            {"d": [[21, 23], 10, [[0]]]},
            {"d": [[24, 29], 15, [[0]]], "e": {"l": "live"}},
            {"d": [[30, 32], 1, [[0]]]},
            {"d": [[33, 43], 11, [[1]]], "e": {"n": "S-LOC"}},
            {"d": [[43, 44], 12, [[0]]]}
        ]}
    ]}}))
    .expect("stanza")
}

fn relations() -> ReAnnotation {
    serde_json::from_value(json!({"triples": [{
        "origin": {"paragraph_idx": 0, "sentence_span": [0, 2]},
        "annotator": "relik",
        "relation": {"title": "residence", "wikidata_id": "P551"},
        "head": {"sentence_idx": 0, "token_span": [0, 1], "wikidata_id": "Q76"},
        "tail": {"sentence_idx": 1, "token_span": [3, 4], "wikidata_id": "Q61"}
    }]}))
    .expect("relations")
}

fn draft() -> PageDraft {
    PageDraft::new("534366", "Barack Obama", Language::En, TEXT)
        .wikidata_id("Q76")
        .annotation(relations())
        .linked_annotation(stanza())
}

#[tokio::test]
async fn relation_mentions_resolve_through_linked_stanza() {
    let mosaico = Mosaico::in_memory(MosaicoConfig::default()).expect("client");
    let mut page = mosaico.create_page(draft()).expect("page");
    mosaico.insert_page(&mut page).await.expect("insert");

    let mut page = mosaico.get_page(page.id()).await.expect("reload");
    assert!(page.is_linked(AnnotationKind::Stanza));
    assert!(!page.is_prepared(AnnotationKind::Stanza));

    let re = page.get_annotation(AnnotationKind::Re).await.expect("re");
    // preparing relations prepares stanza first
    assert!(page.is_prepared(AnnotationKind::Stanza));

    let re = re.as_re().expect("re payload");
    let triple = re.triple(0).expect("triple");
    assert_eq!(triple.relation().title, "residence");
    assert_eq!(triple.head().mention(), "Obama");
    assert_eq!(triple.tail().mention(), "Washington");
    assert_eq!(triple.tail().wikidata_id(), Some("Q61"));

    let stanza = page.get_annotation(AnnotationKind::Stanza).await.expect("stanza");
    let document = stanza.as_stanza().expect("stanza payload").document();
    assert_eq!(document.len(), 2);
    let obama = document.sentence(0).and_then(|s| s.token(0)).expect("token");
    assert_eq!(obama.ner(), "S-PER");
    assert_eq!(document.sentence(1).expect("sentence").text(), "He lived in Washington.");
}

#[tokio::test]
async fn linked_annotation_is_fetched_once() {
    let store = Arc::new(CountingStore::default());
    let mosaico = Mosaico::new(store.clone(), MosaicoConfig::default()).expect("client");
    let mut page = mosaico.create_page(draft()).expect("page");
    mosaico.insert_page(&mut page).await.expect("insert");

    let mut page = mosaico.get_page(page.id()).await.expect("reload");
    let first = page.get_annotation(AnnotationKind::Stanza).await.expect("first");
    let second = page.get_annotation(AnnotationKind::Stanza).await.expect("second");
    assert!(Arc::ptr_eq(&first, &second));
    page.get_annotation(AnnotationKind::Re).await.expect("re");
    assert_eq!(store.annotation_reads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn stalled_fetch_times_out_and_can_be_retried() {
    let store = Arc::new(CountingStore::default());
    let config = MosaicoConfig::builder()
        .fetch_timeout(Duration::from_millis(20))
        .build();
    let mosaico = Mosaico::new(store.clone(), config).expect("client");
    let mut page = mosaico.create_page(draft()).expect("page");
    mosaico.insert_page(&mut page).await.expect("insert");

    let mut page = mosaico.get_page(page.id()).await.expect("reload");
    store.slow.store(true, Ordering::SeqCst);
    let err = page
        .get_annotation(AnnotationKind::Stanza)
        .await
        .expect_err("stalled read");
    assert!(matches!(err, MosaicoError::Timeout { timeout_ms: 20, .. }));
    // still a reference, nothing half-loaded
    assert!(page.is_linked(AnnotationKind::Stanza));
    assert!(!page.is_prepared(AnnotationKind::Stanza));

    store.slow.store(false, Ordering::SeqCst);
    let stanza = page.get_annotation(AnnotationKind::Stanza).await.expect("retry");
    assert_eq!(stanza.as_stanza().expect("stanza payload").document().len(), 2);
    assert_eq!(store.annotation_reads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cursor_walks_materialized_then_linked() {
    let mosaico = Mosaico::in_memory(MosaicoConfig::default()).expect("client");
    let mut page = mosaico
        .create_page(draft().linked_annotation(WsdAnnotation::default()))
        .expect("page");
    mosaico.insert_page(&mut page).await.expect("insert");

    let mut page = mosaico.get_page(page.id()).await.expect("reload");
    let kinds: Vec<AnnotationKind> = page
        .list_annotations()
        .try_collect()
        .await
        .expect("walk")
        .iter()
        .map(|annotation| annotation.kind())
        .collect();
    assert_eq!(
        kinds,
        vec![AnnotationKind::Re, AnnotationKind::Stanza, AnnotationKind::Wsd]
    );
}

#[tokio::test]
async fn deleted_linked_annotation_leaves_the_store_on_save() {
    let store = Arc::new(InMemoryStore::new());
    let mosaico = Mosaico::new(store.clone(), MosaicoConfig::default()).expect("client");
    let mut page = mosaico.create_page(draft()).expect("page");
    mosaico.insert_page(&mut page).await.expect("insert");
    assert_eq!(store.len(ANNOTATIONS_COLLECTION).await, 1);

    page.delete_annotation(AnnotationKind::Stanza).expect("delete");
    // not written yet
    assert_eq!(store.len(ANNOTATIONS_COLLECTION).await, 1);
    page.save().await.expect("save");
    assert_eq!(store.len(ANNOTATIONS_COLLECTION).await, 0);

    let mut reloaded = mosaico.get_page(page.id()).await.expect("reload");
    assert!(!reloaded.has_annotation(AnnotationKind::Stanza));
    let err = reloaded
        .get_annotation(AnnotationKind::Re)
        .await
        .expect_err("stanza is gone");
    assert!(matches!(err, MosaicoError::AnnotationNotFound { ref kind } if kind == "stanza"));
}

#[tokio::test]
async fn readding_after_delete_keeps_the_record() {
    let store = Arc::new(InMemoryStore::new());
    let mosaico = Mosaico::new(store.clone(), MosaicoConfig::default()).expect("client");
    let mut page = mosaico.create_page(draft()).expect("page");
    mosaico.insert_page(&mut page).await.expect("insert");

    page.delete_annotation(AnnotationKind::Stanza).expect("delete");
    page.add_annotation(stanza(), false).expect("re-add");
    page.save().await.expect("save");
    assert_eq!(store.len(ANNOTATIONS_COLLECTION).await, 1);

    let mut reloaded = mosaico.get_page(page.id()).await.expect("reload");
    assert!(reloaded.get_annotation(AnnotationKind::Stanza).await.is_ok());
}

#[tokio::test]
async fn duplicate_annotation_is_rejected() {
    let mosaico = Mosaico::in_memory(MosaicoConfig::default()).expect("client");
    let mut page = mosaico.create_page(draft()).expect("page");
    let err = page.add_annotation(stanza(), true).expect_err("duplicate");
    assert!(matches!(err, MosaicoError::DuplicateAnnotation { ref kind } if kind == "stanza"));
}
