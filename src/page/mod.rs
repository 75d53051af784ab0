//! Wikipedia page aggregate.
//!
//! A [`WikiPage`] owns its compressed text and one slot per annotation kind. Embedded
//! annotations arrive with the page record; linked ones are fetched from the store the first
//! time they are asked for. Either way an annotation is prepared at most once and the same
//! [`Arc`] is handed out afterwards.

mod cursor;
mod entry;
mod record;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::Value;

pub use cursor::AnnotationCursor;
pub use record::{PageDraft, PageRecord};

use self::entry::{AnnotationCell, AnnotationEntry};
use self::record::PageRecordRef;
use crate::annotations::container::{ContainerRef, LinkedRecordRef};
use crate::annotations::{
    Annotation, AnnotationKind, Link, LinkedAnnotationRecord, PreparedAnnotation, registry,
};
use crate::codec::{PageText, compress_text, decompress_text};
use crate::constants::{ANNOTATIONS_COLLECTION, PAGES_COLLECTION};
use crate::error::{MosaicoError, Result};
use crate::interlanguage::InterlanguageLink;
use crate::prepare::PreparationContext;
use crate::store::DocumentStore;
use crate::types::{AnnotationId, Language, MosaicoConfig, PageId, RecordId};

pub struct WikiPage {
    id: PageId,
    document_id: String,
    wikidata_id: Option<String>,
    title: String,
    language: Language,
    quality: Option<String>,
    is_mosaico_core: bool,
    compressed_text: Vec<u8>,
    text: OnceCell<PageText>,
    /// Materialized entries first, then linked ones.
    entries: Vec<AnnotationEntry>,
    /// Linked records to drop on the next save.
    pending_deletes: Vec<AnnotationId>,
    persisted: bool,
    store: Arc<dyn DocumentStore>,
    config: MosaicoConfig,
}

impl fmt::Debug for WikiPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WikiPage")
            .field("id", &self.id)
            .field("document_id", &self.document_id)
            .field("title", &self.title)
            .field("language", &self.language)
            .field("annotations", &self.annotation_kinds())
            .field("persisted", &self.persisted)
            .finish_non_exhaustive()
    }
}

/// Linked record identity of `kind` on page `page_id`.
fn linked_annotation_id(page_id: PageId, kind: AnnotationKind) -> AnnotationId {
    RecordId::derive(&[page_id.as_bytes(), kind.tag().as_bytes()])
}

/// Transitive dependencies of `kind`, each after its own dependencies.
fn preparation_order(kind: AnnotationKind) -> Vec<AnnotationKind> {
    fn visit(kind: AnnotationKind, order: &mut Vec<AnnotationKind>) {
        for dependency in kind.dependencies() {
            if !order.contains(dependency) {
                visit(*dependency, order);
                order.push(*dependency);
            }
        }
    }
    let mut order = Vec::new();
    visit(kind, &mut order);
    order
}

impl WikiPage {
    /// New page, not yet in the store.
    pub(crate) fn create(
        draft: PageDraft,
        store: Arc<dyn DocumentStore>,
        config: MosaicoConfig,
    ) -> Result<Self> {
        let PageDraft {
            document_id,
            title,
            language,
            text,
            wikidata_id,
            quality,
            is_mosaico_core,
            annotations,
        } = draft;
        let compressed_text = compress_text(&text, config.compression_level)?;
        let mut page = Self {
            id: RecordId::random(),
            document_id,
            wikidata_id,
            title,
            language,
            quality,
            is_mosaico_core,
            compressed_text,
            text: OnceCell::with_value(PageText::new(text)),
            entries: Vec::new(),
            pending_deletes: Vec::new(),
            persisted: false,
            store,
            config,
        };
        for (annotation, materialized) in annotations {
            page.add_annotation(annotation, materialized)?;
        }
        Ok(page)
    }

    /// Page decoded from its stored record.
    pub(crate) fn from_record(
        record: PageRecord,
        store: Arc<dyn DocumentStore>,
        config: MosaicoConfig,
    ) -> Result<Self> {
        let PageRecord {
            id,
            document_id,
            wikidata_id,
            title,
            language,
            quality,
            is_mosaico_core,
            compressed_text,
            materialized_annotations,
            linked_annotation_names,
            linked_annotations,
        } = record;
        if linked_annotation_names.len() != linked_annotations.len() {
            return Err(MosaicoError::invalid_encoding(format!(
                "page {id}: {} linked annotation names for {} linked records",
                linked_annotation_names.len(),
                linked_annotations.len()
            )));
        }

        let mut entries: Vec<AnnotationEntry> = materialized_annotations
            .into_iter()
            .map(|container| AnnotationEntry::materialized(container.annotation))
            .collect();
        let registry = registry()?;
        for (name, linked_id) in linked_annotation_names.iter().zip(linked_annotations) {
            let kind = registry.kind(name)?;
            entries.push(AnnotationEntry::linked_reference(kind, linked_id));
        }
        for (index, entry) in entries.iter().enumerate() {
            if entries[..index].iter().any(|other| other.kind == entry.kind) {
                return Err(MosaicoError::DuplicateAnnotation {
                    kind: entry.kind.tag().to_string(),
                });
            }
        }

        Ok(Self {
            id,
            document_id,
            wikidata_id,
            title,
            language,
            quality,
            is_mosaico_core,
            compressed_text,
            text: OnceCell::new(),
            entries,
            pending_deletes: Vec::new(),
            persisted: true,
            store,
            config,
        })
    }

    /// Fetch and decode the page stored under `id`.
    pub(crate) async fn load(
        store: Arc<dyn DocumentStore>,
        config: MosaicoConfig,
        id: PageId,
    ) -> Result<Self> {
        let document = store
            .get(PAGES_COLLECTION, id)
            .await?
            .ok_or_else(|| MosaicoError::RecordNotFound {
                collection: PAGES_COLLECTION,
                id: id.to_string(),
            })?;
        Self::from_value(document, store, config)
    }

    pub(crate) fn from_value(
        document: Value,
        store: Arc<dyn DocumentStore>,
        config: MosaicoConfig,
    ) -> Result<Self> {
        let record: PageRecord = serde_json::from_value(document)?;
        Self::from_record(record, store, config)
    }

    #[must_use]
    pub fn id(&self) -> PageId {
        self.id
    }

    #[must_use]
    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    #[must_use]
    pub fn wikidata_id(&self) -> Option<&str> {
        self.wikidata_id.as_deref()
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    #[must_use]
    pub fn quality(&self) -> Option<&str> {
        self.quality.as_deref()
    }

    #[must_use]
    pub fn is_mosaico_core(&self) -> bool {
        self.is_mosaico_core
    }

    /// Whether the page has been written to the store.
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    #[must_use]
    pub fn compressed_text(&self) -> &[u8] {
        &self.compressed_text
    }

    /// Page text, decompressed on first access.
    pub fn text(&self) -> Result<&PageText> {
        self.text.get_or_try_init(|| decompress_text(&self.compressed_text))
    }

    /// Wikipedia URL of the page.
    #[must_use]
    pub fn link(&self) -> String {
        format!(
            "https://{}.wikipedia.org/wiki/{}",
            self.language,
            self.title.replace(' ', "_")
        )
    }

    /// Kinds present on the page, materialized ones first.
    #[must_use]
    pub fn annotation_kinds(&self) -> Vec<AnnotationKind> {
        self.entries.iter().map(|entry| entry.kind).collect()
    }

    #[must_use]
    pub fn has_annotation(&self, kind: AnnotationKind) -> bool {
        self.position(kind).is_some()
    }

    /// Whether `kind` is stored in its own record.
    #[must_use]
    pub fn is_linked(&self, kind: AnnotationKind) -> bool {
        self.position(kind)
            .is_some_and(|index| !self.entries[index].is_materialized())
    }

    /// Whether `kind` has been prepared already.
    #[must_use]
    pub fn is_prepared(&self, kind: AnnotationKind) -> bool {
        self.position(kind)
            .is_some_and(|index| self.entries[index].is_prepared())
    }

    fn position(&self, kind: AnnotationKind) -> Option<usize> {
        self.entries.iter().position(|entry| entry.kind == kind)
    }

    fn require(&self, kind: AnnotationKind) -> Result<usize> {
        self.position(kind)
            .ok_or_else(|| MosaicoError::AnnotationNotFound {
                kind: kind.tag().to_string(),
            })
    }

    /// Attach `annotation`, inside the page record when `materialized`, in its own record
    /// otherwise. Nothing is written until the next save.
    pub fn add_annotation<A: Into<Annotation>>(
        &mut self,
        annotation: A,
        materialized: bool,
    ) -> Result<()> {
        let annotation = annotation.into();
        let kind = annotation.kind();
        if self.has_annotation(kind) {
            return Err(MosaicoError::DuplicateAnnotation {
                kind: kind.tag().to_string(),
            });
        }
        if materialized {
            let at = self
                .entries
                .iter()
                .take_while(|entry| entry.is_materialized())
                .count();
            self.entries.insert(at, AnnotationEntry::materialized(annotation));
        } else {
            let linked_id = linked_annotation_id(self.id, kind);
            self.pending_deletes.retain(|pending| *pending != linked_id);
            self.entries
                .push(AnnotationEntry::linked_new(annotation, linked_id));
        }
        tracing::debug!(
            page.id = %self.id,
            annotation.kind = %kind,
            annotation.materialized = materialized,
            "annotation added"
        );
        Ok(())
    }

    /// Remove `kind` from the page. A linked record is deleted on the next save.
    pub fn delete_annotation(&mut self, kind: AnnotationKind) -> Result<()> {
        let index = self.require(kind)?;
        let entry = self.entries.remove(index);
        if let Some(linked_id) = entry.linked_id() {
            if self.persisted && !self.pending_deletes.contains(&linked_id) {
                self.pending_deletes.push(linked_id);
            }
        }
        tracing::debug!(page.id = %self.id, annotation.kind = %kind, "annotation deleted");
        Ok(())
    }

    /// Prepared annotation of `kind`, preparing its dependencies first.
    ///
    /// A linked annotation is fetched from the store on first access only; later calls return
    /// the same prepared value.
    pub async fn get_annotation(
        &mut self,
        kind: AnnotationKind,
    ) -> Result<Arc<PreparedAnnotation>> {
        for dependency in preparation_order(kind) {
            self.prepare_entry(dependency).await?;
        }
        self.prepare_entry(kind).await
    }

    /// Lazy walk over every annotation of the page, in stored order.
    pub fn list_annotations(&mut self) -> AnnotationCursor<'_> {
        let kinds = self.annotation_kinds();
        AnnotationCursor::new(self, kinds)
    }

    async fn prepare_entry(&mut self, kind: AnnotationKind) -> Result<Arc<PreparedAnnotation>> {
        let index = self.require(kind)?;
        if let Some(prepared) = self.entries[index]
            .slot
            .as_embedded()
            .and_then(|cell| cell.prepared())
        {
            return Ok(Arc::clone(prepared));
        }
        self.resolve(index).await?;

        let mut dependencies = BTreeMap::new();
        for dependency in kind.dependencies() {
            let prepared = self.entries[self.require(*dependency)?]
                .slot
                .as_embedded()
                .and_then(|cell| cell.prepared())
                .cloned()
                .ok_or_else(|| MosaicoError::AnnotationNotFound {
                    kind: dependency.tag().to_string(),
                })?;
            dependencies.insert(*dependency, prepared);
        }

        let text = self.text()?.clone();
        let ctx = PreparationContext::with_prepared(&text, &dependencies);
        let cell = self.entries[index]
            .slot
            .as_embedded_mut()
            .ok_or_else(|| MosaicoError::invalid_encoding("linked annotation left unresolved"))?;
        cell.prepare(&ctx)
    }

    /// Follow a linked reference, replacing it with the decoded payload.
    async fn resolve(&mut self, index: usize) -> Result<()> {
        let Some(linked_id) = self.entries[index].slot.reference() else {
            return Ok(());
        };
        let kind = self.entries[index].kind;
        tracing::info!(
            page.id = %self.id,
            annotation.kind = %kind,
            annotation.id = %linked_id,
            "fetching linked annotation"
        );

        let fetch = self.store.get(ANNOTATIONS_COLLECTION, linked_id);
        let document = match self.config.fetch_timeout_ms {
            Some(timeout_ms) => tokio::time::timeout(
                std::time::Duration::from_millis(timeout_ms),
                fetch,
            )
            .await
            .map_err(|_| MosaicoError::Timeout {
                operation: "fetch linked annotation",
                timeout_ms,
            })??,
            None => fetch.await?,
        }
        .ok_or_else(|| MosaicoError::RecordNotFound {
            collection: ANNOTATIONS_COLLECTION,
            id: linked_id.to_string(),
        })?;

        let record: LinkedAnnotationRecord = serde_json::from_value(document)?;
        if record.annotation.kind() != kind {
            return Err(MosaicoError::invalid_encoding(format!(
                "linked record {linked_id} holds `{}`, page expects `{kind}`",
                record.annotation.kind()
            )));
        }
        self.entries[index].slot = Link::Embedded(AnnotationCell::new(record.annotation));
        Ok(())
    }

    /// Write a page that is not in the store yet.
    pub(crate) async fn insert(&mut self) -> Result<()> {
        self.persist(true).await
    }

    /// Undo [`WikiPage::insert`]: drop the page record and the linked records it wrote. The page
    /// is left unpersisted, ready to be inserted again.
    pub(crate) async fn withdraw(&mut self) -> Result<()> {
        self.store.delete(PAGES_COLLECTION, self.id).await?;
        for entry in &mut self.entries {
            let Some(linked_id) = entry.linked_id() else {
                continue;
            };
            if entry.slot.as_embedded().is_some() {
                self.store.delete(ANNOTATIONS_COLLECTION, linked_id).await?;
                entry.dirty = true;
            }
        }
        self.persisted = false;
        tracing::info!(page.id = %self.id, page.title = %self.title, "page insert withdrawn");
        Ok(())
    }

    /// Write back a stored page, including added and deleted annotations.
    pub async fn save(&mut self) -> Result<()> {
        if !self.persisted {
            return Err(MosaicoError::PageNotPersisted {
                document_id: self.document_id.clone(),
            });
        }
        self.persist(false).await
    }

    /// Linked records first, then the page, then deletions; a page record never points at a
    /// linked record that was not written.
    async fn persist(&mut self, insert: bool) -> Result<()> {
        for entry in self.entries.iter().filter(|entry| entry.dirty) {
            let (Some(linked_id), Some(cell)) = (entry.linked_id(), entry.slot.as_embedded())
            else {
                continue;
            };
            let Some(annotation) = cell.as_ref() else {
                continue;
            };
            let document = serde_json::to_value(LinkedRecordRef {
                id: linked_id,
                annotation,
            })?;
            self.store.upsert(ANNOTATIONS_COLLECTION, document).await?;
        }

        let document = serde_json::to_value(self.record_ref()?)?;
        if insert {
            self.store.insert(PAGES_COLLECTION, document).await?;
        } else {
            self.store.upsert(PAGES_COLLECTION, document).await?;
        }
        for entry in &mut self.entries {
            entry.dirty = false;
        }
        self.persisted = true;

        for linked_id in std::mem::take(&mut self.pending_deletes) {
            self.store.delete(ANNOTATIONS_COLLECTION, linked_id).await?;
        }
        tracing::info!(
            page.id = %self.id,
            page.title = %self.title,
            page.language = %self.language,
            page.annotations = self.entries.len(),
            "page saved"
        );
        Ok(())
    }

    fn record_ref(&self) -> Result<PageRecordRef<'_>> {
        let mut materialized_annotations = Vec::new();
        let mut linked_annotation_names = Vec::new();
        let mut linked_annotations = Vec::new();
        for entry in &self.entries {
            match entry.linked_id() {
                Some(linked_id) => {
                    linked_annotation_names.push(entry.kind.tag());
                    linked_annotations.push(linked_id);
                }
                None => {
                    let annotation = entry
                        .slot
                        .as_embedded()
                        .and_then(AnnotationCell::as_ref)
                        .ok_or_else(|| {
                            MosaicoError::invalid_encoding(format!(
                                "materialized `{}` has no payload",
                                entry.kind
                            ))
                        })?;
                    materialized_annotations.push(ContainerRef(annotation));
                }
            }
        }
        Ok(PageRecordRef {
            id: self.id,
            document_id: &self.document_id,
            wikidata_id: self.wikidata_id.as_deref(),
            title: &self.title,
            language: self.language,
            quality: self.quality.as_deref(),
            is_mosaico_core: self.is_mosaico_core,
            compressed_text: &self.compressed_text,
            materialized_annotations,
            linked_annotation_names,
            linked_annotations,
        })
    }

    /// Interlanguage link of this page, if it has a wikidata id and one was recorded.
    pub async fn interlanguage_link(&self) -> Result<Option<InterlanguageLink>> {
        match &self.wikidata_id {
            Some(wikidata_id) => InterlanguageLink::find(self.store.as_ref(), wikidata_id).await,
            None => Ok(None),
        }
    }

    /// The same article in every other language present in the store.
    pub async fn list_translations(&self) -> Result<Vec<WikiPage>> {
        let Some(link) = self.interlanguage_link().await? else {
            return Ok(Vec::new());
        };
        let mut translations = Vec::new();
        for page_link in link.page_links.iter().filter(|l| l.language != self.language) {
            translations.push(
                Self::load(Arc::clone(&self.store), self.config.clone(), page_link.page_id)
                    .await?,
            );
        }
        Ok(translations)
    }

    /// The same article in `language`.
    pub async fn change_to_translation(&self, language: Language) -> Result<WikiPage> {
        let page_id = self
            .interlanguage_link()
            .await?
            .and_then(|link| link.page_for(language))
            .ok_or_else(|| MosaicoError::TranslationNotFound {
                language: language.to_string(),
            })?;
        Self::load(Arc::clone(&self.store), self.config.clone(), page_id).await
    }
}
