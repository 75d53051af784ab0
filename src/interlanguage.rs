//! Cross-language index: one record per wikidata id, listing the page of each language.

use serde::{Deserialize, Serialize};

use crate::constants::INTERLANGUAGE_LINKS_COLLECTION;
use crate::error::{MosaicoError, Result};
use crate::page::WikiPage;
use crate::store::DocumentStore;
use crate::types::{Filter, Language, LinkId, PageId, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageLink {
    pub language: Language,
    pub page_id: PageId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterlanguageLink {
    #[serde(rename = "_id")]
    pub id: LinkId,
    pub wikidata_id: String,
    /// At most one entry per language.
    #[serde(default)]
    pub page_links: Vec<PageLink>,
    /// Bumped on every write; guards concurrent updates.
    #[serde(default)]
    pub revision: u64,
}

impl InterlanguageLink {
    fn new(wikidata_id: &str) -> Self {
        Self {
            id: RecordId::derive(&[
                INTERLANGUAGE_LINKS_COLLECTION.as_bytes(),
                wikidata_id.as_bytes(),
            ]),
            wikidata_id: wikidata_id.to_string(),
            page_links: Vec::new(),
            revision: 0,
        }
    }

    pub async fn find(store: &dyn DocumentStore, wikidata_id: &str) -> Result<Option<Self>> {
        let filter = Filter::new().eq("wikidata_id", wikidata_id);
        store
            .find_one(INTERLANGUAGE_LINKS_COLLECTION, &filter)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    /// Link for `wikidata_id`, created empty when missing.
    ///
    /// Safe under concurrent callers: a writer that loses the insert race reads back the winner's
    /// record.
    pub async fn get_or_insert(store: &dyn DocumentStore, wikidata_id: &str) -> Result<Self> {
        if let Some(link) = Self::find(store, wikidata_id).await? {
            return Ok(link);
        }
        let link = Self::new(wikidata_id);
        match store
            .insert(INTERLANGUAGE_LINKS_COLLECTION, serde_json::to_value(&link)?)
            .await
        {
            Ok(()) => {
                tracing::debug!(link.wikidata_id = wikidata_id, "interlanguage link created");
                Ok(link)
            }
            Err(MosaicoError::UniqueViolation { .. }) => Self::find(store, wikidata_id)
                .await?
                .ok_or_else(|| MosaicoError::RecordNotFound {
                    collection: INTERLANGUAGE_LINKS_COLLECTION,
                    id: wikidata_id.to_string(),
                }),
            Err(err) => Err(err),
        }
    }

    #[must_use]
    pub fn page_for(&self, language: Language) -> Option<PageId> {
        self.page_links
            .iter()
            .find(|link| link.language == language)
            .map(|link| link.page_id)
    }

    #[must_use]
    pub fn languages(&self) -> Vec<Language> {
        self.page_links.iter().map(|link| link.language).collect()
    }

    /// Record `page` under its language and write the link back.
    ///
    /// Re-adding the same page is a no-op; a different page for a language already present is
    /// rejected.
    pub async fn add_page(&mut self, store: &dyn DocumentStore, page: &WikiPage) -> Result<()> {
        if !page.is_persisted() {
            return Err(MosaicoError::PageNotPersisted {
                document_id: page.document_id().to_string(),
            });
        }
        if page.wikidata_id().is_none() {
            return Err(MosaicoError::MissingWikidataId {
                document_id: page.document_id().to_string(),
            });
        }
        self.add_page_id(store, page.language(), page.id()).await
    }

    /// Whether `page_id` is already the page of `language`; a different page there is refused.
    pub(crate) fn claim(&self, language: Language, page_id: PageId) -> Result<bool> {
        match self.page_for(language) {
            Some(existing) if existing == page_id => Ok(true),
            Some(existing) => {
                tracing::warn!(
                    link.wikidata_id = %self.wikidata_id,
                    link.language = %language,
                    link.existing = %existing,
                    link.rejected = %page_id,
                    "language already linked to another page"
                );
                Err(MosaicoError::DuplicateLanguage {
                    wikidata_id: self.wikidata_id.clone(),
                    language: language.to_string(),
                })
            }
            None => Ok(false),
        }
    }

    /// Adds the link with a compare-and-set on `revision`, reloading and retrying when another
    /// writer got there first. `self` only changes once the store accepted the write.
    pub(crate) async fn add_page_id(
        &mut self,
        store: &dyn DocumentStore,
        language: Language,
        page_id: PageId,
    ) -> Result<()> {
        loop {
            if self.claim(language, page_id)? {
                return Ok(());
            }
            let mut next = self.clone();
            next.page_links.push(PageLink { language, page_id });
            next.revision += 1;
            let replaced = store
                .replace_if_revision(
                    INTERLANGUAGE_LINKS_COLLECTION,
                    serde_json::to_value(&next)?,
                    self.revision,
                )
                .await?;
            if replaced {
                *self = next;
                return Ok(());
            }
            tracing::debug!(
                link.wikidata_id = %self.wikidata_id,
                link.revision = self.revision,
                "interlanguage link changed underneath, reloading"
            );
            *self = Self::find(store, &self.wikidata_id).await?.ok_or_else(|| {
                MosaicoError::RecordNotFound {
                    collection: INTERLANGUAGE_LINKS_COLLECTION,
                    id: self.wikidata_id.clone(),
                }
            })?;
        }
    }
}
