//! Entry point tying a store, the annotation registry and the configuration together.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::annotations::init_registry;
use crate::constants::PAGES_COLLECTION;
use crate::error::Result;
use crate::interlanguage::InterlanguageLink;
use crate::page::{PageDraft, WikiPage};
use crate::store::{DocumentStore, FileStore, InMemoryStore};
use crate::types::{FileStoreOptions, MosaicoConfig, PageId, PageQuery};

/// Handle on a page corpus. Cheap to clone.
#[derive(Clone)]
pub struct Mosaico {
    store: Arc<dyn DocumentStore>,
    config: MosaicoConfig,
}

impl fmt::Debug for Mosaico {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mosaico")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Mosaico {
    /// Wrap an existing store. Initializes the annotation registry on first use.
    pub fn new(store: Arc<dyn DocumentStore>, config: MosaicoConfig) -> Result<Self> {
        init_registry()?;
        Ok(Self { store, config })
    }

    /// Corpus held in memory, lost on drop.
    pub fn in_memory(config: MosaicoConfig) -> Result<Self> {
        let store = Arc::new(InMemoryStore::with_max_record_bytes(config.max_record_bytes));
        Self::new(store, config)
    }

    /// Corpus persisted in the journal file at `path`.
    pub fn open<P: AsRef<Path>>(path: P, config: MosaicoConfig) -> Result<Self> {
        let options = FileStoreOptions {
            max_record_bytes: config.max_record_bytes,
            ..FileStoreOptions::default()
        };
        let store = Arc::new(FileStore::open(path, options)?);
        Self::new(store, config)
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    #[must_use]
    pub fn config(&self) -> &MosaicoConfig {
        &self.config
    }

    /// Build a page in memory; nothing is written until [`Mosaico::insert_page`].
    pub fn create_page(&self, draft: PageDraft) -> Result<WikiPage> {
        WikiPage::create(draft, Arc::clone(&self.store), self.config.clone())
    }

    /// Write a new page and, when it carries a wikidata id, record it in the interlanguage index.
    ///
    /// A page whose language is already taken for its wikidata id is refused before anything is
    /// written. Should another writer claim the language in between, the page is removed again
    /// and the [`MosaicoError::DuplicateLanguage`](crate::MosaicoError) is returned.
    pub async fn insert_page(&self, page: &mut WikiPage) -> Result<()> {
        let Some(wikidata_id) = page.wikidata_id().map(str::to_owned) else {
            return page.insert().await;
        };
        let store = self.store.as_ref();
        let mut link = InterlanguageLink::get_or_insert(store, &wikidata_id).await?;
        link.claim(page.language(), page.id())?;
        page.insert().await?;
        if let Err(err) = link.add_page(store, page).await {
            if let Err(cleanup) = page.withdraw().await {
                tracing::error!(
                    page.id = %page.id(),
                    error = %cleanup,
                    "failed to withdraw page after interlanguage link error"
                );
            }
            return Err(err);
        }
        Ok(())
    }

    pub async fn get_page(&self, id: PageId) -> Result<WikiPage> {
        WikiPage::load(Arc::clone(&self.store), self.config.clone(), id).await
    }

    /// First page matching `query`.
    pub async fn find_page(&self, query: &PageQuery) -> Result<Option<WikiPage>> {
        self.store
            .find_one(PAGES_COLLECTION, &query.to_filter())
            .await?
            .map(|document| {
                WikiPage::from_value(document, Arc::clone(&self.store), self.config.clone())
            })
            .transpose()
    }

    /// Every page matching `query`, in insertion order, up to its limit.
    pub async fn find_pages(&self, query: &PageQuery) -> Result<Vec<WikiPage>> {
        self.store
            .find(PAGES_COLLECTION, &query.to_filter(), query.limit)
            .await?
            .into_iter()
            .map(|document| {
                WikiPage::from_value(document, Arc::clone(&self.store), self.config.clone())
            })
            .collect()
    }

    /// Matching page records decoded into `P`, for callers that need a few fields only
    /// (see [`crate::types::PageSummary`]).
    pub async fn find_projected<P: DeserializeOwned>(&self, query: &PageQuery) -> Result<Vec<P>> {
        self.store
            .find(PAGES_COLLECTION, &query.to_filter(), query.limit)
            .await?
            .into_iter()
            .map(|document| serde_json::from_value(document).map_err(Into::into))
            .collect()
    }

    pub async fn interlanguage_link(&self, wikidata_id: &str) -> Result<Option<InterlanguageLink>> {
        InterlanguageLink::find(self.store.as_ref(), wikidata_id).await
    }
}
