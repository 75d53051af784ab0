use std::sync::Arc;

use super::WikiPage;
use crate::annotations::{AnnotationKind, PreparedAnnotation};
use crate::error::Result;

/// Lazy walk over the annotations of a page.
///
/// Each step prepares one annotation (fetching it first when linked). The kinds are fixed when
/// the cursor is created; ask the page for a new cursor to start over.
#[derive(Debug)]
pub struct AnnotationCursor<'p> {
    page: &'p mut WikiPage,
    kinds: std::vec::IntoIter<AnnotationKind>,
}

impl<'p> AnnotationCursor<'p> {
    pub(super) fn new(page: &'p mut WikiPage, kinds: Vec<AnnotationKind>) -> Self {
        Self {
            page,
            kinds: kinds.into_iter(),
        }
    }

    /// Kinds not yet visited.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.kinds.len()
    }

    /// Next prepared annotation, `None` once every kind has been visited.
    pub async fn next(&mut self) -> Option<Result<Arc<PreparedAnnotation>>> {
        let kind = self.kinds.next()?;
        Some(self.page.get_annotation(kind).await)
    }

    /// Drain the cursor, stopping at the first failure.
    pub async fn try_collect(mut self) -> Result<Vec<Arc<PreparedAnnotation>>> {
        let mut annotations = Vec::with_capacity(self.remaining());
        while let Some(annotation) = self.next().await {
            annotations.push(annotation?);
        }
        Ok(annotations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotations::{CirrusAnnotation, WsdAnnotation, init_registry};
    use crate::page::PageDraft;
    use crate::store::InMemoryStore;
    use crate::types::{Language, MosaicoConfig};

    #[tokio::test]
    async fn visits_every_kind_once() {
        init_registry().expect("registry");
        let draft = PageDraft::new("1", "Roma", Language::It, "Roma è la capitale.")
            .annotation(CirrusAnnotation::default())
            .linked_annotation(WsdAnnotation::default());
        let store = Arc::new(InMemoryStore::new());
        let mut page = WikiPage::create(draft, store, MosaicoConfig::default()).expect("page");

        let mut cursor = page.list_annotations();
        assert_eq!(cursor.remaining(), 2);
        let first = cursor.next().await.expect("first").expect("prepared");
        assert_eq!(first.kind(), AnnotationKind::Cirrus);
        assert_eq!(cursor.remaining(), 1);
        let rest = cursor.try_collect().await.expect("rest");
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].kind(), AnnotationKind::Wsd);

        assert!(page.is_prepared(AnnotationKind::Cirrus));
        assert_eq!(page.list_annotations().try_collect().await.expect("again").len(), 2);
    }
}
