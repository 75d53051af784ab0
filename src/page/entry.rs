//! Per-kind annotation slot of a page.

use std::sync::Arc;

use crate::annotations::{
    Annotation, AnnotationKind, AnnotationRef, Link, PreparedAnnotation,
};
use crate::error::{MosaicoError, Result};
use crate::prepare::PreparationContext;
use crate::types::AnnotationId;

/// Where the payload is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Storage {
    Materialized,
    Linked(AnnotationId),
}

/// A resolved annotation: decoded until first use, prepared afterwards.
///
/// Exactly one of the two fields is set.
#[derive(Debug)]
pub(crate) struct AnnotationCell {
    decoded: Option<Annotation>,
    prepared: Option<Arc<PreparedAnnotation>>,
}

impl AnnotationCell {
    pub(crate) fn new(annotation: Annotation) -> Self {
        Self {
            decoded: Some(annotation),
            prepared: None,
        }
    }

    pub(crate) fn is_prepared(&self) -> bool {
        self.prepared.is_some()
    }

    pub(crate) fn prepared(&self) -> Option<&Arc<PreparedAnnotation>> {
        self.prepared.as_ref()
    }

    pub(crate) fn as_ref(&self) -> Option<AnnotationRef<'_>> {
        match (&self.prepared, &self.decoded) {
            (Some(prepared), _) => Some(AnnotationRef::Prepared(prepared)),
            (None, Some(decoded)) => Some(AnnotationRef::Decoded(decoded)),
            (None, None) => None,
        }
    }

    /// Prepare once; later calls hand out the same value.
    pub(crate) fn prepare(
        &mut self,
        ctx: &PreparationContext<'_>,
    ) -> Result<Arc<PreparedAnnotation>> {
        if let Some(prepared) = &self.prepared {
            return Ok(Arc::clone(prepared));
        }
        let annotation = self
            .decoded
            .take()
            .ok_or_else(|| MosaicoError::invalid_encoding("annotation slot is empty"))?;
        let kind = annotation.kind();
        match annotation.try_prepare(ctx) {
            Ok(prepared) => {
                tracing::debug!(annotation.kind = %kind, "annotation prepared");
                let prepared = Arc::new(prepared);
                self.prepared = Some(Arc::clone(&prepared));
                Ok(prepared)
            }
            Err(failure) => {
                self.decoded = Some(failure.annotation);
                Err(failure.error)
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct AnnotationEntry {
    pub(crate) kind: AnnotationKind,
    pub(crate) storage: Storage,
    pub(crate) slot: Link<AnnotationCell>,
    /// Linked payload not yet written to its own record.
    pub(crate) dirty: bool,
}

impl AnnotationEntry {
    pub(crate) fn materialized(annotation: Annotation) -> Self {
        Self {
            kind: annotation.kind(),
            storage: Storage::Materialized,
            slot: Link::Embedded(AnnotationCell::new(annotation)),
            dirty: false,
        }
    }

    pub(crate) fn linked_new(annotation: Annotation, id: AnnotationId) -> Self {
        Self {
            kind: annotation.kind(),
            storage: Storage::Linked(id),
            slot: Link::Embedded(AnnotationCell::new(annotation)),
            dirty: true,
        }
    }

    pub(crate) fn linked_reference(kind: AnnotationKind, id: AnnotationId) -> Self {
        Self {
            kind,
            storage: Storage::Linked(id),
            slot: Link::Reference(id),
            dirty: false,
        }
    }

    pub(crate) fn is_materialized(&self) -> bool {
        self.storage == Storage::Materialized
    }

    pub(crate) fn linked_id(&self) -> Option<AnnotationId> {
        match self.storage {
            Storage::Linked(id) => Some(id),
            Storage::Materialized => None,
        }
    }

    pub(crate) fn is_prepared(&self) -> bool {
        self.slot
            .as_embedded()
            .is_some_and(AnnotationCell::is_prepared)
    }
}
