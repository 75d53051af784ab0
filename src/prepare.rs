//! Lazy preparation protocol.
//!
//! Decoding yields raw storage structures; preparation derives the human-readable fields from
//! them, the page text and already-prepared annotations of the same page. A [`Prepared<T>`]
//! keeps the raw value (so it can be written back unchanged) next to its derived fields, and is
//! the only way to reach those fields.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use crate::annotations::stanza::StanzaAnnotation;
use crate::annotations::{AnnotationKind, PreparedAnnotation};
use crate::codec::PageText;
use crate::error::{MosaicoError, Result};

/// Second phase of the decode/prepare contract, implemented by every annotation and by every
/// structure nested inside one.
pub trait Prepare {
    type Derived;

    /// Compute the derived fields. Must be deterministic for a given context.
    fn prepare(&self, ctx: &PreparationContext<'_>) -> Result<Self::Derived>;
}

/// Everything preparation may read: the page text and the annotations prepared before this one.
#[derive(Clone, Copy)]
pub struct PreparationContext<'a> {
    text: &'a PageText,
    prepared: Option<&'a BTreeMap<AnnotationKind, Arc<PreparedAnnotation>>>,
}

impl<'a> PreparationContext<'a> {
    #[must_use]
    pub fn new(text: &'a PageText) -> Self {
        Self {
            text,
            prepared: None,
        }
    }

    #[must_use]
    pub fn with_prepared(
        text: &'a PageText,
        prepared: &'a BTreeMap<AnnotationKind, Arc<PreparedAnnotation>>,
    ) -> Self {
        Self {
            text,
            prepared: Some(prepared),
        }
    }

    #[must_use]
    pub fn text(&self) -> &'a PageText {
        self.text
    }

    /// A prepared annotation this one depends on.
    pub fn prepared(&self, kind: AnnotationKind) -> Result<&'a PreparedAnnotation> {
        self.prepared
            .and_then(|prepared| prepared.get(&kind))
            .map(AsRef::as_ref)
            .ok_or_else(|| MosaicoError::AnnotationNotFound {
                kind: kind.tag().to_string(),
            })
    }

    pub fn stanza(&self) -> Result<&'a Prepared<StanzaAnnotation>> {
        match self.prepared(AnnotationKind::Stanza)? {
            PreparedAnnotation::Stanza(stanza) => Ok(stanza),
            other => Err(MosaicoError::InvalidReference {
                kind: "stanza",
                reason: format!("found `{}` under the stanza key", other.kind()),
            }),
        }
    }
}

/// Raw value plus the fields derived from it.
pub struct Prepared<T: Prepare> {
    raw: T,
    derived: T::Derived,
    text: PageText,
}

/// A failed preparation hands the raw value back so the caller keeps it.
pub struct PrepareFailure<T> {
    pub raw: T,
    pub error: MosaicoError,
}

impl<T: Prepare> Prepared<T> {
    pub fn new(raw: T, ctx: &PreparationContext<'_>) -> Result<Self> {
        Self::try_new(raw, ctx).map_err(|failure| failure.error)
    }

    pub fn try_new(
        raw: T,
        ctx: &PreparationContext<'_>,
    ) -> std::result::Result<Self, PrepareFailure<T>> {
        match raw.prepare(ctx) {
            Ok(derived) => Ok(Self {
                raw,
                derived,
                text: ctx.text().clone(),
            }),
            Err(error) => Err(PrepareFailure { raw, error }),
        }
    }

    #[must_use]
    pub fn raw(&self) -> &T {
        &self.raw
    }

    #[must_use]
    pub fn derived(&self) -> &T::Derived {
        &self.derived
    }

    /// Text of the page this value was prepared against.
    #[must_use]
    pub fn page_text(&self) -> &PageText {
        &self.text
    }

    #[must_use]
    pub fn into_raw(self) -> T {
        self.raw
    }
}

impl<T: Prepare> Deref for Prepared<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.raw
    }
}

impl<T> fmt::Debug for Prepared<T>
where
    T: Prepare + fmt::Debug,
    T::Derived: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prepared")
            .field("raw", &self.raw)
            .field("derived", &self.derived)
            .finish_non_exhaustive()
    }
}

impl<T> fmt::Debug for PrepareFailure<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrepareFailure")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
