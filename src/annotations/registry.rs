//! Tag → decoder table.
//!
//! Populated once by [`init_registry`] before the first page is decoded and read-only afterwards.

use std::collections::BTreeMap;

use once_cell::sync::OnceCell;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    AmrAnnotation, Annotation, AnnotationKind, CirrusAnnotation, ReAnnotation,
    SectioningAnnotation, SrlAnnotation, StanzaAnnotation, WikilinksAnnotation, WsdAnnotation,
};
use crate::error::{MosaicoError, Result};
use crate::prepare::Prepare;

static REGISTRY: OnceCell<AnnotationRegistry> = OnceCell::new();

/// A payload type that can be registered under its kind tag.
pub trait AnnotationPayload:
    Prepare + Serialize + DeserializeOwned + Into<Annotation> + Sized
{
    const KIND: AnnotationKind;
}

pub type DecodeFn = fn(Value) -> Result<Annotation>;

fn decode_payload<T: AnnotationPayload>(payload: Value) -> Result<Annotation> {
    Ok(serde_json::from_value::<T>(payload)?.into())
}

#[derive(Debug, Default)]
pub struct AnnotationRegistry {
    decoders: BTreeMap<&'static str, (AnnotationKind, DecodeFn)>,
}

impl AnnotationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in kind.
    pub fn with_builtin_kinds() -> Result<Self> {
        let mut registry = Self::new();
        registry.register::<SectioningAnnotation>()?;
        registry.register::<StanzaAnnotation>()?;
        registry.register::<WsdAnnotation>()?;
        registry.register::<SrlAnnotation>()?;
        registry.register::<ReAnnotation>()?;
        registry.register::<AmrAnnotation>()?;
        registry.register::<WikilinksAnnotation>()?;
        registry.register::<CirrusAnnotation>()?;
        Ok(registry)
    }

    pub fn register<T: AnnotationPayload>(&mut self) -> Result<()> {
        let tag = T::KIND.tag();
        if self.decoders.contains_key(tag) {
            return Err(MosaicoError::RegistryConflict { tag });
        }
        let decode: DecodeFn = decode_payload::<T>;
        self.decoders.insert(tag, (T::KIND, decode));
        Ok(())
    }

    pub fn kind(&self, tag: &str) -> Result<AnnotationKind> {
        self.decoders
            .get(tag)
            .map(|(kind, _)| *kind)
            .ok_or_else(|| MosaicoError::UnknownAnnotationTag {
                tag: tag.to_string(),
            })
    }

    pub fn decode(&self, tag: &str, payload: Value) -> Result<Annotation> {
        let (_, decode) = self
            .decoders
            .get(tag)
            .ok_or_else(|| MosaicoError::UnknownAnnotationTag {
                tag: tag.to_string(),
            })?;
        decode(payload)
    }

    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.decoders.keys().copied()
    }
}

/// Populate the process-wide registry. Later calls return the same instance.
pub fn init_registry() -> Result<&'static AnnotationRegistry> {
    let registry = REGISTRY.get_or_try_init(|| {
        let registry = AnnotationRegistry::with_builtin_kinds()?;
        tracing::debug!(registry.kinds = registry.decoders.len(), "annotation registry ready");
        Ok::<_, MosaicoError>(registry)
    })?;
    Ok(registry)
}

/// The process-wide registry, or [`MosaicoError::RegistryUninitialized`] before
/// [`init_registry`] ran.
pub fn registry() -> Result<&'static AnnotationRegistry> {
    REGISTRY.get().ok_or(MosaicoError::RegistryUninitialized)
}
