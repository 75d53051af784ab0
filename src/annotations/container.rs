//! Storage wrappers pairing a payload with its kind tag.
//!
//! Embedded annotations live in the page record as `{name, annotation}` pairs. Linked annotations
//! are stand-alone records with the same pair plus an `_id`, referenced from the page.

use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::registry::registry;
use super::{Annotation, AnnotationKind, PreparedAnnotation};
use crate::types::AnnotationId;

/// Either the value itself or the identity of the record holding it.
#[derive(Debug, Clone, PartialEq)]
pub enum Link<T> {
    Embedded(T),
    Reference(AnnotationId),
}

impl<T> Link<T> {
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }

    #[must_use]
    pub fn reference(&self) -> Option<AnnotationId> {
        match self {
            Self::Reference(id) => Some(*id),
            Self::Embedded(_) => None,
        }
    }

    #[must_use]
    pub fn as_embedded(&self) -> Option<&T> {
        match self {
            Self::Embedded(value) => Some(value),
            Self::Reference(_) => None,
        }
    }

    pub fn as_embedded_mut(&mut self) -> Option<&mut T> {
        match self {
            Self::Embedded(value) => Some(value),
            Self::Reference(_) => None,
        }
    }
}

/// Borrowed payload, decoded or prepared, ready to be written.
#[derive(Debug, Clone, Copy)]
pub enum AnnotationRef<'a> {
    Decoded(&'a Annotation),
    Prepared(&'a PreparedAnnotation),
}

impl AnnotationRef<'_> {
    #[must_use]
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Self::Decoded(annotation) => annotation.kind(),
            Self::Prepared(annotation) => annotation.kind(),
        }
    }
}

impl Serialize for AnnotationRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Decoded(annotation) => annotation.serialize(serializer),
            Self::Prepared(annotation) => annotation.serialize(serializer),
        }
    }
}

/// Embedded annotation as found in a page record.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationContainer {
    pub annotation: Annotation,
}

impl AnnotationContainer {
    #[must_use]
    pub fn new(annotation: Annotation) -> Self {
        Self { annotation }
    }

    #[must_use]
    pub fn name(&self) -> AnnotationKind {
        self.annotation.kind()
    }
}

#[derive(Deserialize)]
struct RawContainer {
    name: String,
    annotation: Value,
}

#[derive(Deserialize)]
struct RawLinkedRecord {
    #[serde(rename = "_id")]
    id: AnnotationId,
    name: String,
    annotation: Value,
}

fn decode_with_registry<E: serde::de::Error>(
    name: &str,
    annotation: Value,
) -> Result<Annotation, E> {
    let registry = registry().map_err(E::custom)?;
    registry.decode(name, annotation).map_err(E::custom)
}

/// Serialized `{name, annotation}` pair for any payload reference.
pub(crate) fn serialize_pair<S: Serializer>(
    serializer: S,
    id: Option<AnnotationId>,
    annotation: AnnotationRef<'_>,
) -> Result<S::Ok, S::Error> {
    let fields = if id.is_some() { 3 } else { 2 };
    let mut state = serializer.serialize_struct("AnnotationContainer", fields)?;
    if let Some(id) = id {
        state.serialize_field("_id", &id)?;
    }
    state.serialize_field("name", annotation.kind().tag())?;
    state.serialize_field("annotation", &annotation)?;
    state.end()
}

impl Serialize for AnnotationContainer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_pair(serializer, None, AnnotationRef::Decoded(&self.annotation))
    }
}

impl<'de> Deserialize<'de> for AnnotationContainer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawContainer::deserialize(deserializer)?;
        let annotation = decode_with_registry::<D::Error>(&raw.name, raw.annotation)?;
        Ok(Self { annotation })
    }
}

/// Borrowed `{name, annotation}` pair, written into page records without cloning the payload.
pub(crate) struct ContainerRef<'a>(pub AnnotationRef<'a>);

impl Serialize for ContainerRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_pair(serializer, None, self.0)
    }
}

/// Linked annotation record, stored in its own collection.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkedAnnotationRecord {
    pub id: AnnotationId,
    pub annotation: Annotation,
}

impl Serialize for LinkedAnnotationRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_pair(
            serializer,
            Some(self.id),
            AnnotationRef::Decoded(&self.annotation),
        )
    }
}

impl<'de> Deserialize<'de> for LinkedAnnotationRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawLinkedRecord::deserialize(deserializer)?;
        let annotation = decode_with_registry::<D::Error>(&raw.name, raw.annotation)?;
        Ok(Self {
            id: raw.id,
            annotation,
        })
    }
}

/// Borrowed linked record for writes.
pub(crate) struct LinkedRecordRef<'a> {
    pub id: AnnotationId,
    pub annotation: AnnotationRef<'a>,
}

impl Serialize for LinkedRecordRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_pair(serializer, Some(self.id), self.annotation)
    }
}

impl From<Annotation> for AnnotationContainer {
    fn from(annotation: Annotation) -> Self {
        Self::new(annotation)
    }
}
