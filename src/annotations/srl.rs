//! Semantic role labeling, one predicate-argument inventory per labeling scheme.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Annotation, AnnotationKind, AnnotationPayload};
use crate::error::Result;
use crate::prepare::{Prepare, PreparationContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub token_idx: usize,
    pub label: String,
}

/// A role filler over the token range `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticArgument {
    pub start: usize,
    pub end: usize,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredArgStructure {
    pub predicate: Predicate,
    pub arguments: Vec<SemanticArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SrlAnnotation {
    /// Inventory name (e.g. `propbank`, `verbatlas`) to per-sentence structures.
    pub inventory2document_spans: BTreeMap<String, Vec<Vec<PredArgStructure>>>,
}

impl SrlAnnotation {
    pub fn inventories(&self) -> impl Iterator<Item = &str> {
        self.inventory2document_spans.keys().map(String::as_str)
    }

    /// Structures of one sentence under `inventory`; `None` if the inventory is absent.
    #[must_use]
    pub fn sentence_structures(
        &self,
        inventory: &str,
        sentence_idx: usize,
    ) -> Option<&[PredArgStructure]> {
        let sentences = self.inventory2document_spans.get(inventory)?;
        Some(
            sentences
                .get(sentence_idx)
                .map(Vec::as_slice)
                .unwrap_or_default(),
        )
    }
}

impl Prepare for SrlAnnotation {
    type Derived = ();

    fn prepare(&self, _ctx: &PreparationContext<'_>) -> Result<()> {
        Ok(())
    }
}

impl AnnotationPayload for SrlAnnotation {
    const KIND: AnnotationKind = AnnotationKind::Srl;
}

impl From<SrlAnnotation> for Annotation {
    fn from(annotation: SrlAnnotation) -> Self {
        Self::Srl(annotation)
    }
}
