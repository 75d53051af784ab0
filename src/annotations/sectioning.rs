//! Page sectioning: named sections over sentence ranges.

use serde::{Deserialize, Serialize};

use super::{Annotation, AnnotationKind, AnnotationPayload};
use crate::error::Result;
use crate::prepare::{Prepare, PreparationContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    /// Half-open sentence range `[start, end)`.
    pub sentences_span: (usize, usize),
}

impl Section {
    #[must_use]
    pub fn contains(&self, sentence_idx: usize) -> bool {
        (self.sentences_span.0..self.sentences_span.1).contains(&sentence_idx)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectioningAnnotation {
    pub sections: Vec<Section>,
}

impl SectioningAnnotation {
    /// Section holding `sentence_idx`, if any.
    #[must_use]
    pub fn section_of(&self, sentence_idx: usize) -> Option<&Section> {
        self.sections
            .iter()
            .find(|section| section.contains(sentence_idx))
    }
}

impl Prepare for SectioningAnnotation {
    type Derived = ();

    fn prepare(&self, _ctx: &PreparationContext<'_>) -> Result<()> {
        Ok(())
    }
}

impl AnnotationPayload for SectioningAnnotation {
    const KIND: AnnotationKind = AnnotationKind::Sectioning;
}

impl From<SectioningAnnotation> for Annotation {
    fn from(annotation: SectioningAnnotation) -> Self {
        Self::Sectioning(annotation)
    }
}
