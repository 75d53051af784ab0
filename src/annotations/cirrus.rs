//! Raw CirrusSearch metadata of the source article, kept verbatim.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Annotation, AnnotationKind, AnnotationPayload};
use crate::error::Result;
use crate::prepare::{Prepare, PreparationContext};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CirrusAnnotation {
    pub data: Map<String, Value>,
}

impl CirrusAnnotation {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}

impl Prepare for CirrusAnnotation {
    type Derived = ();

    fn prepare(&self, _ctx: &PreparationContext<'_>) -> Result<()> {
        Ok(())
    }
}

impl AnnotationPayload for CirrusAnnotation {
    const KIND: AnnotationKind = AnnotationKind::Cirrus;
}

impl From<CirrusAnnotation> for Annotation {
    fn from(annotation: CirrusAnnotation) -> Self {
        Self::Cirrus(annotation)
    }
}
