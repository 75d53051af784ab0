//! Abstract meaning representation graphs, one optional graph per sentence.

use serde::{Deserialize, Serialize};

use super::{Annotation, AnnotationKind, AnnotationPayload};
use crate::error::Result;
use crate::prepare::{Prepare, PreparationContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmrGraph {
    /// Graph in PENMAN notation.
    pub penman: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmrAnnotation {
    /// `None` where the parser produced no graph for the sentence.
    pub sentence_graphs: Vec<Option<AmrGraph>>,
}

impl AmrAnnotation {
    #[must_use]
    pub fn graph(&self, sentence_idx: usize) -> Option<&AmrGraph> {
        self.sentence_graphs.get(sentence_idx)?.as_ref()
    }

    pub fn graphs(&self) -> impl Iterator<Item = (usize, &AmrGraph)> {
        self.sentence_graphs
            .iter()
            .enumerate()
            .filter_map(|(idx, graph)| graph.as_ref().map(|graph| (idx, graph)))
    }
}

impl Prepare for AmrAnnotation {
    type Derived = ();

    fn prepare(&self, _ctx: &PreparationContext<'_>) -> Result<()> {
        Ok(())
    }
}

impl AnnotationPayload for AmrAnnotation {
    const KIND: AnnotationKind = AnnotationKind::Amr;
}

impl From<AmrAnnotation> for Annotation {
    fn from(annotation: AmrAnnotation) -> Self {
        Self::Amr(annotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_graphs_are_skipped() {
        let annotation: AmrAnnotation = serde_json::from_str(
            r#"{"sentence_graphs": [{"penman": "(p / person :name (n / name :op1 \"Obama\"))"}, null]}"#,
        )
        .expect("decode");
        assert!(annotation.graph(0).is_some());
        assert!(annotation.graph(1).is_none());
        assert!(annotation.graph(2).is_none());
        assert_eq!(annotation.graphs().count(), 1);
        let json = serde_json::to_value(&annotation).expect("json");
        assert!(json["sentence_graphs"][1].is_null());
    }
}
