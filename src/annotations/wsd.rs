//! Word sense disambiguation: sense labels over token spans, grouped by sentence.

use serde::{Deserialize, Serialize};

use super::{Annotation, AnnotationKind, AnnotationPayload};
use crate::error::Result;
use crate::prepare::{Prepare, PreparationContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsdSpan {
    /// Half-open token range inside the sentence.
    pub token_span: (usize, usize),
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsdAnnotation {
    /// One list per sentence of the stanza document.
    pub document_spans: Vec<Vec<WsdSpan>>,
}

impl WsdAnnotation {
    #[must_use]
    pub fn sentence_spans(&self, sentence_idx: usize) -> &[WsdSpan] {
        self.document_spans
            .get(sentence_idx)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every span with the index of its sentence.
    pub fn spans(&self) -> impl Iterator<Item = (usize, &WsdSpan)> {
        self.document_spans
            .iter()
            .enumerate()
            .flat_map(|(sentence_idx, spans)| spans.iter().map(move |span| (sentence_idx, span)))
    }
}

impl Prepare for WsdAnnotation {
    type Derived = ();

    fn prepare(&self, _ctx: &PreparationContext<'_>) -> Result<()> {
        Ok(())
    }
}

impl AnnotationPayload for WsdAnnotation {
    const KIND: AnnotationKind = AnnotationKind::Wsd;
}

impl From<WsdAnnotation> for Annotation {
    fn from(annotation: WsdAnnotation) -> Self {
        Self::Wsd(annotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spans_are_indexed_by_sentence() {
        let annotation: WsdAnnotation = serde_json::from_str(
            r#"{"document_spans": [
                [{"token_span": [2, 3], "label": "president%1:18:04::"}],
                [],
                [{"token_span": [0, 1], "label": "be%2:42:03::"}, {"token_span": [1, 3], "label": "white_house%1:14:00::"}]
            ]}"#,
        )
        .expect("decode");
        assert_eq!(annotation.sentence_spans(2).len(), 2);
        assert!(annotation.sentence_spans(1).is_empty());
        assert!(annotation.sentence_spans(9).is_empty());
        let sentences: Vec<usize> = annotation.spans().map(|(idx, _)| idx).collect();
        assert_eq!(sentences, vec![0, 2, 2]);
    }
}
