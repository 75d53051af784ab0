//! Relation extraction triples. Argument mentions are not stored; they are resolved against the
//! stanza annotation of the same page, which is therefore prepared first.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::{Annotation, AnnotationKind, AnnotationPayload};
use crate::codec::PageText;
use crate::error::{MosaicoError, Result};
use crate::prepare::{Prepare, PreparationContext, Prepared};
use crate::types::CharSpan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_idx: Option<usize>,
    pub sentence_span: (usize, usize),
}

/// System that produced a triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Annotator {
    Wsd,
    Crocodile,
    Relik,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikidata_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub sentence_idx: usize,
    /// Half-open token range inside the sentence.
    pub token_span: (usize, usize),
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikidata_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReTriple {
    pub origin: Origin,
    pub annotator: Annotator,
    pub relation: Relation,
    pub head: Argument,
    pub tail: Argument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReAnnotation {
    pub triples: Vec<ReTriple>,
}

impl AnnotationPayload for ReAnnotation {
    const KIND: AnnotationKind = AnnotationKind::Re;
}

impl From<ReAnnotation> for Annotation {
    fn from(annotation: ReAnnotation) -> Self {
        Self::Re(annotation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionFields {
    span: CharSpan,
    bytes: Range<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripleFields {
    head: MentionFields,
    tail: MentionFields,
}

impl Prepare for Argument {
    type Derived = MentionFields;

    fn prepare(&self, ctx: &PreparationContext<'_>) -> Result<MentionFields> {
        let stanza = ctx.stanza()?;
        let sentence = stanza
            .document()
            .sentence(self.sentence_idx)
            .ok_or_else(|| MosaicoError::InvalidReference {
                kind: "re",
                reason: format!("sentence {} is not in the stanza document", self.sentence_idx),
            })?;
        let span = sentence
            .token_span_chars(self.token_span)
            .map_err(|err| MosaicoError::InvalidReference {
                kind: "re",
                reason: err.to_string(),
            })?;
        Ok(MentionFields {
            span,
            bytes: ctx.text().byte_range(span)?,
        })
    }
}

impl Prepare for ReTriple {
    type Derived = TripleFields;

    fn prepare(&self, ctx: &PreparationContext<'_>) -> Result<TripleFields> {
        Ok(TripleFields {
            head: self.head.prepare(ctx)?,
            tail: self.tail.prepare(ctx)?,
        })
    }
}

impl Prepare for ReAnnotation {
    type Derived = Vec<TripleFields>;

    fn prepare(&self, ctx: &PreparationContext<'_>) -> Result<Vec<TripleFields>> {
        self.triples.iter().map(|triple| triple.prepare(ctx)).collect()
    }
}

impl Prepared<ReAnnotation> {
    #[must_use]
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    #[must_use]
    pub fn triple(&self, idx: usize) -> Option<TripleView<'_>> {
        Some(TripleView {
            text: self.page_text(),
            raw: self.triples.get(idx)?,
            fields: self.derived().get(idx)?,
        })
    }

    pub fn triples(&self) -> impl Iterator<Item = TripleView<'_>> {
        let text = self.page_text();
        self.raw()
            .triples
            .iter()
            .zip(self.derived())
            .map(move |(raw, fields)| TripleView { text, raw, fields })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TripleView<'a> {
    text: &'a PageText,
    raw: &'a ReTriple,
    fields: &'a TripleFields,
}

impl<'a> TripleView<'a> {
    #[must_use]
    pub fn origin(&self) -> &'a Origin {
        &self.raw.origin
    }

    #[must_use]
    pub fn annotator(&self) -> Annotator {
        self.raw.annotator
    }

    #[must_use]
    pub fn relation(&self) -> &'a Relation {
        &self.raw.relation
    }

    #[must_use]
    pub fn head(&self) -> ArgumentView<'a> {
        ArgumentView {
            text: self.text,
            raw: &self.raw.head,
            fields: &self.fields.head,
        }
    }

    #[must_use]
    pub fn tail(&self) -> ArgumentView<'a> {
        ArgumentView {
            text: self.text,
            raw: &self.raw.tail,
            fields: &self.fields.tail,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ArgumentView<'a> {
    text: &'a PageText,
    raw: &'a Argument,
    fields: &'a MentionFields,
}

impl<'a> ArgumentView<'a> {
    #[must_use]
    pub fn sentence_idx(&self) -> usize {
        self.raw.sentence_idx
    }

    #[must_use]
    pub fn token_span(&self) -> (usize, usize) {
        self.raw.token_span
    }

    #[must_use]
    pub fn wikidata_id(&self) -> Option<&'a str> {
        self.raw.wikidata_id.as_deref()
    }

    /// Page text from the first to the last token of the argument.
    #[must_use]
    pub fn mention(&self) -> &'a str {
        self.text.bytes(&self.fields.bytes)
    }

    #[must_use]
    pub fn char_span(&self) -> CharSpan {
        self.fields.span
    }
}
