//! Hyperlinks of the article: original ones, ones projected onto further mentions, and ones the
//! aligner could not place.

use serde::{Deserialize, Serialize};

use super::{Annotation, AnnotationKind, AnnotationPayload};
use crate::error::Result;
use crate::prepare::{Prepare, PreparationContext};

/// `(sentence_idx, token_span, mention)` of a further occurrence the link was propagated to.
pub type PropagatedSpan = (usize, (usize, usize), String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wikilink {
    pub sentence_idx: usize,
    pub token_span: (usize, usize),
    pub mention: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikidata_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bn_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wn_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wn_sense: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub propagated_spans: Option<Vec<PropagatedSpan>>,
}

/// Same shape as [`Wikilink`], produced by projection rather than by an editor.
pub type ProjectedWikilink = Wikilink;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissedWikilink {
    pub mention: String,
    pub title: String,
    /// Character span in the source markup.
    pub source_text_span: (usize, usize),
    /// Last `(sentence_idx, token_span)` the aligner matched before giving up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_match: Option<(usize, (usize, usize))>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikilinksAnnotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikilinks: Option<Vec<Wikilink>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projected_wikilinks: Option<Vec<ProjectedWikilink>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missed_wikilinks: Option<Vec<MissedWikilink>>,
}

impl WikilinksAnnotation {
    #[must_use]
    pub fn wikilinks(&self) -> &[Wikilink] {
        self.wikilinks.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn projected_wikilinks(&self) -> &[ProjectedWikilink] {
        self.projected_wikilinks.as_deref().unwrap_or_default()
    }

    #[must_use]
    pub fn missed_wikilinks(&self) -> &[MissedWikilink] {
        self.missed_wikilinks.as_deref().unwrap_or_default()
    }

    /// Original and projected links of one sentence.
    pub fn sentence_links(&self, sentence_idx: usize) -> impl Iterator<Item = &Wikilink> {
        self.wikilinks()
            .iter()
            .chain(self.projected_wikilinks())
            .filter(move |link| link.sentence_idx == sentence_idx)
    }
}

impl Prepare for WikilinksAnnotation {
    type Derived = ();

    fn prepare(&self, _ctx: &PreparationContext<'_>) -> Result<()> {
        Ok(())
    }
}

impl AnnotationPayload for WikilinksAnnotation {
    const KIND: AnnotationKind = AnnotationKind::Wikilinks;
}

impl From<WikilinksAnnotation> for Annotation {
    fn from(annotation: WikilinksAnnotation) -> Self {
        Self::Wikilinks(annotation)
    }
}
