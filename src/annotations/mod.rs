//! Annotation kinds.
//!
//! The set of kinds is closed: [`Annotation`] holds a decoded payload, [`PreparedAnnotation`] the
//! same payload after preparation. Payloads travel without type markers; the kind tag sits next to
//! them in the containing record (see [`container`]), and [`registry`] maps the tag back to its
//! decoder.

pub mod amr;
pub mod cirrus;
pub mod container;
pub mod registry;
pub mod rel_ex;
pub mod sectioning;
pub mod srl;
pub mod stanza;
pub mod wikilinks;
pub mod wsd;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{MosaicoError, Result};
use crate::prepare::{PreparationContext, Prepared};

pub use amr::{AmrAnnotation, AmrGraph};
pub use cirrus::CirrusAnnotation;
pub use container::{AnnotationContainer, AnnotationRef, Link, LinkedAnnotationRecord};
pub use registry::{AnnotationPayload, AnnotationRegistry, init_registry, registry};
pub use rel_ex::{Annotator, Argument, Origin, ReAnnotation, ReTriple, Relation};
pub use sectioning::{Section, SectioningAnnotation};
pub use srl::{PredArgStructure, Predicate, SemanticArgument, SrlAnnotation};
pub use stanza::{
    StanzaAnnotation, StanzaDocument, StanzaSentence, StanzaToken, StanzaWord,
};
pub use wikilinks::{MissedWikilink, ProjectedWikilink, Wikilink, WikilinksAnnotation};
pub use wsd::{WsdAnnotation, WsdSpan};

/// Stable kind tag of an annotation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationKind {
    Sectioning,
    Stanza,
    Wsd,
    Srl,
    Re,
    Amr,
    Wikilinks,
    Cirrus,
}

impl AnnotationKind {
    pub const ALL: [AnnotationKind; 8] = [
        Self::Sectioning,
        Self::Stanza,
        Self::Wsd,
        Self::Srl,
        Self::Re,
        Self::Amr,
        Self::Wikilinks,
        Self::Cirrus,
    ];

    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Sectioning => "sectioning",
            Self::Stanza => "stanza",
            Self::Wsd => "wsd",
            Self::Srl => "srl",
            Self::Re => "re",
            Self::Amr => "amr",
            Self::Wikilinks => "wikilinks",
            Self::Cirrus => "cirrus",
        }
    }

    /// Kinds that must be prepared on the same page before this one.
    #[must_use]
    pub fn dependencies(self) -> &'static [AnnotationKind] {
        match self {
            Self::Re => &[Self::Stanza],
            _ => &[],
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for AnnotationKind {
    type Err = MosaicoError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == s)
            .ok_or_else(|| MosaicoError::UnknownAnnotationTag { tag: s.to_string() })
    }
}

/// A decoded, not yet prepared annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Annotation {
    Sectioning(SectioningAnnotation),
    Stanza(StanzaAnnotation),
    Wsd(WsdAnnotation),
    Srl(SrlAnnotation),
    Re(ReAnnotation),
    Amr(AmrAnnotation),
    Wikilinks(WikilinksAnnotation),
    Cirrus(CirrusAnnotation),
}

/// Preparation failed; the decoded annotation is handed back untouched.
#[derive(Debug)]
pub struct AnnotationPrepareFailure {
    pub annotation: Annotation,
    pub error: MosaicoError,
}

macro_rules! prepare_variant {
    ($variant:ident, $raw:expr, $ctx:expr) => {
        Prepared::try_new($raw, $ctx)
            .map(PreparedAnnotation::$variant)
            .map_err(|failure| AnnotationPrepareFailure {
                annotation: Annotation::$variant(failure.raw),
                error: failure.error,
            })
    };
}

impl Annotation {
    #[must_use]
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Self::Sectioning(_) => AnnotationKind::Sectioning,
            Self::Stanza(_) => AnnotationKind::Stanza,
            Self::Wsd(_) => AnnotationKind::Wsd,
            Self::Srl(_) => AnnotationKind::Srl,
            Self::Re(_) => AnnotationKind::Re,
            Self::Amr(_) => AnnotationKind::Amr,
            Self::Wikilinks(_) => AnnotationKind::Wikilinks,
            Self::Cirrus(_) => AnnotationKind::Cirrus,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind().tag()
    }

    pub fn prepare(self, ctx: &PreparationContext<'_>) -> Result<PreparedAnnotation> {
        self.try_prepare(ctx).map_err(|failure| failure.error)
    }

    /// Like [`Annotation::prepare`], but keeps the annotation on failure.
    pub fn try_prepare(
        self,
        ctx: &PreparationContext<'_>,
    ) -> std::result::Result<PreparedAnnotation, AnnotationPrepareFailure> {
        match self {
            Self::Sectioning(raw) => prepare_variant!(Sectioning, raw, ctx),
            Self::Stanza(raw) => prepare_variant!(Stanza, raw, ctx),
            Self::Wsd(raw) => prepare_variant!(Wsd, raw, ctx),
            Self::Srl(raw) => prepare_variant!(Srl, raw, ctx),
            Self::Re(raw) => prepare_variant!(Re, raw, ctx),
            Self::Amr(raw) => prepare_variant!(Amr, raw, ctx),
            Self::Wikilinks(raw) => prepare_variant!(Wikilinks, raw, ctx),
            Self::Cirrus(raw) => prepare_variant!(Cirrus, raw, ctx),
        }
    }
}

/// An annotation whose derived fields are available.
#[derive(Debug)]
pub enum PreparedAnnotation {
    Sectioning(Prepared<SectioningAnnotation>),
    Stanza(Prepared<StanzaAnnotation>),
    Wsd(Prepared<WsdAnnotation>),
    Srl(Prepared<SrlAnnotation>),
    Re(Prepared<ReAnnotation>),
    Amr(Prepared<AmrAnnotation>),
    Wikilinks(Prepared<WikilinksAnnotation>),
    Cirrus(Prepared<CirrusAnnotation>),
}

macro_rules! prepared_accessor {
    ($fn_name:ident, $variant:ident, $ty:ty) => {
        #[must_use]
        pub fn $fn_name(&self) -> Option<&Prepared<$ty>> {
            match self {
                Self::$variant(prepared) => Some(prepared),
                _ => None,
            }
        }
    };
}

impl PreparedAnnotation {
    #[must_use]
    pub fn kind(&self) -> AnnotationKind {
        match self {
            Self::Sectioning(_) => AnnotationKind::Sectioning,
            Self::Stanza(_) => AnnotationKind::Stanza,
            Self::Wsd(_) => AnnotationKind::Wsd,
            Self::Srl(_) => AnnotationKind::Srl,
            Self::Re(_) => AnnotationKind::Re,
            Self::Amr(_) => AnnotationKind::Amr,
            Self::Wikilinks(_) => AnnotationKind::Wikilinks,
            Self::Cirrus(_) => AnnotationKind::Cirrus,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind().tag()
    }

    prepared_accessor!(as_sectioning, Sectioning, SectioningAnnotation);
    prepared_accessor!(as_stanza, Stanza, StanzaAnnotation);
    prepared_accessor!(as_wsd, Wsd, WsdAnnotation);
    prepared_accessor!(as_srl, Srl, SrlAnnotation);
    prepared_accessor!(as_re, Re, ReAnnotation);
    prepared_accessor!(as_amr, Amr, AmrAnnotation);
    prepared_accessor!(as_wikilinks, Wikilinks, WikilinksAnnotation);
    prepared_accessor!(as_cirrus, Cirrus, CirrusAnnotation);

    /// Copy of the raw payload, as it would be decoded from storage.
    #[must_use]
    pub fn to_annotation(&self) -> Annotation {
        match self {
            Self::Sectioning(p) => Annotation::Sectioning(p.raw().clone()),
            Self::Stanza(p) => Annotation::Stanza(p.raw().clone()),
            Self::Wsd(p) => Annotation::Wsd(p.raw().clone()),
            Self::Srl(p) => Annotation::Srl(p.raw().clone()),
            Self::Re(p) => Annotation::Re(p.raw().clone()),
            Self::Amr(p) => Annotation::Amr(p.raw().clone()),
            Self::Wikilinks(p) => Annotation::Wikilinks(p.raw().clone()),
            Self::Cirrus(p) => Annotation::Cirrus(p.raw().clone()),
        }
    }
}

/// Serializes the raw payload only; derived fields never reach storage.
impl Serialize for PreparedAnnotation {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Sectioning(p) => p.raw().serialize(serializer),
            Self::Stanza(p) => p.raw().serialize(serializer),
            Self::Wsd(p) => p.raw().serialize(serializer),
            Self::Srl(p) => p.raw().serialize(serializer),
            Self::Re(p) => p.raw().serialize(serializer),
            Self::Amr(p) => p.raw().serialize(serializer),
            Self::Wikilinks(p) => p.raw().serialize(serializer),
            Self::Cirrus(p) => p.raw().serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::PageText;

    #[test]
    fn tags_are_unique_and_parse_back() {
        let mut tags: Vec<&str> = AnnotationKind::ALL.iter().map(|k| k.tag()).collect();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), AnnotationKind::ALL.len());
        for kind in AnnotationKind::ALL {
            assert_eq!(kind.tag().parse::<AnnotationKind>().expect("tag"), kind);
            assert_eq!(
                serde_json::to_value(kind).expect("json"),
                serde_json::Value::from(kind.tag())
            );
        }
        assert!("ner".parse::<AnnotationKind>().is_err());
    }

    #[test]
    fn relation_extraction_depends_on_stanza() {
        assert_eq!(AnnotationKind::Re.dependencies(), &[AnnotationKind::Stanza]);
        assert!(AnnotationKind::Stanza.dependencies().is_empty());
    }

    #[test]
    fn failed_preparation_keeps_annotation() {
        let raw: ReAnnotation = serde_json::from_value(serde_json::json!({
            "triples": [{
                "origin": {"sentence_span": [0, 1]},
                "annotator": "relik",
                "relation": {"title": "position held"},
                "head": {"sentence_idx": 0, "token_span": [0, 1]},
                "tail": {"sentence_idx": 0, "token_span": [2, 3]}
            }]
        }))
        .expect("decode");
        let text = PageText::new("Obama was president.");
        let failure = Annotation::Re(raw.clone())
            .try_prepare(&PreparationContext::new(&text))
            .expect_err("stanza missing");
        assert_eq!(failure.annotation, Annotation::Re(raw));
        assert!(failure.error.is_not_found());
    }

    #[test]
    fn prepared_serializes_like_raw() {
        let raw = SectioningAnnotation {
            sections: vec![Section {
                name: "Abstract".into(),
                sentences_span: (0, 3),
            }],
        };
        let text = PageText::new("");
        let prepared = Annotation::Sectioning(raw.clone())
            .prepare(&PreparationContext::new(&text))
            .expect("prepare");
        assert_eq!(prepared.kind(), AnnotationKind::Sectioning);
        assert_eq!(
            serde_json::to_value(&prepared).expect("json"),
            serde_json::to_value(&raw).expect("json")
        );
        assert_eq!(prepared.to_annotation(), Annotation::Sectioning(raw));
    }
}
