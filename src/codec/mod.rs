//! Span codec: compact per-token encoding of linguistic annotations.
//!
//! A compact token never stores its surface text. It keeps the character span into the page
//! text, a POS index, and morphological features as vocabulary indices (or verbatim strings for
//! features outside the vocabulary). Lemma and NER tag are kept only when they differ from the
//! defaults (surface text and [`NER_OUTSIDE`]).

pub mod text;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::constants::{
    MORPH_CLASSES, MORPH_FEATURE_SEPARATOR, MULTIWORD_MORPH_SEPARATOR, NER_OUTSIDE, POS_CLASSES,
};
use crate::error::{MosaicoError, Result};
use crate::types::CharSpan;

pub use text::{PageText, compress_text, decompress_text};

static MORPH_INDEX: Lazy<HashMap<&'static str, u16>> = Lazy::new(|| {
    MORPH_CLASSES
        .iter()
        .enumerate()
        .map(|(index, feature)| (*feature, index as u16))
        .collect()
});

/// Universal part-of-speech tag, persisted as its vocabulary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum Pos {
    Adj = 0,
    Adp,
    Adv,
    Aux,
    Cconj,
    Det,
    Intj,
    Noun,
    Num,
    Part,
    Pron,
    Propn,
    Punct,
    Sconj,
    Sym,
    Verb,
    X,
}

impl Pos {
    pub const ALL: [Pos; 17] = [
        Self::Adj,
        Self::Adp,
        Self::Adv,
        Self::Aux,
        Self::Cconj,
        Self::Det,
        Self::Intj,
        Self::Noun,
        Self::Num,
        Self::Part,
        Self::Pron,
        Self::Propn,
        Self::Punct,
        Self::Sconj,
        Self::Sym,
        Self::Verb,
        Self::X,
    ];

    #[must_use]
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(MosaicoError::UnknownVocabularyIndex {
                vocabulary: "pos",
                index,
            })
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        POS_CLASSES[self as usize]
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pos {
    type Err = MosaicoError;

    fn from_str(s: &str) -> Result<Self> {
        POS_CLASSES
            .iter()
            .position(|tag| *tag == s)
            .map(|index| Self::ALL[index])
            .ok_or_else(|| MosaicoError::UnknownPos { tag: s.to_string() })
    }
}

impl TryFrom<u8> for Pos {
    type Error = MosaicoError;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_index(usize::from(value))
    }
}

impl From<Pos> for u8 {
    fn from(pos: Pos) -> Self {
        pos.index()
    }
}

/// One morphological feature: a vocabulary index, or the feature string itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MorphCode {
    Index(u16),
    Verbatim(String),
}

impl MorphCode {
    #[must_use]
    pub fn encode(feature: &str) -> Self {
        match MORPH_INDEX.get(feature) {
            Some(index) => Self::Index(*index),
            None => Self::Verbatim(feature.to_string()),
        }
    }

    pub fn expand(&self) -> Result<&str> {
        match self {
            Self::Index(index) => MORPH_CLASSES
                .get(usize::from(*index))
                .copied()
                .ok_or(MosaicoError::UnknownVocabularyIndex {
                    vocabulary: "morphology",
                    index: usize::from(*index),
                }),
            Self::Verbatim(feature) => Ok(feature),
        }
    }
}

/// Features of a single word.
pub type MorphFeatures = SmallVec<[MorphCode; 4]>;
/// Feature lists of every word of a token (one entry unless the token is multi-word).
pub type TokenMorphology = SmallVec<[MorphFeatures; 1]>;

/// Compress a `|`-joined feature string.
#[must_use]
pub fn compress_features(morph: &str) -> MorphFeatures {
    morph
        .split(MORPH_FEATURE_SEPARATOR)
        .map(MorphCode::encode)
        .collect()
}

pub fn expand_features(codes: &[MorphCode]) -> Result<String> {
    let features = codes
        .iter()
        .map(MorphCode::expand)
        .collect::<Result<Vec<_>>>()?;
    Ok(features.join(MORPH_FEATURE_SEPARATOR))
}

/// Compress a token-level morphology string, whose words are joined by `___`.
#[must_use]
pub fn compress_token_morph(morph: &str) -> TokenMorphology {
    morph
        .split(MULTIWORD_MORPH_SEPARATOR)
        .map(compress_features)
        .collect()
}

pub fn expand_token_morph(words: &[MorphFeatures]) -> Result<String> {
    let words = words
        .iter()
        .map(|codes| expand_features(codes))
        .collect::<Result<Vec<_>>>()?;
    Ok(words.join(MULTIWORD_MORPH_SEPARATOR))
}

/// Positional core of a compact token: `[span, pos, morphology]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenData(pub CharSpan, pub Pos, pub TokenMorphology);

/// Values stored only when they differ from their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TokenExtras {
    #[serde(rename = "l", default, skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,
    #[serde(rename = "n", default, skip_serializing_if = "Option::is_none")]
    pub ner: Option<String>,
}

impl TokenExtras {
    pub(crate) fn is_empty(&self) -> bool {
        self.lemma.is_none() && self.ner.is_none()
    }
}

/// Storage form of a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompactToken {
    #[serde(rename = "d")]
    pub data: TokenData,
    #[serde(rename = "e", default, skip_serializing_if = "Option::is_none")]
    pub extras: Option<TokenExtras>,
}

impl CompactToken {
    #[must_use]
    pub fn char_span(&self) -> CharSpan {
        self.data.0
    }

    #[must_use]
    pub fn pos(&self) -> Pos {
        self.data.1
    }

    #[must_use]
    pub fn morphology(&self) -> &[MorphFeatures] {
        &self.data.2
    }

    #[must_use]
    pub fn stored_lemma(&self) -> Option<&str> {
        self.extras.as_ref().and_then(|e| e.lemma.as_deref())
    }

    #[must_use]
    pub fn stored_ner(&self) -> Option<&str> {
        self.extras.as_ref().and_then(|e| e.ner.as_deref())
    }
}

/// Fully materialized token, as emitted by the annotators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInput<'a> {
    pub text: &'a str,
    pub char_span: CharSpan,
    pub pos: &'a str,
    pub morph: &'a str,
    pub lemma: &'a str,
    pub ner: &'a str,
}

/// Token fields recovered from a compact token and the page text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedToken<'a> {
    pub text: &'a str,
    pub pos: Pos,
    pub morph: String,
    pub lemma: &'a str,
    pub ner: &'a str,
}

pub fn encode_token(input: &TokenInput<'_>) -> Result<CompactToken> {
    if input.char_span.start > input.char_span.end {
        return Err(MosaicoError::invalid_encoding(format!(
            "token span {} is reversed",
            input.char_span
        )));
    }
    let pos = input.pos.parse::<Pos>()?;
    let extras = TokenExtras {
        lemma: (input.lemma != input.text).then(|| input.lemma.to_string()),
        ner: (input.ner != NER_OUTSIDE).then(|| input.ner.to_string()),
    };
    Ok(CompactToken {
        data: TokenData(input.char_span, pos, compress_token_morph(input.morph)),
        extras: (!extras.is_empty()).then_some(extras),
    })
}

/// Pure and deterministic: the same token and text always decode to the same fields.
pub fn decode_token<'a>(token: &'a CompactToken, text: &'a PageText) -> Result<DecodedToken<'a>> {
    let surface = text.slice(token.char_span())?;
    Ok(DecodedToken {
        text: surface,
        pos: token.pos(),
        morph: expand_token_morph(token.morphology())?,
        lemma: token.stored_lemma().unwrap_or(surface),
        ner: token.stored_ner().unwrap_or(NER_OUTSIDE),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(text: &'a str, span: (usize, usize), pos: &'a str) -> TokenInput<'a> {
        TokenInput {
            text,
            char_span: span.into(),
            pos,
            morph: "Number=Sing",
            lemma: text,
            ner: NER_OUTSIDE,
        }
    }

    #[test]
    fn defaults_are_not_stored() {
        let token = encode_token(&input("Obama", (0, 5), "PROPN")).expect("encode");
        assert!(token.extras.is_none());
        let json = serde_json::to_string(&token).expect("json");
        assert_eq!(json, r#"{"d":[[0,5],11,[[1]]]}"#);
    }

    #[test]
    fn lemma_and_ner_kept_when_different() {
        let token = encode_token(&TokenInput {
            text: "was",
            char_span: CharSpan::new(6, 9),
            pos: "AUX",
            morph: "Mood=Ind|Number=Sing|Person=3|Tense=Past|VerbForm=Fin",
            lemma: "be",
            ner: "S-PER",
        })
        .expect("encode");
        assert_eq!(token.stored_lemma(), Some("be"));
        assert_eq!(token.stored_ner(), Some("S-PER"));

        let text = PageText::new("Obama was president.");
        let decoded = decode_token(&token, &text).expect("decode");
        assert_eq!(decoded.text, "was");
        assert_eq!(decoded.lemma, "be");
        assert_eq!(decoded.ner, "S-PER");
        assert_eq!(
            decoded.morph,
            "Mood=Ind|Number=Sing|Person=3|Tense=Past|VerbForm=Fin"
        );
    }

    #[test]
    fn unknown_features_stored_verbatim() {
        let codes = compress_features("Number=Sing|Evident=Nfh");
        assert_eq!(codes[0], MorphCode::Index(1));
        assert_eq!(codes[1], MorphCode::Verbatim("Evident=Nfh".into()));
        assert_eq!(expand_features(&codes).expect("expand"), "Number=Sing|Evident=Nfh");
    }

    #[test]
    fn multiword_morphology() {
        let morph = "AdpType=Prep___Definite=Def|Gender=Masc|Number=Sing|PronType=Art";
        let words = compress_token_morph(morph);
        assert_eq!(words.len(), 2);
        assert_eq!(expand_token_morph(&words).expect("expand"), morph);
    }

    #[test]
    fn unknown_pos_fails_encoding() {
        let err = encode_token(&input("foo", (0, 3), "NOUNISH")).expect_err("unknown pos");
        assert!(matches!(err, MosaicoError::UnknownPos { .. }));
    }

    #[test]
    fn unknown_indices_fail_decoding() {
        assert!(serde_json::from_str::<CompactToken>(r#"{"d":[[0,1],17,[[0]]]}"#).is_err());

        let token: CompactToken =
            serde_json::from_str(r#"{"d":[[0,1],0,[[999]]]}"#).expect("shape is valid");
        let err = decode_token(&token, &PageText::new("a")).expect_err("bad index");
        assert!(matches!(
            err,
            MosaicoError::UnknownVocabularyIndex {
                vocabulary: "morphology",
                index: 999
            }
        ));
    }

    #[test]
    fn pos_vocabulary_is_stable() {
        for (index, tag) in POS_CLASSES.iter().enumerate() {
            let pos: Pos = tag.parse().expect("tag");
            assert_eq!(usize::from(pos.index()), index);
            assert_eq!(pos.as_str(), *tag);
        }
    }

    #[test]
    fn randomized_roundtrip() {
        let page = "Die Katze schläft auf dem Sofa, während es regnet.";
        let text = PageText::new(page);
        let words: Vec<(usize, usize)> = {
            let mut spans = Vec::new();
            let mut start = None;
            for (index, ch) in page.chars().enumerate() {
                match (ch.is_alphanumeric(), start) {
                    (true, None) => start = Some(index),
                    (false, Some(s)) => {
                        spans.push((s, index));
                        start = None;
                    }
                    _ => {}
                }
            }
            spans
        };
        let features = ["Number=Sing", "Case=Nom", "Evident=Nfh", "Tense=Pres", "\u{2205}"];
        let ners = [NER_OUTSIDE, "B-LOC", "E-LOC"];

        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..200 {
            let span = words[rng.usize(..words.len())];
            let surface = text.slice(span.into()).expect("slice");
            let morph = (0..rng.usize(1..4))
                .map(|_| features[rng.usize(..features.len())])
                .collect::<Vec<_>>()
                .join("|");
            let lemma = if rng.bool() { surface.to_string() } else { surface.to_lowercase() };
            let pos = POS_CLASSES[rng.usize(..POS_CLASSES.len())];
            let ner = ners[rng.usize(..ners.len())];

            let token = encode_token(&TokenInput {
                text: surface,
                char_span: span.into(),
                pos,
                morph: &morph,
                lemma: &lemma,
                ner,
            })
            .expect("encode");
            let first = decode_token(&token, &text).expect("decode");
            let second = decode_token(&token, &text).expect("decode again");

            assert_eq!(first, second);
            assert_eq!(first.text, surface);
            assert_eq!(first.pos.as_str(), pos);
            assert_eq!(first.morph, morph);
            assert_eq!(first.lemma, lemma);
            assert_eq!(first.ner, ner);
        }
    }
}
