//! Tokenized document: sentences, tokens and multi-word token constituents.
//!
//! Tokens are stored in compact form (see [`crate::codec`]); the surface text, expanded POS and
//! morphology, lemma and NER tag are derived against the page text during preparation and read
//! back through the view types returned by [`Prepared<StanzaAnnotation>::document`].
//!
//! Besides the compact form, tokens, words and sentences decode from the expanded form emitted by
//! the annotators (`char_start`, `char_end`, `text`, `pos`, `morph`, `lemma`, `ner`,
//! `words`), which is compressed on the way in.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::{Annotation, AnnotationKind, AnnotationPayload};
use crate::codec::{
    CompactToken, MorphFeatures, PageText, Pos, TokenData, TokenExtras, TokenInput,
    compress_features, encode_token, expand_features, expand_token_morph,
};
use crate::constants::NER_OUTSIDE;
use crate::error::{MosaicoError, Result};
use crate::prepare::{Prepare, PreparationContext, Prepared};
use crate::types::CharSpan;

/// `[text, pos, features]` of a word. Words keep their own text, which may differ from the
/// surface of the token they belong to (`del` → `de` + `el`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordData(pub String, pub Pos, pub MorphFeatures);

/// Constituent word of a multi-word token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WordRepr")]
pub struct StanzaWord {
    #[serde(rename = "d")]
    pub data: WordData,
    #[serde(rename = "l", default, skip_serializing_if = "Option::is_none")]
    pub lemma: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WordRepr {
    Compact {
        d: WordData,
        #[serde(default)]
        l: Option<String>,
    },
    Expanded {
        text: String,
        pos: String,
        #[serde(default)]
        morph: String,
        #[serde(default)]
        lemma: Option<String>,
    },
}

impl TryFrom<WordRepr> for StanzaWord {
    type Error = MosaicoError;

    fn try_from(repr: WordRepr) -> Result<Self> {
        match repr {
            WordRepr::Compact { d, l } => Ok(Self { data: d, lemma: l }),
            WordRepr::Expanded {
                text,
                pos,
                morph,
                lemma,
            } => {
                let lemma = lemma.unwrap_or_else(|| text.clone());
                Self::encode(&text, &pos, &morph, &lemma)
            }
        }
    }
}

impl StanzaWord {
    pub fn encode(text: &str, pos: &str, morph: &str, lemma: &str) -> Result<Self> {
        Ok(Self {
            data: WordData(text.to_string(), pos.parse()?, compress_features(morph)),
            lemma: (lemma != text).then(|| lemma.to_string()),
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.data.0
    }

    #[must_use]
    pub fn pos(&self) -> Pos {
        self.data.1
    }

    /// Lemma, falling back to the word text when none was stored.
    #[must_use]
    pub fn lemma(&self) -> &str {
        self.lemma.as_deref().unwrap_or(&self.data.0)
    }
}

/// Storage form of a token: the compact core plus its words when multi-word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TokenRepr")]
pub struct StanzaToken {
    #[serde(flatten)]
    pub compact: CompactToken,
    #[serde(rename = "w", default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<StanzaWord>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TokenRepr {
    Compact {
        d: TokenData,
        #[serde(default)]
        e: Option<TokenExtras>,
        #[serde(default)]
        w: Option<Vec<StanzaWord>>,
    },
    Expanded(ExpandedToken),
}

#[derive(Deserialize)]
struct ExpandedToken {
    char_start: usize,
    char_end: usize,
    text: String,
    pos: String,
    #[serde(default)]
    morph: String,
    #[serde(default)]
    lemma: Option<String>,
    #[serde(default)]
    ner: Option<String>,
    #[serde(default)]
    words: Option<Vec<StanzaWord>>,
}

impl TryFrom<TokenRepr> for StanzaToken {
    type Error = MosaicoError;

    fn try_from(repr: TokenRepr) -> Result<Self> {
        match repr {
            TokenRepr::Compact { d, e, w } => Ok(Self {
                compact: CompactToken {
                    data: d,
                    extras: e.filter(|extras| !extras.is_empty()),
                },
                words: w,
            }),
            TokenRepr::Expanded(token) => {
                let input = TokenInput {
                    text: &token.text,
                    char_span: CharSpan::new(token.char_start, token.char_end),
                    pos: &token.pos,
                    morph: &token.morph,
                    lemma: token.lemma.as_deref().unwrap_or(&token.text),
                    ner: token.ner.as_deref().unwrap_or(NER_OUTSIDE),
                };
                Self::encode(&input, token.words)
            }
        }
    }
}

impl StanzaToken {
    pub fn encode(input: &TokenInput<'_>, words: Option<Vec<StanzaWord>>) -> Result<Self> {
        Ok(Self {
            compact: encode_token(input)?,
            words,
        })
    }

    #[must_use]
    pub fn char_span(&self) -> CharSpan {
        self.compact.char_span()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StanzaSentence {
    #[serde(rename = "t", alias = "tokens")]
    pub tokens: Vec<StanzaToken>,
}

impl StanzaSentence {
    #[must_use]
    pub fn new(tokens: Vec<StanzaToken>) -> Self {
        Self { tokens }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StanzaDocument {
    pub sentences: Vec<StanzaSentence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StanzaAnnotation {
    pub document: StanzaDocument,
}

impl StanzaAnnotation {
    #[must_use]
    pub fn new(sentences: Vec<StanzaSentence>) -> Self {
        Self {
            document: StanzaDocument { sentences },
        }
    }
}

impl AnnotationPayload for StanzaAnnotation {
    const KIND: AnnotationKind = AnnotationKind::Stanza;
}

impl From<StanzaAnnotation> for Annotation {
    fn from(annotation: StanzaAnnotation) -> Self {
        Self::Stanza(annotation)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordFields {
    morph: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFields {
    bytes: Range<usize>,
    morph: String,
    words: Vec<WordFields>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceFields {
    span: CharSpan,
    bytes: Range<usize>,
    tokens: Vec<TokenFields>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFields {
    span: CharSpan,
    bytes: Range<usize>,
    sentences: Vec<SentenceFields>,
}

impl Prepare for StanzaWord {
    type Derived = WordFields;

    fn prepare(&self, _ctx: &PreparationContext<'_>) -> Result<WordFields> {
        Ok(WordFields {
            morph: expand_features(&self.data.2)?,
        })
    }
}

impl Prepare for StanzaToken {
    type Derived = TokenFields;

    fn prepare(&self, ctx: &PreparationContext<'_>) -> Result<TokenFields> {
        let words = match &self.words {
            Some(words) => words
                .iter()
                .map(|word| word.prepare(ctx))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        Ok(TokenFields {
            bytes: ctx.text().byte_range(self.char_span())?,
            morph: expand_token_morph(self.compact.morphology())?,
            words,
        })
    }
}

impl Prepare for StanzaSentence {
    type Derived = SentenceFields;

    fn prepare(&self, ctx: &PreparationContext<'_>) -> Result<SentenceFields> {
        let (Some(first), Some(last)) = (self.tokens.first(), self.tokens.last()) else {
            return Err(MosaicoError::invalid_encoding("sentence without tokens"));
        };
        for pair in self.tokens.windows(2) {
            let (previous, next) = (pair[0].char_span(), pair[1].char_span());
            if next.start < previous.end {
                return Err(MosaicoError::invalid_encoding(format!(
                    "token {next} overlaps or precedes token {previous}"
                )));
            }
        }
        let tokens = self
            .tokens
            .iter()
            .map(|token| token.prepare(ctx))
            .collect::<Result<Vec<_>>>()?;
        let span = CharSpan::new(first.char_span().start, last.char_span().end);
        Ok(SentenceFields {
            span,
            bytes: ctx.text().byte_range(span)?,
            tokens,
        })
    }
}

impl Prepare for StanzaDocument {
    type Derived = DocumentFields;

    fn prepare(&self, ctx: &PreparationContext<'_>) -> Result<DocumentFields> {
        let sentences = self
            .sentences
            .iter()
            .map(|sentence| sentence.prepare(ctx))
            .collect::<Result<Vec<_>>>()?;
        for pair in sentences.windows(2) {
            if pair[1].span.start < pair[0].span.end {
                return Err(MosaicoError::invalid_encoding(format!(
                    "sentence {} overlaps or precedes sentence {}",
                    pair[1].span, pair[0].span
                )));
            }
        }
        let span = match (sentences.first(), sentences.last()) {
            (Some(first), Some(last)) => CharSpan::new(first.span.start, last.span.end),
            _ => CharSpan::new(0, 0),
        };
        Ok(DocumentFields {
            span,
            bytes: ctx.text().byte_range(span)?,
            sentences,
        })
    }
}

impl Prepare for StanzaAnnotation {
    type Derived = DocumentFields;

    fn prepare(&self, ctx: &PreparationContext<'_>) -> Result<DocumentFields> {
        let fields = self.document.prepare(ctx)?;
        tracing::debug!(
            stanza.sentences = fields.sentences.len(),
            stanza.span = %fields.span,
            "prepared stanza document"
        );
        Ok(fields)
    }
}

impl Prepared<StanzaAnnotation> {
    #[must_use]
    pub fn document(&self) -> DocumentView<'_> {
        DocumentView {
            text: self.page_text(),
            raw: &self.raw().document,
            fields: self.derived(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DocumentView<'a> {
    text: &'a PageText,
    raw: &'a StanzaDocument,
    fields: &'a DocumentFields,
}

impl<'a> DocumentView<'a> {
    #[must_use]
    pub fn text(&self) -> &'a str {
        self.text.bytes(&self.fields.bytes)
    }

    #[must_use]
    pub fn char_span(&self) -> CharSpan {
        self.fields.span
    }

    #[must_use]
    pub fn char_start(&self) -> usize {
        self.fields.span.start
    }

    #[must_use]
    pub fn char_end(&self) -> usize {
        self.fields.span.end
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.sentences.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.sentences.is_empty()
    }

    #[must_use]
    pub fn sentence(&self, idx: usize) -> Option<SentenceView<'a>> {
        Some(SentenceView {
            text: self.text,
            raw: self.raw.sentences.get(idx)?,
            fields: self.fields.sentences.get(idx)?,
        })
    }

    pub fn sentences(&self) -> impl Iterator<Item = SentenceView<'a>> + 'a {
        let text = self.text;
        self.raw
            .sentences
            .iter()
            .zip(&self.fields.sentences)
            .map(move |(raw, fields)| SentenceView { text, raw, fields })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SentenceView<'a> {
    text: &'a PageText,
    raw: &'a StanzaSentence,
    fields: &'a SentenceFields,
}

impl<'a> SentenceView<'a> {
    #[must_use]
    pub fn text(&self) -> &'a str {
        self.text.bytes(&self.fields.bytes)
    }

    #[must_use]
    pub fn char_span(&self) -> CharSpan {
        self.fields.span
    }

    #[must_use]
    pub fn char_start(&self) -> usize {
        self.fields.span.start
    }

    #[must_use]
    pub fn char_end(&self) -> usize {
        self.fields.span.end
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.raw.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.raw.tokens.is_empty()
    }

    #[must_use]
    pub fn token(&self, idx: usize) -> Option<TokenView<'a>> {
        Some(TokenView {
            text: self.text,
            raw: self.raw.tokens.get(idx)?,
            fields: self.fields.tokens.get(idx)?,
        })
    }

    pub fn tokens(&self) -> impl Iterator<Item = TokenView<'a>> + 'a {
        let text = self.text;
        self.raw
            .tokens
            .iter()
            .zip(&self.fields.tokens)
            .map(move |(raw, fields)| TokenView { text, raw, fields })
    }

    /// Character span covered by the half-open token range `[start, end)`.
    pub fn token_span_chars(&self, token_span: (usize, usize)) -> Result<CharSpan> {
        let (first, last) = self.token_span_bounds(token_span)?;
        Ok(CharSpan::new(first.char_span().start, last.char_span().end))
    }

    /// Text covered by the half-open token range `[start, end)`.
    pub fn span_text(&self, token_span: (usize, usize)) -> Result<&'a str> {
        let (start, end) = token_span;
        self.token_span_bounds(token_span)?;
        let bytes = self.fields.tokens[start].bytes.start..self.fields.tokens[end - 1].bytes.end;
        Ok(self.text.bytes(&bytes))
    }

    fn token_span_bounds(
        &self,
        (start, end): (usize, usize),
    ) -> Result<(&'a StanzaToken, &'a StanzaToken)> {
        if start >= end || end > self.raw.tokens.len() {
            return Err(MosaicoError::InvalidReference {
                kind: "stanza",
                reason: format!(
                    "token span [{start}, {end}) outside a sentence of {} tokens",
                    self.raw.tokens.len()
                ),
            });
        }
        Ok((&self.raw.tokens[start], &self.raw.tokens[end - 1]))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TokenView<'a> {
    text: &'a PageText,
    raw: &'a StanzaToken,
    fields: &'a TokenFields,
}

impl<'a> TokenView<'a> {
    /// Surface text, sliced out of the page text.
    #[must_use]
    pub fn text(&self) -> &'a str {
        self.text.bytes(&self.fields.bytes)
    }

    #[must_use]
    pub fn char_span(&self) -> CharSpan {
        self.raw.char_span()
    }

    #[must_use]
    pub fn char_start(&self) -> usize {
        self.raw.char_span().start
    }

    #[must_use]
    pub fn char_end(&self) -> usize {
        self.raw.char_span().end
    }

    #[must_use]
    pub fn pos(&self) -> Pos {
        self.raw.compact.pos()
    }

    /// Morphological features; words of a multi-word token are joined by `___`.
    #[must_use]
    pub fn morph(&self) -> &'a str {
        &self.fields.morph
    }

    #[must_use]
    pub fn lemma(&self) -> &'a str {
        match self.raw.compact.stored_lemma() {
            Some(lemma) => lemma,
            None => self.text(),
        }
    }

    #[must_use]
    pub fn ner(&self) -> &'a str {
        self.raw.compact.stored_ner().unwrap_or(NER_OUTSIDE)
    }

    #[must_use]
    pub fn is_multiword(&self) -> bool {
        self.raw.words.is_some()
    }

    pub fn words(&self) -> impl Iterator<Item = WordView<'a>> + 'a {
        self.raw
            .words
            .as_deref()
            .unwrap_or_default()
            .iter()
            .zip(&self.fields.words)
            .map(|(raw, fields)| WordView { raw, fields })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WordView<'a> {
    raw: &'a StanzaWord,
    fields: &'a WordFields,
}

impl<'a> WordView<'a> {
    #[must_use]
    pub fn text(&self) -> &'a str {
        self.raw.text()
    }

    #[must_use]
    pub fn pos(&self) -> Pos {
        self.raw.pos()
    }

    #[must_use]
    pub fn morph(&self) -> &'a str {
        &self.fields.morph
    }

    #[must_use]
    pub fn lemma(&self) -> &'a str {
        self.raw.lemma()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn token(text: &str, start: usize, pos: &str) -> StanzaToken {
        StanzaToken::encode(
            &TokenInput {
                text,
                char_span: CharSpan::new(start, start + text.chars().count()),
                pos,
                morph: "\u{2205}",
                lemma: text,
                ner: NER_OUTSIDE,
            },
            None,
        )
        .expect("encode")
    }

    fn prepare(annotation: StanzaAnnotation, text: &str) -> Result<Prepared<StanzaAnnotation>> {
        let text = PageText::new(text);
        Prepared::new(annotation, &PreparationContext::new(&text))
    }

    #[test]
    fn spans_are_unions_of_children() {
        let text = "Ann ran far. Bob sat down. Cat ate it.";
        let sentences = [
            (0, ["Ann", "ran", "far"]),
            (13, ["Bob", "sat", "down"]),
            (27, ["Cat", "ate", "it"]),
        ]
        .into_iter()
        .map(|(offset, words)| {
            let mut start = offset;
            let tokens = words
                .into_iter()
                .map(|word| {
                    let token = token(word, start, "X");
                    start += word.len() + 1;
                    token
                })
                .collect();
            StanzaSentence::new(tokens)
        })
        .collect();
        let prepared = prepare(StanzaAnnotation::new(sentences), text).expect("prepare");
        let document = prepared.document();

        assert_eq!(document.len(), 3);
        for sentence in document.sentences() {
            let tokens: Vec<_> = sentence.tokens().collect();
            assert_eq!(tokens.len(), 3);
            assert_eq!(sentence.char_start(), tokens[0].char_start());
            assert_eq!(sentence.char_end(), tokens[2].char_end());
        }
        let first = document.sentence(0).expect("first");
        let last = document.sentence(2).expect("last");
        assert_eq!(document.char_span(), CharSpan::new(first.char_start(), last.char_end()));
        assert_eq!(first.text(), "Ann ran far");
        assert_eq!(document.text(), "Ann ran far. Bob sat down. Cat ate it");
    }

    #[test]
    fn compact_wire_form() {
        let annotation: StanzaAnnotation = serde_json::from_value(json!({
            "document": {"sentences": [{"t": [
                {"d": [[0, 5], 11, [[1]]], "e": {"n": "S-PER"}},
                {"d": [[6, 9], 3, [[9, 1, 7, 12, 8]]], "e": {"l": "be"}},
                {"d": [[10, 19], 7, [[1]]]},
                {"d": [[19, 20], 12, [[0]]]}
            ]}]}
        }))
        .expect("decode");
        let prepared = prepare(annotation, "Obama was president.").expect("prepare");
        let sentence = prepared.document().sentence(0).expect("sentence");
        let was = sentence.token(1).expect("token");
        assert_eq!(was.text(), "was");
        assert_eq!(was.pos(), Pos::Aux);
        assert_eq!(was.lemma(), "be");
        assert_eq!(was.morph(), "Mood=Ind|Number=Sing|Person=3|Tense=Past|VerbForm=Fin");
        assert_eq!(was.ner(), "O");
        let obama = sentence.token(0).expect("token");
        assert_eq!(obama.lemma(), "Obama");
        assert_eq!(obama.ner(), "S-PER");
        assert_eq!(sentence.text(), "Obama was president.");
    }

    #[test]
    fn expanded_form_is_compressed_on_decode() {
        let annotation: StanzaAnnotation = serde_json::from_value(json!({
            "document": {"sentences": [{"tokens": [
                {"char_start": 0, "char_end": 3, "text": "Del", "pos": "ADP",
                 "morph": "AdpType=Prep___Definite=Def|Gender=Masc|Number=Sing|PronType=Art",
                 "lemma": "Del", "ner": "O",
                 "words": [
                    {"text": "De", "pos": "ADP", "morph": "AdpType=Prep", "lemma": "de"},
                    {"text": "el", "pos": "DET", "morph": "Definite=Def|Gender=Masc|Number=Sing|PronType=Art", "lemma": "el"}
                 ]},
                {"char_start": 4, "char_end": 10, "text": "pueblo", "pos": "NOUN",
                 "morph": "Gender=Masc|Number=Sing", "lemma": "pueblo", "ner": "O"}
            ]}]}
        }))
        .expect("decode");

        let stored = serde_json::to_value(&annotation).expect("json");
        let first = &stored["document"]["sentences"][0]["t"][0];
        assert!(first.get("e").is_none(), "defaults are not stored");
        assert_eq!(first["w"][1]["d"][0], json!("el"));
        assert!(first["w"][1].get("l").is_none());
        assert_eq!(first["w"][0]["l"], json!("de"));

        let prepared = prepare(annotation, "Del pueblo").expect("prepare");
        let sentence = prepared.document().sentence(0).expect("sentence");
        let del = sentence.token(0).expect("token");
        assert!(del.is_multiword());
        let words: Vec<_> = del.words().collect();
        assert_eq!(words.len(), 2);
        assert_eq!(words[1].text(), "el");
        assert_eq!(words[1].pos(), Pos::Det);
        assert_eq!(words[1].lemma(), "el");
        assert_eq!(words[0].morph(), "AdpType=Prep");
        assert_eq!(
            del.morph(),
            "AdpType=Prep___Definite=Def|Gender=Masc|Number=Sing|PronType=Art"
        );
        assert_eq!(sentence.token(1).expect("token").words().count(), 0);
    }

    #[test]
    fn overlapping_tokens_are_rejected() {
        let sentence = StanzaSentence::new(vec![token("Obama", 0, "PROPN"), token("ma", 3, "X")]);
        let err = prepare(StanzaAnnotation::new(vec![sentence]), "Obama").expect_err("overlap");
        assert!(matches!(err, MosaicoError::InvalidEncoding { .. }));
    }

    #[test]
    fn empty_sentence_is_rejected_and_empty_document_is_not() {
        let err = prepare(StanzaAnnotation::new(vec![StanzaSentence::new(Vec::new())]), "x")
            .expect_err("empty sentence");
        assert!(matches!(err, MosaicoError::InvalidEncoding { .. }));

        let prepared = prepare(StanzaAnnotation::new(Vec::new()), "text").expect("empty doc");
        let document = prepared.document();
        assert!(document.is_empty());
        assert_eq!(document.char_span(), CharSpan::new(0, 0));
        assert_eq!(document.text(), "");
    }

    #[test]
    fn span_text_over_token_ranges() {
        let text = "Barack Obama è nato a Honolulu.";
        let tokens = vec![
            token("Barack", 0, "PROPN"),
            token("Obama", 7, "PROPN"),
            token("è", 13, "AUX"),
            token("nato", 15, "VERB"),
            token("a", 20, "ADP"),
            token("Honolulu", 22, "PROPN"),
            token(".", 30, "PUNCT"),
        ];
        let annotation = StanzaAnnotation::new(vec![StanzaSentence::new(tokens)]);
        let prepared = prepare(annotation, text).expect("prepare");
        let sentence = prepared.document().sentence(0).expect("sentence");
        assert_eq!(sentence.span_text((0, 2)).expect("span"), "Barack Obama");
        assert_eq!(sentence.span_text((2, 4)).expect("span"), "è nato");
        assert_eq!(sentence.token_span_chars((5, 7)).expect("span"), CharSpan::new(22, 31));
        assert!(sentence.span_text((3, 3)).is_err());
        assert!(sentence.span_text((5, 8)).is_err());
    }

    #[test]
    fn token_past_end_of_text_fails() {
        let sentence = StanzaSentence::new(vec![token("Obama", 0, "PROPN")]);
        let err = prepare(StanzaAnnotation::new(vec![sentence]), "Oba").expect_err("oob");
        assert!(matches!(err, MosaicoError::SpanOutOfBounds { .. }));
    }
}
