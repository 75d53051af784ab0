//! Error type shared by every module of the crate.

use thiserror::Error;

/// Result alias using [`MosaicoError`].
pub type Result<T, E = MosaicoError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum MosaicoError {
    #[error("no annotation `{kind}` present on page")]
    AnnotationNotFound { kind: String },

    #[error("no translation available for language `{language}`")]
    TranslationNotFound { language: String },

    #[error("record {id} not found in collection `{collection}`")]
    RecordNotFound {
        collection: &'static str,
        id: String,
    },

    #[error("annotation `{kind}` already present on page")]
    DuplicateAnnotation { kind: String },

    #[error("interlanguage link {wikidata_id} already holds a page for language `{language}`")]
    DuplicateLanguage {
        wikidata_id: String,
        language: String,
    },

    #[error("unique constraint ({fields}) violated in collection `{collection}`")]
    UniqueViolation {
        collection: &'static str,
        fields: String,
    },

    #[error("record of {size} bytes exceeds the {limit} byte ceiling of collection `{collection}`")]
    RecordTooLarge {
        collection: &'static str,
        size: usize,
        limit: usize,
    },

    #[error("page {document_id} has not been inserted into the store")]
    PageNotPersisted { document_id: String },

    #[error("page {document_id} has no wikidata id")]
    MissingWikidataId { document_id: String },

    #[error("unknown annotation tag `{tag}`")]
    UnknownAnnotationTag { tag: String },

    #[error("annotation tag `{tag}` registered twice")]
    RegistryConflict { tag: &'static str },

    #[error("annotation registry used before initialization")]
    RegistryUninitialized,

    #[error("unknown part-of-speech tag `{tag}`")]
    UnknownPos { tag: String },

    #[error("index {index} is outside the {vocabulary} vocabulary")]
    UnknownVocabularyIndex {
        vocabulary: &'static str,
        index: usize,
    },

    #[error("invalid compact encoding: {reason}")]
    InvalidEncoding { reason: String },

    #[error("character span [{start}, {end}) out of bounds for text of {len} characters")]
    SpanOutOfBounds {
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("unresolvable reference in `{kind}` annotation: {reason}")]
    InvalidReference { kind: &'static str, reason: String },

    #[error("compressed page text is corrupt: {reason}")]
    CorruptText { reason: String },

    #[error("journal corrupt at offset {offset}: {reason}")]
    JournalCorruption { offset: u64, reason: String },

    #[error("store lock error: {0}")]
    Lock(String),

    #[error("store operation `{operation}` timed out after {timeout_ms} ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl MosaicoError {
    /// Whether the error reports an absent annotation, translation or record.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::AnnotationNotFound { .. }
                | Self::TranslationNotFound { .. }
                | Self::RecordNotFound { .. }
        )
    }

    pub(crate) fn invalid_encoding(reason: impl Into<String>) -> Self {
        Self::InvalidEncoding {
            reason: reason.into(),
        }
    }
}
