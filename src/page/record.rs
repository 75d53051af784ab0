//! Stored form of a page.

use serde::{Deserialize, Serialize};

use crate::annotations::container::ContainerRef;
use crate::annotations::{Annotation, AnnotationContainer};
use crate::types::{AnnotationId, Language, PageId};

/// Page record as it sits in the `pages` collection.
///
/// `linked_annotation_names[i]` is the kind tag of the record `linked_annotations[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    #[serde(rename = "_id")]
    pub id: PageId,
    pub document_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wikidata_id: Option<String>,
    pub title: String,
    pub language: Language,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
    #[serde(default)]
    pub is_mosaico_core: bool,
    /// zstd frame of the page text, base64 in the JSON form.
    #[serde(with = "base64_bytes")]
    pub compressed_text: Vec<u8>,
    #[serde(default)]
    pub materialized_annotations: Vec<AnnotationContainer>,
    #[serde(default)]
    pub linked_annotation_names: Vec<String>,
    #[serde(default)]
    pub linked_annotations: Vec<AnnotationId>,
}

/// Borrowed twin of [`PageRecord`] used on the write path.
#[derive(Serialize)]
pub(crate) struct PageRecordRef<'a> {
    #[serde(rename = "_id")]
    pub id: PageId,
    pub document_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wikidata_id: Option<&'a str>,
    pub title: &'a str,
    pub language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<&'a str>,
    pub is_mosaico_core: bool,
    #[serde(serialize_with = "base64_bytes::serialize")]
    pub compressed_text: &'a [u8],
    pub materialized_annotations: Vec<ContainerRef<'a>>,
    pub linked_annotation_names: Vec<&'static str>,
    pub linked_annotations: Vec<AnnotationId>,
}

mod base64_bytes {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// Everything needed to create a page that is not in the store yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDraft {
    pub document_id: String,
    pub title: String,
    pub language: Language,
    pub text: String,
    pub wikidata_id: Option<String>,
    pub quality: Option<String>,
    pub is_mosaico_core: bool,
    /// Annotations to attach, with `true` for materialized storage.
    pub annotations: Vec<(Annotation, bool)>,
}

impl PageDraft {
    pub fn new<D, T, S>(document_id: D, title: T, language: Language, text: S) -> Self
    where
        D: Into<String>,
        T: Into<String>,
        S: Into<String>,
    {
        Self {
            document_id: document_id.into(),
            title: title.into(),
            language,
            text: text.into(),
            wikidata_id: None,
            quality: None,
            is_mosaico_core: false,
            annotations: Vec::new(),
        }
    }

    #[must_use]
    pub fn wikidata_id<S: Into<String>>(mut self, wikidata_id: S) -> Self {
        self.wikidata_id = Some(wikidata_id.into());
        self
    }

    #[must_use]
    pub fn quality<S: Into<String>>(mut self, quality: S) -> Self {
        self.quality = Some(quality.into());
        self
    }

    #[must_use]
    pub fn mosaico_core(mut self, core: bool) -> Self {
        self.is_mosaico_core = core;
        self
    }

    /// Attach an annotation stored inside the page record.
    #[must_use]
    pub fn annotation<A: Into<Annotation>>(mut self, annotation: A) -> Self {
        self.annotations.push((annotation.into(), true));
        self
    }

    /// Attach an annotation stored in its own record.
    #[must_use]
    pub fn linked_annotation<A: Into<Annotation>>(mut self, annotation: A) -> Self {
        self.annotations.push((annotation.into(), false));
        self
    }
}
