//! Query surface consumed from the document store: equality and containment filters over
//! stored JSON documents, plus the page-level query builder lowered onto them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{Language, PageId};
use crate::annotations::AnnotationKind;

/// One predicate over a stored document.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Dotted `path` equals `value`. Arrays met along the path match when any element does, so
    /// `materialized_annotations.name` doubles as a containment test.
    Eq { path: String, value: Value },
    /// At least one of the nested conditions holds.
    Any(Vec<Condition>),
}

impl Condition {
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Self::Eq { path, value } => {
                let segments: Vec<&str> = path.split('.').collect();
                path_matches(document, &segments, value)
            }
            Self::Any(conditions) => conditions.iter().any(|c| c.matches(document)),
        }
    }
}

fn path_matches(node: &Value, segments: &[&str], expected: &Value) -> bool {
    let Some((head, rest)) = segments.split_first() else {
        return match node {
            Value::Array(items) if !expected.is_array() => items.contains(expected),
            _ => node == expected,
        };
    };
    match node {
        Value::Object(map) => match map.get(*head) {
            Some(child) => path_matches(child, rest, expected),
            None => rest.is_empty() && expected.is_null(),
        },
        Value::Array(items) => items
            .iter()
            .any(|item| path_matches(item, segments, expected)),
        _ => false,
    }
}

/// Conjunction of [`Condition`]s. The empty filter matches every document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq<P: Into<String>, V: Into<Value>>(mut self, path: P, value: V) -> Self {
        self.conditions.push(Condition::Eq {
            path: path.into(),
            value: value.into(),
        });
        self
    }

    #[must_use]
    pub fn any(mut self, conditions: Vec<Condition>) -> Self {
        self.conditions.push(Condition::Any(conditions));
        self
    }

    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        self.conditions.iter().all(|c| c.matches(document))
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

/// Page lookup criteria, lowered to a [`Filter`] over page records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageQuery {
    pub language: Option<Language>,
    pub title: Option<String>,
    pub document_id: Option<String>,
    pub wikidata_id: Option<String>,
    pub is_mosaico_core: Option<bool>,
    pub annotations: Vec<AnnotationKind>,
    pub limit: Option<usize>,
}

impl PageQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    pub fn title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn document_id<S: Into<String>>(mut self, document_id: S) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    pub fn wikidata_id<S: Into<String>>(mut self, wikidata_id: S) -> Self {
        self.wikidata_id = Some(wikidata_id.into());
        self
    }

    #[must_use]
    pub fn is_mosaico_core(mut self, core: bool) -> Self {
        self.is_mosaico_core = Some(core);
        self
    }

    /// Only pages carrying `kind`, embedded or linked.
    #[must_use]
    pub fn has_annotation(mut self, kind: AnnotationKind) -> Self {
        self.annotations.push(kind);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn to_filter(&self) -> Filter {
        let mut filter = Filter::new();
        if let Some(language) = self.language {
            filter = filter.eq("language", language.as_str());
        }
        if let Some(title) = &self.title {
            filter = filter.eq("title", title.as_str());
        }
        if let Some(document_id) = &self.document_id {
            filter = filter.eq("document_id", document_id.as_str());
        }
        if let Some(wikidata_id) = &self.wikidata_id {
            filter = filter.eq("wikidata_id", wikidata_id.as_str());
        }
        if let Some(core) = self.is_mosaico_core {
            filter = filter.eq("is_mosaico_core", core);
        }
        for kind in &self.annotations {
            filter = filter.any(vec![
                Condition::Eq {
                    path: "materialized_annotations.name".into(),
                    value: kind.tag().into(),
                },
                Condition::Eq {
                    path: "linked_annotation_names".into(),
                    value: kind.tag().into(),
                },
            ]);
        }
        filter
    }
}

/// Light projection of a page record: identity fields only, no text and no annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    #[serde(rename = "_id")]
    pub id: PageId,
    pub language: Language,
    pub document_id: String,
    pub title: String,
    #[serde(default)]
    pub wikidata_id: Option<String>,
}
