#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![cfg_attr(
    test,
    allow(
        clippy::useless_vec,
        clippy::uninlined_format_args,
        clippy::float_cmp
    )
)]
#![allow(clippy::module_name_repetitions)]
//
// Documentation: error variants are listed on the store trait and the error enum, not on every
// fallible function.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Vocabulary indices and record sizes are bounded well below the cast limits.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]
//
// Payload enums mirror the stored schema; variant sizes follow the data.
#![allow(clippy::large_enum_variant)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Storage and lazy materialization of richly annotated multilingual Wikipedia pages.
//!
//! A [`Mosaico`] client wraps a [`DocumentStore`]. Pages ([`WikiPage`]) carry their text
//! compressed and their annotations either embedded in the page record or linked as separate
//! records. Annotations are decoded when the page is read, fetched (if linked) on first access and
//! prepared once: preparation resolves spans against the page text and the annotations a kind
//! depends on, then the same prepared value is shared from then on.

/// The mosaico-core crate version (matches `Cargo.toml`).
pub const MOSAICO_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod annotations;
pub mod client;
pub mod codec;
pub mod constants;
pub mod error;
pub mod interlanguage;
pub mod page;
pub mod prepare;
pub mod store;
pub mod types;

pub use annotations::{
    Annotation, AnnotationContainer, AnnotationKind, AnnotationPayload, AnnotationRegistry,
    LinkedAnnotationRecord, PreparedAnnotation, init_registry, registry,
};
pub use client::Mosaico;
pub use codec::{PageText, compress_text, decompress_text};
pub use error::{MosaicoError, Result};
pub use interlanguage::{InterlanguageLink, PageLink};
pub use page::{AnnotationCursor, PageDraft, PageRecord, WikiPage};
pub use prepare::{Prepare, PreparationContext, Prepared};
pub use store::{DocumentStore, FileStore, InMemoryStore};
pub use types::{
    AnnotationId, CharSpan, FileStoreOptions, Filter, Language, LinkId, MosaicoConfig, PageId,
    PageQuery, PageSummary, RecordId,
};

