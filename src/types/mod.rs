//! Public types exposed by the `mosaico-core` crate.

pub mod common;
pub mod options;
pub mod query;

pub use common::{AnnotationId, CharSpan, Language, LinkId, PageId, RecordId};
pub use options::{FileStoreOptions, MosaicoConfig, MosaicoConfigBuilder};
pub use query::{Condition, Filter, PageQuery, PageSummary};
