//! Builder-style configuration for the client and the bundled stores.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_RECORD_BYTES, DEFAULT_TEXT_COMPRESSION_LEVEL};

fn default_compression_level() -> i32 {
    DEFAULT_TEXT_COMPRESSION_LEVEL
}

fn default_max_record_bytes() -> usize {
    DEFAULT_MAX_RECORD_BYTES
}

fn default_true() -> bool {
    true
}

/// Client configuration. Every field has a default, so a partial JSON document is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MosaicoConfig {
    /// zstd level used to compress page text.
    /// - 0: stored as a plain zstd frame at the library default level
    /// - 3: default
    /// - 19: smallest records, slowest ingestion
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
    /// Upper bound on a single linked-annotation fetch. `None` waits for the store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch_timeout_ms: Option<u64>,
    /// Largest record the bundled stores accept.
    #[serde(default = "default_max_record_bytes")]
    pub max_record_bytes: usize,
}

impl Default for MosaicoConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
            fetch_timeout_ms: None,
            max_record_bytes: default_max_record_bytes(),
        }
    }
}

impl MosaicoConfig {
    /// Start a fluent builder for `MosaicoConfig`.
    #[must_use]
    pub fn builder() -> MosaicoConfigBuilder {
        MosaicoConfigBuilder::default()
    }

    #[must_use]
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, Default)]
pub struct MosaicoConfigBuilder {
    inner: MosaicoConfig,
}

impl MosaicoConfigBuilder {
    #[must_use]
    pub fn compression_level(mut self, level: i32) -> Self {
        self.inner.compression_level = level;
        self
    }

    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.inner.fetch_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn max_record_bytes(mut self, bytes: usize) -> Self {
        self.inner.max_record_bytes = bytes;
        self
    }

    #[must_use]
    pub fn build(self) -> MosaicoConfig {
        self.inner
    }
}

/// Options for the journal-backed [`FileStore`](crate::store::FileStore).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStoreOptions {
    /// fsync after every journal append.
    /// - true (default): every acknowledged write survives a crash
    /// - false: faster bulk loads; call `FileStore::flush` when done
    #[serde(default = "default_true")]
    pub sync_writes: bool,
    #[serde(default = "default_max_record_bytes")]
    pub max_record_bytes: usize,
}

impl Default for FileStoreOptions {
    fn default() -> Self {
        Self {
            sync_writes: true,
            max_record_bytes: default_max_record_bytes(),
        }
    }
}
