//! Page text compression and character-span slicing.

use std::io::Cursor;
use std::ops::Range;
use std::sync::Arc;

use crate::error::{MosaicoError, Result};
use crate::types::CharSpan;

/// Compress page text with zstd at `level`.
pub fn compress_text(text: &str, level: i32) -> Result<Vec<u8>> {
    Ok(zstd::encode_all(Cursor::new(text.as_bytes()), level)?)
}

/// Inverse of [`compress_text`]. Any failure means the stored record is corrupt.
pub fn decompress_text(compressed: &[u8]) -> Result<PageText> {
    let bytes = zstd::decode_all(Cursor::new(compressed)).map_err(|err| {
        MosaicoError::CorruptText {
            reason: err.to_string(),
        }
    })?;
    let text = String::from_utf8(bytes).map_err(|err| MosaicoError::CorruptText {
        reason: err.to_string(),
    })?;
    Ok(PageText::new(text))
}

/// Decompressed page text, shared cheaply between a page and everything prepared from it.
///
/// Annotation spans count characters, not bytes; non-ASCII texts carry a char-to-byte table so
/// that slicing stays O(1).
#[derive(Debug, Clone)]
pub struct PageText {
    text: Arc<str>,
    // byte offset of every char boundary, including the final one; `None` for ASCII text
    boundaries: Option<Arc<[usize]>>,
}

impl PageText {
    pub fn new<S: Into<Arc<str>>>(text: S) -> Self {
        let text: Arc<str> = text.into();
        let boundaries = if text.is_ascii() {
            None
        } else {
            let mut offsets: Vec<usize> = text.char_indices().map(|(offset, _)| offset).collect();
            offsets.push(text.len());
            Some(Arc::from(offsets))
        };
        Self { text, boundaries }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        match &self.boundaries {
            Some(offsets) => offsets.len() - 1,
            None => self.text.len(),
        }
    }

    pub fn byte_range(&self, span: CharSpan) -> Result<Range<usize>> {
        let len = self.char_len();
        if span.start > span.end || span.end > len {
            return Err(MosaicoError::SpanOutOfBounds {
                start: span.start,
                end: span.end,
                len,
            });
        }
        Ok(match &self.boundaries {
            Some(offsets) => offsets[span.start]..offsets[span.end],
            None => span.start..span.end,
        })
    }

    pub fn slice(&self, span: CharSpan) -> Result<&str> {
        let range = self.byte_range(span)?;
        Ok(&self.text[range])
    }

    /// Slice by a byte range previously produced by [`PageText::byte_range`].
    pub(crate) fn bytes(&self, range: &Range<usize>) -> &str {
        self.text.get(range.clone()).unwrap_or_default()
    }
}

impl PartialEq for PageText {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for PageText {}
