//! Append-only journal of checksummed records.
//!
//! File layout: an 8 byte header (`MSJ\0`, format version, 2 reserved bytes) followed by records.
//! Each record header: [seq: u64][len: u32][reserved: 4 bytes][blake3 checksum: 32 bytes].

use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

use crate::constants::{JOURNAL_MAGIC, JOURNAL_VERSION};
use crate::error::{MosaicoError, Result};

const FILE_HEADER_SIZE: u64 = 8;
const ENTRY_HEADER_SIZE: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalRecord {
    pub sequence: u64,
    pub payload: Vec<u8>,
}

#[derive(Debug)]
pub struct Journal {
    file: File,
    write_head: u64,
    sequence: u64,
    sync_writes: bool,
}

impl Journal {
    /// Open the journal in `file`, writing a fresh header into an empty file, and return every
    /// intact record. A torn record at the tail (crash during append) is cut off; a checksum
    /// mismatch anywhere is reported as corruption.
    pub fn open(mut file: File, sync_writes: bool) -> Result<(Self, Vec<JournalRecord>)> {
        let len = file.metadata()?.len();
        if len == 0 {
            let mut header = [0u8; FILE_HEADER_SIZE as usize];
            header[..4].copy_from_slice(&JOURNAL_MAGIC);
            header[4..6].copy_from_slice(&JOURNAL_VERSION.to_le_bytes());
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&header)?;
            file.sync_all()?;
        } else {
            Self::check_header(&mut file, len)?;
        }

        let len = file.metadata()?.len();
        let (records, next_head) = Self::scan_records(&mut file, len)?;
        if next_head < len {
            tracing::warn!(
                journal.valid_bytes = next_head,
                journal.file_bytes = len,
                "truncating torn journal tail"
            );
            file.set_len(next_head)?;
            file.sync_all()?;
        }
        let sequence = records.last().map_or(0, |record| record.sequence);
        tracing::debug!(
            journal.records = records.len(),
            journal.sequence = sequence,
            "journal opened"
        );
        Ok((
            Self {
                file,
                write_head: next_head,
                sequence,
                sync_writes,
            },
            records,
        ))
    }

    fn check_header(file: &mut File, len: u64) -> Result<()> {
        if len < FILE_HEADER_SIZE {
            return Err(MosaicoError::JournalCorruption {
                offset: 0,
                reason: "file shorter than journal header".into(),
            });
        }
        let mut header = [0u8; FILE_HEADER_SIZE as usize];
        file.seek(SeekFrom::Start(0))?;
        file.read_exact(&mut header)?;
        if header[..4] != JOURNAL_MAGIC {
            return Err(MosaicoError::JournalCorruption {
                offset: 0,
                reason: "bad journal magic".into(),
            });
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != JOURNAL_VERSION {
            return Err(MosaicoError::JournalCorruption {
                offset: 4,
                reason: format!("unsupported journal version {version:#06x}"),
            });
        }
        Ok(())
    }

    pub fn append(&mut self, payload: &[u8]) -> Result<u64> {
        let length = u32::try_from(payload.len()).map_err(|_| MosaicoError::RecordTooLarge {
            collection: "journal",
            size: payload.len(),
            limit: u32::MAX as usize,
        })?;
        let next_sequence = self.sequence + 1;
        let digest = blake3::hash(payload);
        let mut header = [0u8; ENTRY_HEADER_SIZE];
        header[..8].copy_from_slice(&next_sequence.to_le_bytes());
        header[8..12].copy_from_slice(&length.to_le_bytes());
        header[16..48].copy_from_slice(digest.as_bytes());

        // header and payload go out in a single write
        let mut combined = Vec::with_capacity(ENTRY_HEADER_SIZE + payload.len());
        combined.extend_from_slice(&header);
        combined.extend_from_slice(payload);

        tracing::debug!(
            journal.write_head = self.write_head,
            journal.sequence = next_sequence,
            journal.payload_len = payload.len(),
            "journal append"
        );
        self.file.seek(SeekFrom::Start(self.write_head))?;
        self.file.write_all(&combined)?;
        if self.sync_writes {
            self.file.sync_all()?;
        }

        self.write_head += combined.len() as u64;
        self.sequence = next_sequence;
        Ok(self.sequence)
    }

    /// Force an fsync; needed after appends made with `sync_writes` off.
    pub fn flush(&mut self) -> Result<()> {
        self.file.sync_all().map_err(Into::into)
    }

    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    fn scan_records(file: &mut File, len: u64) -> Result<(Vec<JournalRecord>, u64)> {
        let mut records = Vec::new();
        let mut cursor = FILE_HEADER_SIZE;
        while cursor + ENTRY_HEADER_SIZE as u64 <= len {
            file.seek(SeekFrom::Start(cursor))?;
            let mut header = [0u8; ENTRY_HEADER_SIZE];
            file.read_exact(&mut header)?;

            let mut sequence_bytes = [0u8; 8];
            sequence_bytes.copy_from_slice(&header[..8]);
            let sequence = u64::from_le_bytes(sequence_bytes);
            let mut length_bytes = [0u8; 4];
            length_bytes.copy_from_slice(&header[8..12]);
            let length = u64::from(u32::from_le_bytes(length_bytes));
            let checksum = &header[16..48];

            if cursor + ENTRY_HEADER_SIZE as u64 + length > len {
                break;
            }
            let expected_sequence = records.last().map_or(1, |r: &JournalRecord| r.sequence + 1);
            if sequence != expected_sequence {
                tracing::error!(
                    journal.offset = cursor,
                    journal.sequence = sequence,
                    journal.expected = expected_sequence,
                    "journal sequence gap"
                );
                return Err(MosaicoError::JournalCorruption {
                    offset: cursor,
                    reason: format!("expected sequence {expected_sequence}, found {sequence}"),
                });
            }

            let length_usize =
                usize::try_from(length).map_err(|_| MosaicoError::JournalCorruption {
                    offset: cursor,
                    reason: "journal record length too large for platform".into(),
                })?;
            let mut payload = vec![0u8; length_usize];
            file.read_exact(&mut payload)?;
            if blake3::hash(&payload).as_bytes() != checksum {
                tracing::error!(
                    journal.offset = cursor,
                    journal.sequence = sequence,
                    "journal checksum mismatch"
                );
                return Err(MosaicoError::JournalCorruption {
                    offset: cursor,
                    reason: "journal record checksum mismatch".into(),
                });
            }

            records.push(JournalRecord { sequence, payload });
            cursor += ENTRY_HEADER_SIZE as u64 + length;
        }
        Ok((records, cursor))
    }
}
