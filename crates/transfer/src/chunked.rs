use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use pcs_protocol::constants::MAX_BLOCKS;

use crate::fingerprint::md5_hex;
use crate::{TransferError, validate_block_count};

// ---------------------------------------------------------------------------
// ChunkPlan
// ---------------------------------------------------------------------------

/// Byte range of one chunk within the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Zero-based position in the block list.
    pub index: usize,
    /// Byte offset within the file.
    pub offset: u64,
    /// Length of this chunk in bytes.
    pub len: u64,
}

/// Splits a file of known length into contiguous, ordered chunks.
///
/// The chunk size grows beyond the preferred size when needed so that the
/// plan never holds more than [`MAX_BLOCKS`] chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    file_len: u64,
    chunk_size: u64,
    spans: Vec<ChunkSpan>,
}

impl ChunkPlan {
    /// Plans chunks for a file of `file_len` bytes.
    pub fn new(file_len: u64, preferred_chunk_size: u64) -> Result<Self, TransferError> {
        if preferred_chunk_size == 0 {
            return Err(TransferError::ZeroChunkSize);
        }
        let chunk_size = preferred_chunk_size.max(file_len.div_ceil(MAX_BLOCKS as u64));

        let mut spans = Vec::new();
        let mut offset = 0;
        while offset < file_len {
            let len = chunk_size.min(file_len - offset);
            spans.push(ChunkSpan {
                index: spans.len(),
                offset,
                len,
            });
            offset += len;
        }

        Ok(Self {
            file_len,
            chunk_size,
            spans,
        })
    }

    pub fn spans(&self) -> &[ChunkSpan] {
        &self.spans
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Effective chunk size (every chunk but the last has this length).
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Checks that the plan yields a block list the service can merge.
    pub fn validate_for_merge(&self) -> Result<(), TransferError> {
        validate_block_count(self.spans.len())
    }
}

// ---------------------------------------------------------------------------
// Chunk reading
// ---------------------------------------------------------------------------

/// A chunk read from disk, with its MD5.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub index: usize,
    pub offset: u64,
    pub data: Vec<u8>,
    /// Lowercase hex MD5 of `data`.
    pub md5: String,
}

/// Reads the bytes covered by `span` from `path`.
///
/// The file handle is opened and closed within the call so concurrent
/// workers never share a cursor. Fewer bytes than `span.len` available at
/// `span.offset` fails with [`TransferError::ShortRead`].
pub fn read_chunk(path: &Path, span: &ChunkSpan) -> Result<Chunk, TransferError> {
    let mut file = std::fs::File::open(path)?;
    file.seek(SeekFrom::Start(span.offset))?;

    let mut data = Vec::with_capacity(span.len as usize);
    let actual = (&mut file).take(span.len).read_to_end(&mut data)? as u64;
    if actual != span.len {
        return Err(TransferError::ShortRead {
            path: path.to_path_buf(),
            expected: span.len,
            actual,
        });
    }

    let md5 = md5_hex(&data);
    Ok(Chunk {
        index: span.index,
        offset: span.offset,
        data,
        md5,
    })
}
