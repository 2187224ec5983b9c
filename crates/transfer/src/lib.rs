//! Local side of PCS uploads: fingerprints, chunks and block lists.
//!
//! Nothing in this crate touches the network. It turns a local file into
//! the digests the service checks for rapid upload, splits large files
//! into ordered chunks, and keeps the block digest list in chunk order
//! until the merge request is sent.

mod blocklist;
mod chunked;
mod fingerprint;
mod types;
mod validation;

use std::path::PathBuf;

pub use blocklist::{BlockList, BlockSlots, validate_block_count};
pub use chunked::{Chunk, ChunkPlan, ChunkSpan, read_chunk};
pub use fingerprint::{ContentFingerprint, fingerprint_bytes, fingerprint_file, md5_hex};
pub use types::{BlockProgress, BlockSession, BlockState};
pub use validation::validate_remote_path;

/// Default chunk size for block uploads: 4 MiB.
///
/// Files larger than `DEFAULT_CHUNK_SIZE * 1024` get proportionally larger
/// chunks so the block list never exceeds the merge limit.
pub const DEFAULT_CHUNK_SIZE: u64 = 4 * 1024 * 1024;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("short read from {}: expected {expected} bytes, got {actual}", .path.display())]
    ShortRead {
        path: PathBuf,
        expected: u64,
        actual: u64,
    },

    #[error("invalid remote path: {0}")]
    InvalidPath(String),

    #[error("block list must hold between 2 and 1024 digests, got {0}")]
    InvalidBlockCount(usize),

    #[error("block {index} out of range for {len} blocks")]
    BlockOutOfRange { index: usize, len: usize },

    #[error("block {0} has no digest")]
    MissingBlock(usize),

    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("cannot {action} while block upload is {state}")]
    InvalidTransition {
        state: BlockState,
        action: &'static str,
    },
}

impl TransferError {
    /// Fewer bytes than expected were read; usually transient.
    pub fn is_short_io(&self) -> bool {
        matches!(self, TransferError::ShortRead { .. })
    }

    /// Rejected locally before any network call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TransferError::InvalidPath(_)
                | TransferError::InvalidBlockCount(_)
                | TransferError::BlockOutOfRange { .. }
                | TransferError::MissingBlock(_)
                | TransferError::ZeroChunkSize
        )
    }
}
