//! Upload error types.

use pcs_transfer::TransferError;

/// Errors produced while orchestrating an upload.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error(transparent)]
    Client(#[from] pcs_client::Error),

    #[error("transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("block {index} failed after {attempts} attempt(s): {source}")]
    ChunkFailed {
        index: usize,
        attempts: u32,
        #[source]
        source: pcs_client::Error,
    },

    #[error("block {index}: reading chunk failed: {source}")]
    ChunkRead {
        index: usize,
        #[source]
        source: TransferError,
    },

    #[error("block {index}: service digest {remote} does not match local digest {local}")]
    DigestMismatch {
        index: usize,
        local: String,
        remote: String,
    },

    #[error("rapid upload needs more than {min} bytes, got {len}")]
    RapidIneligible { len: u64, min: u64 },

    #[error("invalid upload configuration: {0}")]
    InvalidConfig(String),

    #[error("cancelled")]
    Cancelled,
}

impl UploadError {
    /// Rejected before any request was sent.
    pub fn is_local_rejection(&self) -> bool {
        match self {
            UploadError::RapidIneligible { .. } | UploadError::InvalidConfig(_) => true,
            UploadError::Transfer(e) => e.is_validation(),
            UploadError::Client(e) => e.kind() == pcs_client::ErrorKind::Validation,
            _ => false,
        }
    }

    /// Index of the chunk that failed, for chunk-level failures.
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            UploadError::ChunkFailed { index, .. }
            | UploadError::ChunkRead { index, .. }
            | UploadError::DigestMismatch { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// The client error behind this failure, if any.
    pub fn client_error(&self) -> Option<&pcs_client::Error> {
        match self {
            UploadError::Client(e) | UploadError::ChunkFailed { source: e, .. } => Some(e),
            _ => None,
        }
    }
}
