//! Data types for the upload flow.

use std::path::PathBuf;

use pcs_protocol::FileRecord;
use pcs_transfer::{ContentFingerprint, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::UploadError;
use crate::strategy::Strategy;

/// Tuning for uploads, loaded from the `[upload]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Preferred block size in bytes; grows for very large files.
    pub chunk_size: u64,
    /// Blocks in flight at once.
    pub parallelism: usize,
    /// Retries per block after the first attempt.
    pub chunk_retries: u32,
    /// Base retry delay; attempt `n` waits `n * retry_delay_ms`.
    pub retry_delay_ms: u64,
    /// Files larger than this use block upload under `Auto`.
    pub block_threshold: u64,
    /// Whether `Auto` tries a rapid upload first.
    pub rapid_upload: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallelism: 4,
            chunk_retries: 3,
            retry_delay_ms: 500,
            block_threshold: 4 * DEFAULT_CHUNK_SIZE,
            rapid_upload: true,
        }
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Result<(), UploadError> {
        if self.chunk_size == 0 {
            return Err(UploadError::InvalidConfig(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if self.parallelism == 0 {
            return Err(UploadError::InvalidConfig(
                "parallelism must be greater than zero".into(),
            ));
        }
        if self.block_threshold < self.chunk_size {
            return Err(UploadError::InvalidConfig(format!(
                "block_threshold ({}) must not be below chunk_size ({})",
                self.block_threshold, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Progress event emitted during an upload.
#[derive(Debug, Clone)]
pub enum UploadEvent {
    Started {
        upload_id: String,
        local: PathBuf,
        remote: String,
        total_bytes: u64,
    },
    /// A strategy is about to run. Emitted again after a rapid-upload miss.
    StrategySelected {
        upload_id: String,
        strategy: Strategy,
    },
    Fingerprinted {
        upload_id: String,
        fingerprint: ContentFingerprint,
    },
    /// The service does not hold the content; falling back.
    RapidMiss { upload_id: String, error: String },
    BlockUploaded {
        upload_id: String,
        index: usize,
        uploaded_blocks: usize,
        total_blocks: usize,
        uploaded_bytes: u64,
        total_bytes: u64,
    },
    Merging { upload_id: String, blocks: usize },
    Completed {
        upload_id: String,
        strategy: Strategy,
        record: FileRecord,
    },
    Failed { upload_id: String, error: String },
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub upload_id: String,
    /// Remote record of the uploaded file, whichever strategy ran.
    pub record: FileRecord,
    /// The strategy that produced `record` (never `Auto`).
    pub strategy: Strategy,
}

/// Sends events for one upload id.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    pub upload_id: String,
    tx: mpsc::Sender<UploadEvent>,
}

impl EventSink {
    pub fn new(upload_id: String, tx: mpsc::Sender<UploadEvent>) -> Self {
        Self { upload_id, tx }
    }

    pub fn id(&self) -> String {
        self.upload_id.clone()
    }

    // Never stall the upload on a listener that is slow or absent.
    pub fn emit(&self, event: UploadEvent) {
        let _ = self.tx.try_send(event);
    }
}
