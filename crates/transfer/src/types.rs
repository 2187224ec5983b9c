use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use crate::{BlockList, BlockSlots, ChunkPlan, TransferError};

/// Lifecycle of a block upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// Fingerprinting and planning chunks.
    Chunking,
    /// Chunks are being sent; digests accumulate.
    Uploading,
    /// The superfile merge succeeded.
    Merged,
    Failed,
}

impl BlockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chunking => "chunking",
            Self::Uploading => "uploading",
            Self::Merged => "merged",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Merged | Self::Failed)
    }
}

impl fmt::Display for BlockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of a block upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockProgress {
    pub state: BlockState,
    pub total_bytes: u64,
    pub uploaded_bytes: u64,
    pub total_blocks: usize,
    pub uploaded_blocks: usize,
    pub error: Option<String>,
}

impl BlockProgress {
    /// Completion in percent, 0.0 when nothing is expected.
    pub fn percentage(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.uploaded_bytes as f64 / self.total_bytes as f64 * 100.0
    }
}

/// Tracks one block upload (thread-safe).
///
/// Transitions run `Chunking -> Uploading -> Merged`, with `Failed`
/// reachable from any non-terminal state.
pub struct BlockSession {
    inner: RwLock<SessionInner>,
}

struct SessionInner {
    state: BlockState,
    total_bytes: u64,
    uploaded_bytes: u64,
    slots: BlockSlots,
    started_at: Instant,
    finished_at: Option<Instant>,
    error: Option<String>,
}

impl BlockSession {
    pub fn new(total_bytes: u64) -> Self {
        Self {
            inner: RwLock::new(SessionInner {
                state: BlockState::Chunking,
                total_bytes,
                uploaded_bytes: 0,
                slots: BlockSlots::with_len(0),
                started_at: Instant::now(),
                finished_at: None,
                error: None,
            }),
        }
    }

    // A poisoned lock still holds consistent counters; keep going.
    fn read(&self) -> RwLockReadGuard<'_, SessionInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Allocates one digest slot per planned chunk and starts uploading.
    pub fn start_uploading(&self, plan: &ChunkPlan) -> Result<(), TransferError> {
        let mut s = self.write();
        if s.state != BlockState::Chunking {
            return Err(TransferError::InvalidTransition {
                state: s.state,
                action: "start uploading",
            });
        }
        s.slots = BlockSlots::with_len(plan.len());
        s.state = BlockState::Uploading;
        Ok(())
    }

    /// Records the service digest for chunk `index`.
    pub fn record_block(&self, index: usize, md5: String, bytes: u64) -> Result<(), TransferError> {
        let mut s = self.write();
        if s.state != BlockState::Uploading {
            return Err(TransferError::InvalidTransition {
                state: s.state,
                action: "record a block",
            });
        }
        s.slots.record(index, md5)?;
        s.uploaded_bytes += bytes;
        Ok(())
    }

    /// Builds the merge list once every chunk has a digest.
    pub fn block_list(&self) -> Result<BlockList, TransferError> {
        let s = self.read();
        if s.state != BlockState::Uploading {
            return Err(TransferError::InvalidTransition {
                state: s.state,
                action: "build the block list",
            });
        }
        s.slots.clone().finish()
    }

    pub fn mark_merged(&self) -> Result<(), TransferError> {
        let mut s = self.write();
        if s.state != BlockState::Uploading {
            return Err(TransferError::InvalidTransition {
                state: s.state,
                action: "mark merged",
            });
        }
        s.state = BlockState::Merged;
        s.finished_at = Some(Instant::now());
        Ok(())
    }

    /// Marks the session failed. No-op once terminal.
    pub fn fail(&self, reason: &str) {
        let mut s = self.write();
        if s.state.is_terminal() {
            return;
        }
        s.state = BlockState::Failed;
        s.error = Some(reason.to_string());
        s.finished_at = Some(Instant::now());
    }

    pub fn state(&self) -> BlockState {
        self.read().state
    }

    /// Time since the session was created, frozen once terminal.
    pub fn elapsed(&self) -> Duration {
        let s = self.read();
        s.finished_at
            .map_or_else(|| s.started_at.elapsed(), |t| t - s.started_at)
    }

    pub fn progress(&self) -> BlockProgress {
        let s = self.read();
        BlockProgress {
            state: s.state,
            total_bytes: s.total_bytes,
            uploaded_bytes: s.uploaded_bytes,
            total_blocks: s.slots.len(),
            uploaded_blocks: s.slots.completed(),
            error: s.error.clone(),
        }
    }
}
