use pcs_protocol::constants::{MAX_BLOCKS, MIN_BLOCKS};
use serde::Serialize;

use crate::TransferError;

/// Checks that `count` digests can be merged into one file.
pub fn validate_block_count(count: usize) -> Result<(), TransferError> {
    if (MIN_BLOCKS..=MAX_BLOCKS).contains(&count) {
        Ok(())
    } else {
        Err(TransferError::InvalidBlockCount(count))
    }
}

/// Ordered block digests for a superfile merge, 2..=1024 entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockList(Vec<String>);

/// `param` body of `createsuperfile`: `{"block_list":[...]}`.
#[derive(Serialize)]
struct MergeParam<'a> {
    block_list: &'a [String],
}

impl BlockList {
    pub fn new(digests: Vec<String>) -> Result<Self, TransferError> {
        validate_block_count(digests.len())?;
        if let Some(index) = digests.iter().position(|d| d.is_empty()) {
            return Err(TransferError::MissingBlock(index));
        }
        Ok(Self(digests))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }

    /// JSON value for the merge request's `param` field.
    pub fn to_param(&self) -> String {
        // Serializing a slice of strings cannot fail.
        serde_json::to_string(&MergeParam {
            block_list: &self.0,
        })
        .unwrap_or_default()
    }
}

/// Digest slots filled as chunks complete, possibly out of order.
///
/// Slot `i` always holds the digest of chunk `i`, so the final list follows
/// file order regardless of completion order.
#[derive(Debug, Clone)]
pub struct BlockSlots {
    slots: Vec<Option<String>>,
}

impl BlockSlots {
    pub fn with_len(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    /// Stores the digest of chunk `index`, replacing any earlier value.
    pub fn record(&mut self, index: usize, md5: String) -> Result<(), TransferError> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(TransferError::BlockOutOfRange { index, len })?;
        *slot = Some(md5);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of slots holding a digest.
    pub fn completed(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Converts the filled slots into a merge-ready list.
    pub fn finish(self) -> Result<BlockList, TransferError> {
        let mut digests = Vec::with_capacity(self.slots.len());
        for (index, slot) in self.slots.into_iter().enumerate() {
            digests.push(slot.ok_or(TransferError::MissingBlock(index))?);
        }
        BlockList::new(digests)
    }
}
