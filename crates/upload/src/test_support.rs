//! In-memory upload backend for orchestrator tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use pcs_client::{ApiError, Context, Error};
use pcs_protocol::operation::{RAPID_UPLOAD, UPLOAD_BLOCK};
use pcs_protocol::{BlockReceipt, FileOptions, FileRecord, RapidUploadOptions};
use pcs_transfer::{BlockList, md5_hex};
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendFuture, UploadBackend};
use crate::types::UploadConfig;

/// Small chunks, fast retries.
pub fn test_config(chunk_size: u64) -> UploadConfig {
    UploadConfig {
        chunk_size,
        parallelism: 3,
        chunk_retries: 2,
        retry_delay_ms: 1,
        block_threshold: chunk_size,
        rapid_upload: true,
    }
}

/// Writes `chunks * chunk_size` bytes where chunk `i` is filled with byte `i`.
pub fn write_marked_file(dir: &Path, chunks: usize, chunk_size: usize) -> PathBuf {
    let data: Vec<u8> = (0..chunks)
        .flat_map(|i| std::iter::repeat_n(i as u8, chunk_size))
        .collect();
    let path = dir.join("source.bin");
    std::fs::write(&path, data).unwrap();
    path
}

pub fn api_error(context: Context, status: u16, code: i64) -> Error {
    Error::Api {
        context,
        error: ApiError {
            status,
            message: None,
            code: Some(code),
            body: String::new(),
        },
    }
}

/// What the backend was asked to do.
#[derive(Debug, Default, Clone)]
pub struct MockState {
    pub direct_uploads: usize,
    /// First byte of each block upload attempt, in call order.
    pub block_uploads: Vec<u8>,
    pub merges: Vec<Vec<String>>,
    pub rapid_calls: Vec<RapidUploadOptions>,
    pub in_flight: usize,
    pub max_in_flight: usize,
    /// Marker byte -> (remaining failures, status).
    failures: HashMap<u8, (u32, u16)>,
}

#[derive(Default)]
pub struct MockBackend {
    state: Mutex<MockState>,
    rapid_hit: bool,
    reverse_delays: bool,
    wrong_digests: bool,
    cancel_after: Option<(usize, CancellationToken)>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rapid_hit(mut self) -> Self {
        self.rapid_hit = true;
        self
    }

    /// Blocks with higher marker bytes answer sooner.
    pub fn with_reverse_delays(mut self) -> Self {
        self.reverse_delays = true;
        self
    }

    pub fn with_wrong_digests(mut self) -> Self {
        self.wrong_digests = true;
        self
    }

    pub fn failing_block(self, marker: u8, times: u32, status: u16) -> Self {
        self.lock().failures.insert(marker, (times, status));
        self
    }

    pub fn cancel_after_blocks(mut self, blocks: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((blocks, token));
        self
    }

    pub fn state(&self) -> MockState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

impl UploadBackend for MockBackend {
    fn upload_file<'a>(
        &'a self,
        local: &'a Path,
        opts: &'a FileOptions,
    ) -> BackendFuture<'a, FileRecord> {
        Box::pin(async move {
            let data = tokio::fs::read(local).await.unwrap();
            self.lock().direct_uploads += 1;
            Ok(FileRecord {
                path: opts.path.clone(),
                size: data.len() as u64,
                md5: md5_hex(&data),
                ..Default::default()
            })
        })
    }

    fn upload_block<'a>(
        &'a self,
        _file_name: &'a str,
        data: Bytes,
    ) -> BackendFuture<'a, BlockReceipt> {
        Box::pin(async move {
            let marker = data.first().copied().unwrap_or_default();
            {
                let mut s = self.lock();
                s.block_uploads.push(marker);
                s.in_flight += 1;
                s.max_in_flight = s.max_in_flight.max(s.in_flight);
            }

            let delay = if self.reverse_delays {
                5 * 20u64.saturating_sub(u64::from(marker))
            } else {
                1
            };
            tokio::time::sleep(Duration::from_millis(delay)).await;

            let failure = {
                let mut s = self.lock();
                s.in_flight -= 1;
                match s.failures.get_mut(&marker) {
                    Some((remaining, status)) if *remaining > 0 => {
                        *remaining -= 1;
                        Some(*status)
                    }
                    _ => None,
                }
            };
            if let Some(status) = failure {
                return Err(api_error(Context::new(UPLOAD_BLOCK), status, 31000));
            }

            if let Some((blocks, token)) = &self.cancel_after
                && self.lock().block_uploads.len() >= *blocks
            {
                token.cancel();
            }

            let md5 = if self.wrong_digests {
                "0".repeat(32)
            } else {
                md5_hex(&data)
            };
            Ok(BlockReceipt { md5, request_id: 1 })
        })
    }

    fn create_super_file<'a>(
        &'a self,
        opts: &'a FileOptions,
        blocks: &'a BlockList,
    ) -> BackendFuture<'a, FileRecord> {
        Box::pin(async move {
            self.lock().merges.push(blocks.as_slice().to_vec());
            Ok(FileRecord {
                path: opts.path.clone(),
                ..Default::default()
            })
        })
    }

    fn rapid_upload<'a>(&'a self, opts: &'a RapidUploadOptions) -> BackendFuture<'a, FileRecord> {
        Box::pin(async move {
            self.lock().rapid_calls.push(opts.clone());
            if !self.rapid_hit {
                let context = Context::new(RAPID_UPLOAD).with_target(Some(&opts.path));
                return Err(api_error(context, 404, 31079));
            }
            Ok(FileRecord {
                path: opts.path.clone(),
                size: opts.content_length,
                md5: opts.content_md5.clone(),
                ..Default::default()
            })
        })
    }
}
