//! Concurrent block upload followed by a superfile merge.
//!
//! Chunks are read and uploaded by at most `parallelism` workers. Each
//! digest lands in the [`BlockSession`] slot of its chunk index, so the
//! merge list keeps file order whatever order the uploads finish in.

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{self, StreamExt};
use pcs_client::upload_file_name;
use pcs_protocol::{FileOptions, FileRecord};
use pcs_transfer::{BlockSession, ChunkPlan, ChunkSpan, TransferError, read_chunk};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::UploadBackend;
use crate::error::UploadError;
use crate::types::{EventSink, UploadConfig, UploadEvent};

/// One chunk the service acknowledged.
struct UploadedBlock {
    index: usize,
    md5: String,
    bytes: u64,
}

/// Uploads the chunks of one file and merges them.
pub(crate) struct BlockUploader<'a> {
    backend: &'a dyn UploadBackend,
    config: &'a UploadConfig,
    cancel: CancellationToken,
    events: EventSink,
}

impl<'a> BlockUploader<'a> {
    pub(crate) fn new(
        backend: &'a dyn UploadBackend,
        config: &'a UploadConfig,
        cancel: CancellationToken,
        events: EventSink,
    ) -> Self {
        Self {
            backend,
            config,
            cancel,
            events,
        }
    }

    /// Uploads every chunk of `plan` and merges them at `opts.path`.
    ///
    /// Any failure marks `session` failed. Blocks already uploaded are
    /// left on the service.
    pub(crate) async fn run(
        &self,
        local: &Path,
        opts: &FileOptions,
        plan: &ChunkPlan,
        session: &BlockSession,
    ) -> Result<FileRecord, UploadError> {
        let result = self.upload_and_merge(local, opts, plan, session).await;
        if let Err(e) = &result {
            session.fail(&e.to_string());
        }
        result
    }

    async fn upload_and_merge(
        &self,
        local: &Path,
        opts: &FileOptions,
        plan: &ChunkPlan,
        session: &BlockSession,
    ) -> Result<FileRecord, UploadError> {
        // Reject unmergeable plans before the first chunk goes out.
        plan.validate_for_merge()?;
        session.start_uploading(plan)?;

        let file_name = upload_file_name(local);
        let file_name = file_name.as_str();
        let mut uploads = stream::iter(plan.spans().iter().copied())
            .map(move |span| self.upload_chunk(local, file_name, span))
            .buffer_unordered(self.config.parallelism);

        while let Some(block) = uploads.next().await {
            let block = block?;
            session.record_block(block.index, block.md5, block.bytes)?;

            let progress = session.progress();
            self.events.emit(UploadEvent::BlockUploaded {
                upload_id: self.events.id(),
                index: block.index,
                uploaded_blocks: progress.uploaded_blocks,
                total_blocks: progress.total_blocks,
                uploaded_bytes: progress.uploaded_bytes,
                total_bytes: progress.total_bytes,
            });
        }
        self.check_cancelled()?;

        let blocks = session.block_list()?;
        self.events.emit(UploadEvent::Merging {
            upload_id: self.events.id(),
            blocks: blocks.len(),
        });
        info!(
            upload_id = %self.events.upload_id,
            path = %opts.path,
            blocks = blocks.len(),
            "merging blocks"
        );

        let record = self.backend.create_super_file(opts, &blocks).await?;
        session.mark_merged()?;
        Ok(record)
    }

    /// Reads one chunk and uploads it, retrying retryable failures.
    async fn upload_chunk(
        &self,
        local: &Path,
        file_name: &str,
        span: ChunkSpan,
    ) -> Result<UploadedBlock, UploadError> {
        self.check_cancelled()?;

        let index = span.index;
        let path = local.to_path_buf();
        let chunk = tokio::task::spawn_blocking(move || read_chunk(&path, &span))
            .await
            .map_err(|e| TransferError::Io(std::io::Error::other(e)))
            .and_then(|read| read)
            .map_err(|source| UploadError::ChunkRead { index, source })?;
        let data = Bytes::from(chunk.data);

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let failure = match self.backend.upload_block(file_name, data.clone()).await {
                Ok(receipt) if receipt.md5.eq_ignore_ascii_case(&chunk.md5) => {
                    debug!(
                        upload_id = %self.events.upload_id,
                        block = index,
                        bytes = span.len,
                        attempt,
                        "block uploaded"
                    );
                    return Ok(UploadedBlock {
                        index,
                        md5: chunk.md5,
                        bytes: span.len,
                    });
                }
                Ok(receipt) => UploadError::DigestMismatch {
                    index,
                    local: chunk.md5.clone(),
                    remote: receipt.md5,
                },
                Err(source) if source.is_retryable() => UploadError::ChunkFailed {
                    index,
                    attempts: attempt,
                    source,
                },
                Err(source) => {
                    return Err(UploadError::ChunkFailed {
                        index,
                        attempts: attempt,
                        source,
                    });
                }
            };

            if attempt > self.config.chunk_retries {
                return Err(failure);
            }
            warn!(
                upload_id = %self.events.upload_id,
                block = index,
                attempt,
                error = %failure,
                "block upload failed, retrying"
            );

            let delay = Duration::from_millis(
                self.config
                    .retry_delay_ms
                    .saturating_mul(u64::from(attempt)),
            );
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(UploadError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        Ok(())
    }
}
