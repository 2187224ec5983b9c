//! Upload orchestrator.
//!
//! Picks a strategy for each file, runs it against an [`UploadBackend`],
//! reports progress events and supports cancellation.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use pcs_client::{Context, ErrorKind, fingerprint, rapid_options};
use pcs_protocol::constants::MIN_RAPID_UPLOAD_SIZE;
use pcs_protocol::operation::RAPID_UPLOAD;
use pcs_protocol::{FileOptions, FileRecord};
use pcs_transfer::{BlockProgress, BlockSession, ChunkPlan, validate_remote_path};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backend::UploadBackend;
use crate::block::BlockUploader;
use crate::error::UploadError;
use crate::strategy::{Strategy, rapid_eligible, transfer_strategy, tries_rapid};
use crate::types::{EventSink, UploadConfig, UploadEvent, UploadOutcome};

/// Orchestrates uploads of local files.
pub struct UploadOrchestrator {
    config: UploadConfig,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    cancel: CancellationToken,
    session: Mutex<Option<Arc<BlockSession>>>,
}

impl UploadOrchestrator {
    /// Creates an orchestrator after validating `config`.
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        config.validate()?;
        let (events_tx, events_rx) = mpsc::channel(256);
        Ok(Self {
            config,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
            session: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns the cancellation token shared by all uploads of this
    /// orchestrator.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Progress of the most recent block upload, if one ran.
    pub fn block_progress(&self) -> Option<BlockProgress> {
        self.session_slot().as_ref().map(|s| s.progress())
    }

    /// Uploads `local` to `opts.path` using `strategy`.
    pub async fn upload(
        &self,
        backend: &dyn UploadBackend,
        local: &Path,
        opts: &FileOptions,
        strategy: Strategy,
    ) -> Result<UploadOutcome, UploadError> {
        let events = EventSink::new(Uuid::new_v4().to_string(), self.events_tx.clone());

        match self.run(backend, local, opts, strategy, &events).await {
            Ok((record, used)) => {
                info!(
                    upload_id = %events.upload_id,
                    path = %record.path,
                    strategy = %used,
                    bytes = record.size,
                    "upload completed"
                );
                events.emit(UploadEvent::Completed {
                    upload_id: events.id(),
                    strategy: used,
                    record: record.clone(),
                });
                Ok(UploadOutcome {
                    upload_id: events.id(),
                    record,
                    strategy: used,
                })
            }
            Err(e) => {
                error!(
                    upload_id = %events.upload_id,
                    path = %opts.path,
                    error = %e,
                    "upload failed"
                );
                events.emit(UploadEvent::Failed {
                    upload_id: events.id(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        backend: &dyn UploadBackend,
        local: &Path,
        opts: &FileOptions,
        strategy: Strategy,
        events: &EventSink,
    ) -> Result<(FileRecord, Strategy), UploadError> {
        self.check_cancelled()?;
        validate_remote_path(&opts.path)?;
        let len = tokio::fs::metadata(local).await?.len();

        events.emit(UploadEvent::Started {
            upload_id: events.id(),
            local: local.to_path_buf(),
            remote: opts.path.clone(),
            total_bytes: len,
        });
        debug!(
            upload_id = %events.upload_id,
            local = %local.display(),
            path = %opts.path,
            bytes = len,
            requested = %strategy,
            "upload started"
        );

        if tries_rapid(strategy, len, &self.config) {
            if !rapid_eligible(len) {
                return Err(UploadError::RapidIneligible {
                    len,
                    min: MIN_RAPID_UPLOAD_SIZE,
                });
            }
            self.select(events, Strategy::Rapid);

            let context = Context::new(RAPID_UPLOAD).with_target(Some(&opts.path));
            let digests = fingerprint(&context, local).await?;
            events.emit(UploadEvent::Fingerprinted {
                upload_id: events.id(),
                fingerprint: digests.clone(),
            });
            self.check_cancelled()?;

            match backend.rapid_upload(&rapid_options(opts, &digests)).await {
                Ok(record) => return Ok((record, Strategy::Rapid)),
                // The service does not hold this content.
                Err(e) if strategy == Strategy::Auto && e.kind() == ErrorKind::Api => {
                    warn!(
                        upload_id = %events.upload_id,
                        path = %opts.path,
                        error = %e,
                        "rapid upload missed, falling back"
                    );
                    events.emit(UploadEvent::RapidMiss {
                        upload_id: events.id(),
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }

        let chosen = transfer_strategy(strategy, len, &self.config);
        self.select(events, chosen);
        self.check_cancelled()?;

        let record = match chosen {
            Strategy::Block => self.upload_blocks(backend, local, opts, len, events).await?,
            _ => backend.upload_file(local, opts).await?,
        };
        Ok((record, chosen))
    }

    async fn upload_blocks(
        &self,
        backend: &dyn UploadBackend,
        local: &Path,
        opts: &FileOptions,
        len: u64,
        events: &EventSink,
    ) -> Result<FileRecord, UploadError> {
        let session = Arc::new(BlockSession::new(len));
        *self.session_slot() = Some(session.clone());

        let plan = match ChunkPlan::new(len, self.config.chunk_size) {
            Ok(plan) => plan,
            Err(e) => {
                session.fail(&e.to_string());
                return Err(e.into());
            }
        };
        debug!(
            upload_id = %events.upload_id,
            blocks = plan.len(),
            chunk_size = plan.chunk_size(),
            "chunk plan ready"
        );

        BlockUploader::new(backend, &self.config, self.cancel.clone(), events.clone())
            .run(local, opts, &plan, &session)
            .await
    }

    fn select(&self, events: &EventSink, strategy: Strategy) {
        info!(upload_id = %events.upload_id, %strategy, "strategy selected");
        events.emit(UploadEvent::StrategySelected {
            upload_id: events.id(),
            strategy,
        });
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }
        Ok(())
    }

    fn session_slot(&self) -> MutexGuard<'_, Option<Arc<BlockSession>>> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }
}
