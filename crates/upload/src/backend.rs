//! Upload backend trait.
//!
//! The orchestrator only needs the four upload calls. [`pcs_client::Client`]
//! implements them over HTTP; tests substitute in-memory backends.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use bytes::Bytes;
use pcs_client::{Client, Error};
use pcs_protocol::{BlockReceipt, FileOptions, FileRecord, RapidUploadOptions};
use pcs_transfer::BlockList;

/// Boxed future returned by [`UploadBackend`] calls.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'a>>;

/// The remote calls an upload is composed of.
pub trait UploadBackend: Send + Sync {
    /// Sends the whole file in one request.
    fn upload_file<'a>(
        &'a self,
        local: &'a Path,
        opts: &'a FileOptions,
    ) -> BackendFuture<'a, FileRecord>;

    /// Sends one block as a temporary file and returns its digest.
    fn upload_block<'a>(
        &'a self,
        file_name: &'a str,
        data: Bytes,
    ) -> BackendFuture<'a, BlockReceipt>;

    /// Merges previously uploaded blocks, in list order.
    fn create_super_file<'a>(
        &'a self,
        opts: &'a FileOptions,
        blocks: &'a BlockList,
    ) -> BackendFuture<'a, FileRecord>;

    /// Creates a file from a content fingerprint.
    fn rapid_upload<'a>(&'a self, opts: &'a RapidUploadOptions) -> BackendFuture<'a, FileRecord>;
}

impl UploadBackend for Client {
    fn upload_file<'a>(
        &'a self,
        local: &'a Path,
        opts: &'a FileOptions,
    ) -> BackendFuture<'a, FileRecord> {
        Box::pin(Client::upload_file(self, local, opts))
    }

    fn upload_block<'a>(
        &'a self,
        file_name: &'a str,
        data: Bytes,
    ) -> BackendFuture<'a, BlockReceipt> {
        Box::pin(Client::upload_block(self, file_name, data))
    }

    fn create_super_file<'a>(
        &'a self,
        opts: &'a FileOptions,
        blocks: &'a BlockList,
    ) -> BackendFuture<'a, FileRecord> {
        Box::pin(Client::create_super_file(self, opts, blocks))
    }

    fn rapid_upload<'a>(&'a self, opts: &'a RapidUploadOptions) -> BackendFuture<'a, FileRecord> {
        Box::pin(Client::rapid_upload(self, opts))
    }
}
