//! Whole, ranged and streamed downloads.

use std::path::Path;

use bytes::Bytes;
use pcs_protocol::PathOptions;
use pcs_protocol::operation::DOWNLOAD;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::client::Client;
use crate::error::{Context, Error};
use crate::request::ByteRange;
use crate::transport::transport_error;

impl Client {
    /// Downloads a whole file into memory.
    pub async fn download(&self, path: &str) -> Result<Bytes, Error> {
        let req = self.request(DOWNLOAD, &PathOptions::new(path))?;
        self.raw(req).await
    }

    /// Downloads the inclusive byte range `range` of a file.
    pub async fn partial_download(&self, path: &str, range: ByteRange) -> Result<Bytes, Error> {
        let req = self.request(DOWNLOAD, &PathOptions::new(path))?;
        range.validate().map_err(|source| Error::Invalid {
            context: req.context.clone(),
            source,
        })?;
        self.raw(req.with_range(range)).await
    }

    /// Starts a download and returns the response with its body unread.
    ///
    /// Redirects are followed by the transport; a 3xx that is not followed
    /// becomes [`Error::Redirect`].
    pub async fn download_stream(&self, path: &str) -> Result<reqwest::Response, Error> {
        let req = self.request(DOWNLOAD, &PathOptions::new(path))?;
        self.stream_response(req).await
    }

    /// Streams a file to `dest` and returns the number of bytes written.
    pub async fn download_to(&self, path: &str, dest: &Path) -> Result<u64, Error> {
        let context = Context::new(DOWNLOAD).with_target(Some(path));
        let mut resp = self.download_stream(path).await?;
        let expected = resp.content_length();

        let io_err = |source| Error::Io {
            context: context.clone(),
            source,
        };
        let mut file = tokio::fs::File::create(dest).await.map_err(io_err)?;
        let mut written = 0u64;
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| transport_error(&context, e))?
        {
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err)?;

        if let Some(expected) = expected
            && expected != written
        {
            return Err(Error::ShortWrite {
                context,
                path: dest.to_path_buf(),
                expected,
                written,
            });
        }

        debug!(path, bytes = written, dest = %dest.display(), "download complete");
        Ok(written)
    }
}
