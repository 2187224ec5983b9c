//! Direct, block, merge and rapid uploads.

use std::path::Path;

use bytes::Bytes;
use pcs_protocol::constants::{MIN_RAPID_UPLOAD_SIZE, PARAM_JSON};
use pcs_protocol::operation::{CREATE_SUPER_FILE, RAPID_UPLOAD, UPLOAD_BLOCK, UPLOAD_FILE};
use pcs_protocol::options::BlockOptions;
use pcs_protocol::{BlockReceipt, FileOptions, FileRecord, RapidUploadOptions};
use pcs_transfer::{BlockList, ContentFingerprint, fingerprint_file};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info};

use crate::client::Client;
use crate::error::{Context, Error};

impl Client {
    /// Uploads a local file in a single multipart request.
    ///
    /// The file length is taken when the file is opened; reading a
    /// different number of bytes fails with [`Error::ShortWrite`] before
    /// anything is sent.
    pub async fn upload_file(&self, local: &Path, opts: &FileOptions) -> Result<FileRecord, Error> {
        let req = self.request(UPLOAD_FILE, opts)?;
        let (file_name, data) = read_upload_body(&req.context, local).await?;
        debug!(path = %opts.path, bytes = data.len(), "direct upload");
        self.json(req.with_multipart(file_name, data)).await
    }

    /// Uploads one chunk as a temporary block and returns its digest.
    pub async fn upload_block(&self, file_name: &str, data: Bytes) -> Result<BlockReceipt, Error> {
        let req = self.request(UPLOAD_BLOCK, &BlockOptions)?;
        self.json(req.with_multipart(file_name, data)).await
    }

    /// Merges uploaded blocks into one file at `opts.path`.
    ///
    /// Sending the same list to the same path again is safe.
    pub async fn create_super_file(
        &self,
        opts: &FileOptions,
        blocks: &BlockList,
    ) -> Result<FileRecord, Error> {
        let req = self.request(CREATE_SUPER_FILE, opts)?;
        debug!(path = %opts.path, blocks = blocks.len(), "merging blocks");
        self.json(req.with_form(vec![(PARAM_JSON, blocks.to_param())]))
            .await
    }

    /// Like [`create_super_file`](Self::create_super_file), checking the
    /// digest count locally first.
    pub async fn merge_blocks(
        &self,
        opts: &FileOptions,
        digests: Vec<String>,
    ) -> Result<FileRecord, Error> {
        let blocks = BlockList::new(digests).map_err(|source| Error::Transfer {
            context: Context::new(CREATE_SUPER_FILE).with_target(Some(&opts.path)),
            source,
        })?;
        self.create_super_file(opts, &blocks).await
    }

    /// Creates a file from a fingerprint of content the service already
    /// holds. Content of 256 KiB or less is rejected without a request.
    pub async fn rapid_upload(&self, opts: &RapidUploadOptions) -> Result<FileRecord, Error> {
        let req = self.request(RAPID_UPLOAD, opts)?;
        let record: FileRecord = self.json(req).await?;
        info!(path = %opts.path, bytes = opts.content_length, "rapid upload matched");
        Ok(record)
    }

    /// Fingerprints `local` and attempts a rapid upload of it.
    pub async fn rapid_upload_file(
        &self,
        local: &Path,
        opts: &FileOptions,
    ) -> Result<FileRecord, Error> {
        let context = Context::new(RAPID_UPLOAD).with_target(Some(&opts.path));
        let len = tokio::fs::metadata(local)
            .await
            .map_err(|source| Error::Io {
                context: context.clone(),
                source,
            })?
            .len();
        if len <= MIN_RAPID_UPLOAD_SIZE {
            return Err(Error::invalid(
                &context,
                format!("rapid upload needs more than {MIN_RAPID_UPLOAD_SIZE} bytes, got {len}"),
            ));
        }

        let fp = fingerprint(&context, local).await?;
        self.rapid_upload(&rapid_options(opts, &fp)).await
    }
}

/// Builds rapid-upload parameters from a fingerprint.
pub fn rapid_options(opts: &FileOptions, fp: &ContentFingerprint) -> RapidUploadOptions {
    RapidUploadOptions {
        path: opts.path.clone(),
        content_length: fp.length,
        content_md5: fp.whole_md5.clone(),
        slice_md5: fp.slice_md5.clone(),
        content_crc32: fp.crc32,
        ondup: opts.ondup,
    }
}

/// Fingerprints a file on the blocking pool.
pub async fn fingerprint(context: &Context, local: &Path) -> Result<ContentFingerprint, Error> {
    let path = local.to_path_buf();
    tokio::task::spawn_blocking(move || fingerprint_file(&path))
        .await
        .map_err(|e| Error::Io {
            context: context.clone(),
            source: std::io::Error::other(e),
        })?
        .map_err(|source| Error::Transfer {
            context: context.clone(),
            source,
        })
}

/// Reads the whole file for a multipart body, checking its length.
async fn read_upload_body(context: &Context, local: &Path) -> Result<(String, Bytes), Error> {
    let file = tokio::fs::File::open(local)
        .await
        .map_err(|source| Error::Io {
            context: context.clone(),
            source,
        })?;
    let expected = file
        .metadata()
        .await
        .map_err(|source| Error::Io {
            context: context.clone(),
            source,
        })?
        .len();
    let data = read_exact_len(context, local, file, expected).await?;
    Ok((upload_file_name(local), data))
}

/// Reads exactly `expected` bytes from `reader`, failing with
/// [`Error::ShortWrite`] when it ends early.
async fn read_exact_len(
    context: &Context,
    local: &Path,
    reader: impl AsyncRead + Unpin,
    expected: u64,
) -> Result<Bytes, Error> {
    let mut data = Vec::with_capacity(expected as usize);
    let written = reader
        .take(expected)
        .read_to_end(&mut data)
        .await
        .map_err(|source| Error::Io {
            context: context.clone(),
            source,
        })? as u64;
    if written != expected {
        return Err(Error::ShortWrite {
            context: context.clone(),
            path: local.to_path_buf(),
            expected,
            written,
        });
    }
    Ok(Bytes::from(data))
}

/// Base name sent as the multipart file name.
pub fn upload_file_name(local: &Path) -> String {
    local
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use pcs_protocol::OnDup;
    use pcs_protocol::constants::RAPID_SLICE_SIZE;
    use pcs_transfer::{fingerprint_bytes, md5_hex};
    use tempfile::TempDir;

    use crate::ErrorKind;
    use crate::test_support::{MockRequest, MockResponse, mock_server};

    fn create_test_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(data).unwrap();
        path
    }

    fn digests(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("{i:032x}")).collect()
    }

    fn record_json(path: &str, size: usize, md5: &str) -> String {
        format!(
            r#"{{"path":"{path}","size":{size},"ctime":1,"mtime":1,"md5":"{md5}","fs_id":42,"isdir":0}}"#
        )
    }

    #[tokio::test]
    async fn direct_upload_then_meta_matches_source() {
        let stored: Arc<Mutex<Option<(String, Vec<u8>)>>> = Arc::default();
        let store = stored.clone();
        let server = mock_server(move |req: &MockRequest| match req.api_method() {
            "upload" => {
                let (_, data) = req.multipart_file().unwrap();
                let path = req.query_value("path").unwrap().to_string();
                let body = record_json(&path, data.len(), &md5_hex(&data));
                *store.lock().unwrap() = Some((path, data));
                MockResponse::json(200, &body)
            }
            "meta" => {
                let guard = store.lock().unwrap();
                let (path, data) = guard.as_ref().unwrap();
                let body = format!(r#"{{"list":[{}]}}"#, record_json(path, data.len(), &md5_hex(data)));
                MockResponse::json(200, &body)
            }
            _ => MockResponse::json(400, "{}"),
        })
        .await;
        let client = server.client();

        let dir = TempDir::new().unwrap();
        let content: Vec<u8> = (0..5000).map(|i| (i % 256) as u8).collect();
        let local = create_test_file(dir.path(), "report.bin", &content);

        let opts = FileOptions::new("/apps/demo/report.bin").with_ondup(OnDup::Overwrite);
        client.upload_file(&local, &opts).await.unwrap();
        let meta = client.meta("/apps/demo/report.bin").await.unwrap();

        assert_eq!(meta.file.size, content.len() as u64);
        assert_eq!(meta.file.md5, md5_hex(&content));

        let reqs = server.requests();
        assert_eq!(reqs[0].method, "POST");
        assert_eq!(reqs[0].query_value("ondup"), Some("overwrite"));
        assert_eq!(reqs[0].query_value("access_token"), Some("test-token"));
        let (file_name, _) = reqs[0].multipart_file().unwrap();
        assert_eq!(file_name, "report.bin");
    }

    #[tokio::test]
    async fn direct_upload_missing_file_sends_nothing() {
        let server = mock_server(|_| MockResponse::json(200, "{}")).await;
        let client = server.client();

        let err = client
            .upload_file(Path::new("/nonexistent/file"), &FileOptions::new("/apps/x"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(server.request_count(), 0);
    }

    #[tokio::test]
    async fn block_upload_marks_tmpfile() {
        let server = mock_server(|req| {
            let (_, data) = req.multipart_file().unwrap();
            MockResponse::json(200, &format!(r#"{{"md5":"{}","request_id":7}}"#, md5_hex(&data)))
        })
        .await;
        let client = server.client();

        let receipt = client
            .upload_block("big.iso", Bytes::from_static(b"chunk-bytes"))
            .await
            .unwrap();
        assert_eq!(receipt.md5, md5_hex(b"chunk-bytes"));

        let req = &server.requests()[0];
        assert_eq!(req.query_value("type"), Some("tmpfile"));
        assert_eq!(req.api_method(), "upload");
        assert!(req.query_value("path").is_none());
    }

    #[tokio::test]
    async fn merge_rejects_bad_block_counts_locally() {
        let server = mock_server(|_| MockResponse::json(200, &record_json("/apps/f", 1, ""))).await;
        let client = server.client();
        let opts = FileOptions::new("/apps/f");

        for n in [0, 1, 1025] {
            let err = client.merge_blocks(&opts, digests(n)).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "count {n}");
        }
        assert_eq!(server.request_count(), 0);

        for n in [2, 1024] {
            client.merge_blocks(&opts, digests(n)).await.unwrap();
        }
        assert_eq!(server.request_count(), 2);
    }

    #[tokio::test]
    async fn merge_sends_ordered_block_list() {
        let server = mock_server(|req| {
            let param = req.form_value("param").unwrap();
            let v: serde_json::Value = serde_json::from_str(&param).unwrap();
            let size = v["block_list"].as_array().unwrap().len();
            MockResponse::json(200, &record_json(req.query_value("path").unwrap(), size, "ff"))
        })
        .await;
        let client = server.client();

        let list = BlockList::new(vec!["aa".into(), "bb".into(), "cc".into()]).unwrap();
        let opts = FileOptions::new("/apps/merged.bin").with_ondup(OnDup::Newcopy);
        let record = client.create_super_file(&opts, &list).await.unwrap();
        assert_eq!(record.size, 3);

        let req = &server.requests()[0];
        assert_eq!(req.api_method(), "createsuperfile");
        assert_eq!(req.query_value("ondup"), Some("newcopy"));
        assert_eq!(
            req.form_value("param").unwrap(),
            r#"{"block_list":["aa","bb","cc"]}"#
        );
    }

    #[tokio::test]
    async fn merge_retry_yields_same_record() {
        let server = mock_server(|req| {
            let param = req.form_value("param").unwrap();
            MockResponse::json(200, &record_json(req.query_value("path").unwrap(), 8, &md5_hex(param.as_bytes())))
        })
        .await;
        let client = server.client();

        let list = BlockList::new(digests(4)).unwrap();
        let opts = FileOptions::new("/apps/again.bin");
        let first = client.create_super_file(&opts, &list).await.unwrap();
        let second = client.create_super_file(&opts, &list).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(server.request_count(), 2);
    }

    #[tokio::test]
    async fn rapid_upload_small_file_rejected_locally() {
        let server = mock_server(|_| MockResponse::json(200, "{}")).await;
        let client = server.client();

        let dir = TempDir::new().unwrap();
        let exact = create_test_file(dir.path(), "exact.bin", &vec![1u8; RAPID_SLICE_SIZE as usize]);
        let err = client
            .rapid_upload_file(&exact, &FileOptions::new("/apps/exact.bin"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let fp = fingerprint_bytes(b"tiny");
        let err = client
            .rapid_upload(&rapid_options(&FileOptions::new("/apps/tiny"), &fp))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert_eq!(server.request_count(), 0);
    }

    #[tokio::test]
    async fn rapid_upload_sends_fingerprint() {
        let server = mock_server(|req| {
            MockResponse::json(200, &record_json(req.query_value("path").unwrap(), 1, "x"))
        })
        .await;
        let client = server.client();

        let dir = TempDir::new().unwrap();
        let content: Vec<u8> = (0..300_000u32).map(|i| (i % 199) as u8).collect();
        let local = create_test_file(dir.path(), "big.bin", &content);
        let fp = fingerprint_bytes(&content);

        client
            .rapid_upload_file(&local, &FileOptions::new("/apps/big.bin"))
            .await
            .unwrap();

        let req = &server.requests()[0];
        assert_eq!(req.api_method(), "rapidupload");
        assert_eq!(req.query_value("content-length"), Some("300000"));
        assert_eq!(req.query_value("content-md5"), Some(fp.whole_md5.as_str()));
        assert_eq!(req.query_value("slice-md5"), Some(fp.slice_md5.as_str()));
        assert_eq!(req.query_value("content-crc32"), Some(fp.crc32.to_string().as_str()));
        assert_eq!(req.query_value("ondup"), Some("overwrite"));
    }

    #[tokio::test]
    async fn rapid_upload_miss_is_api_error() {
        let server = mock_server(|_| {
            MockResponse::json(404, r#"{"error_code":31079,"error_msg":"file md5 not found"}"#)
        })
        .await;
        let client = server.client();

        let dir = TempDir::new().unwrap();
        let local = create_test_file(dir.path(), "new.bin", &vec![7u8; 300_000]);
        let err = client
            .rapid_upload_file(&local, &FileOptions::new("/apps/new.bin"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.api_error().unwrap().code, Some(31079));
    }

    #[tokio::test]
    async fn body_ending_early_is_short_write() {
        let context = Context::new(UPLOAD_FILE).with_target(Some("/apps/a.bin"));
        let data = vec![1u8; 10];
        let err = read_exact_len(&context, Path::new("a.bin"), &data[..], 20)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            Error::ShortWrite {
                expected: 20,
                written: 10,
                ..
            }
        ));
        assert_eq!(err.kind(), ErrorKind::ShortIo);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn body_longer_than_length_is_cut() {
        let context = Context::new(UPLOAD_FILE);
        let data = b"0123456789".to_vec();
        let body = read_exact_len(&context, Path::new("a.bin"), &data[..], 4)
            .await
            .unwrap();
        assert_eq!(&body[..], b"0123");
    }
}
