use std::io::Read;
use std::path::Path;

use pcs_protocol::constants::RAPID_SLICE_SIZE;

use crate::TransferError;

/// Read buffer for the streaming digest pass.
const READ_BUF_SIZE: usize = 64 * 1024;

/// Digests the service compares to recognise content it already holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentFingerprint {
    /// Content length in bytes.
    pub length: u64,
    /// Lowercase hex MD5 of the whole content.
    pub whole_md5: String,
    /// IEEE CRC32 of the whole content.
    pub crc32: u32,
    /// Lowercase hex MD5 of the first `min(length, 256 KiB)` bytes.
    pub slice_md5: String,
}

/// Computes MD5 of `data` and returns the lowercase hex digest.
pub fn md5_hex(data: &[u8]) -> String {
    hex::encode(md5::compute(data).0)
}

/// Fingerprints an in-memory buffer.
pub fn fingerprint_bytes(data: &[u8]) -> ContentFingerprint {
    let slice_len = data.len().min(RAPID_SLICE_SIZE as usize);
    ContentFingerprint {
        length: data.len() as u64,
        whole_md5: md5_hex(data),
        crc32: crc32fast::hash(data),
        slice_md5: md5_hex(&data[..slice_len]),
    }
}

/// Fingerprints a file in a single streaming pass.
///
/// The length is taken from the file's metadata at open time and at most
/// that many bytes are hashed. Reading fewer bytes fails with
/// [`TransferError::ShortRead`].
pub fn fingerprint_file(path: &Path) -> Result<ContentFingerprint, TransferError> {
    let file = std::fs::File::open(path)?;
    let expected = file.metadata()?.len();
    fingerprint_reader(path, file, expected)
}

/// Hashes at most `expected` bytes of `reader`, failing on a short read.
fn fingerprint_reader(
    path: &Path,
    reader: impl Read,
    expected: u64,
) -> Result<ContentFingerprint, TransferError> {
    let mut digests = Digests::new();
    let mut reader = reader.take(expected);
    let mut buf = vec![0u8; READ_BUF_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        digests.update(&buf[..n]);
    }

    let expected_slice = expected.min(RAPID_SLICE_SIZE);
    if digests.slice_len != expected_slice {
        return Err(TransferError::ShortRead {
            path: path.to_path_buf(),
            expected: expected_slice,
            actual: digests.slice_len,
        });
    }
    if digests.total_len != expected {
        return Err(TransferError::ShortRead {
            path: path.to_path_buf(),
            expected,
            actual: digests.total_len,
        });
    }

    Ok(digests.finish())
}

/// Incremental state for the whole-file and leading-slice digests.
struct Digests {
    whole: md5::Context,
    slice: md5::Context,
    crc: crc32fast::Hasher,
    total_len: u64,
    slice_len: u64,
}

impl Digests {
    fn new() -> Self {
        Self {
            whole: md5::Context::new(),
            slice: md5::Context::new(),
            crc: crc32fast::Hasher::new(),
            total_len: 0,
            slice_len: 0,
        }
    }

    fn update(&mut self, data: &[u8]) {
        self.whole.consume(data);
        self.crc.update(data);

        let room = RAPID_SLICE_SIZE - self.slice_len;
        if room > 0 {
            let take = (data.len() as u64).min(room) as usize;
            self.slice.consume(&data[..take]);
            self.slice_len += take as u64;
        }
        self.total_len += data.len() as u64;
    }

    fn finish(self) -> ContentFingerprint {
        ContentFingerprint {
            length: self.total_len,
            whole_md5: hex::encode(self.whole.compute().0),
            crc32: self.crc.finalize(),
            slice_md5: hex::encode(self.slice.compute().0),
        }
    }
}
