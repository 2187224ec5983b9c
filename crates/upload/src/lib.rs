//! PCS upload orchestration.
//!
//! Turns "put this local file at that remote path" into the right
//! sequence of client calls:
//!
//! 1. **Fingerprint**: whole MD5, CRC32 and leading-slice MD5, when a
//!    rapid upload is attempted
//! 2. **Rapid upload**: create the file from its fingerprint if the
//!    service already holds the content
//! 3. **Direct upload**: one multipart request for smaller files
//! 4. **Block upload**: ordered chunks sent concurrently as temporary
//!    blocks, then merged into a single superfile
//!
//! The orchestrator is generic over [`UploadBackend`], implemented for
//! [`pcs_client::Client`].

pub mod backend;
mod block;
pub mod error;
pub mod orchestrator;
pub mod strategy;
pub mod types;

#[cfg(test)]
mod test_support;

pub use backend::{BackendFuture, UploadBackend};
pub use error::UploadError;
pub use orchestrator::UploadOrchestrator;
pub use strategy::Strategy;
pub use types::{UploadConfig, UploadEvent, UploadOutcome};
