//! Wire protocol for the PCS file API.
//!
//! Holds everything both the client and the upload orchestrator agree on:
//! the endpoint and operation table, typed option sets with their explicit
//! query-parameter encoding, and the JSON shapes the service returns.

pub mod constants;
pub mod operation;
pub mod options;
pub mod types;

// Re-export primary types for convenience.
pub use operation::{Endpoint, HttpVerb, Operation};
pub use options::{
    FileOptions, InvalidArgument, OnDup, PathOptions, QueryOptions, QueryParams,
    RapidUploadOptions,
};
pub use types::{BlockReceipt, ErrorBody, FileMeta, FileRecord, Quota};
