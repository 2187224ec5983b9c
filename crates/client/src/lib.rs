//! Async client for the PCS file API.
//!
//! [`Client`] turns an [`Operation`](pcs_protocol::Operation) plus an option
//! set into an HTTP request against the right endpoint, sends it over a
//! pooled [`Transport`] and decodes the reply. Upload, download, file
//! management and service calls are all methods on [`Client`].

pub mod client;
pub mod config;
pub mod download;
pub mod error;
pub mod files;
pub mod request;
pub mod response;
pub mod services;
pub mod transport;
pub mod upload;

#[cfg(test)]
mod test_support;

pub use client::Client;
pub use config::{AccessToken, ClientConfig, Endpoints};
pub use error::{ApiError, Context, Error, ErrorKind};
pub use request::{ByteRange, OperationRequest, RequestBody, RequestBuilder};
pub use response::{check, decode_json};
pub use transport::{RawResponse, Transport};
pub use upload::{fingerprint, rapid_options, upload_file_name};
