//! Pure request construction.
//!
//! [`RequestBuilder::build`] turns an [`Operation`] and an option set into
//! a fresh [`OperationRequest`]. Each call starts from a clone of the
//! endpoint's base URL, so nothing carries over between requests or
//! between endpoints. No I/O happens here.

use std::fmt;

use bytes::Bytes;
use pcs_protocol::constants::{PARAM_ACCESS_TOKEN, PARAM_METHOD};
use pcs_protocol::options::encode_options;
use pcs_protocol::{HttpVerb, InvalidArgument, Operation, QueryOptions, QueryParams};
use pcs_transfer::validate_remote_path;
use reqwest::Url;

use crate::config::{AccessToken, Endpoints};
use crate::error::{Context, Error};

/// Inclusive byte range for partial downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    /// Last byte included; open-ended when unset.
    pub end: Option<u64>,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end: Some(end),
        }
    }

    pub fn from_offset(start: u64) -> Self {
        Self { start, end: None }
    }

    pub fn validate(&self) -> Result<(), InvalidArgument> {
        match self.end {
            Some(end) if self.start > end => Err(InvalidArgument::new(format!(
                "range start {} is past end {end}",
                self.start
            ))),
            _ => Ok(()),
        }
    }

    /// Number of bytes covered, when bounded and representable.
    pub fn len(&self) -> Option<u64> {
        self.end?.checked_sub(self.start)?.checked_add(1)
    }

    /// Value of the `Range` header.
    pub fn header_value(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end {
            Some(end) => write!(f, "bytes={}-{end}", self.start),
            None => write!(f, "bytes={}-", self.start),
        }
    }
}

/// Body carried by a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    /// Form-encoded parameters.
    Form(Vec<(&'static str, String)>),
    /// A single file part.
    Multipart { file_name: String, data: Bytes },
}

/// A fully described request, ready for the transport.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub context: Context,
    pub verb: HttpVerb,
    /// Base URL plus resource path, with `method` and `access_token` first
    /// in the query.
    pub url: Url,
    pub body: RequestBody,
    pub range: Option<ByteRange>,
}

impl OperationRequest {
    pub fn with_form(mut self, pairs: Vec<(&'static str, String)>) -> Self {
        self.body = RequestBody::Form(pairs);
        self
    }

    pub fn with_multipart(mut self, file_name: impl Into<String>, data: Bytes) -> Self {
        self.body = RequestBody::Multipart {
            file_name: file_name.into(),
            data,
        };
        self
    }

    pub fn with_range(mut self, range: ByteRange) -> Self {
        self.range = Some(range);
        self
    }

    /// Query pairs in order, for inspection.
    pub fn query(&self) -> Vec<(String, String)> {
        self.url.query_pairs().into_owned().collect()
    }
}

/// Builds authenticated requests against the configured endpoints.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    endpoints: Endpoints,
    token: AccessToken,
}

impl RequestBuilder {
    pub fn new(endpoints: Endpoints, token: AccessToken) -> Self {
        Self { endpoints, token }
    }

    /// Builds a request for `op` with the parameters of `opts`.
    ///
    /// The option set is validated first, and its target path (if any) is
    /// checked with [`validate_remote_path`].
    pub fn build(
        &self,
        op: Operation,
        opts: Option<&dyn QueryOptions>,
    ) -> Result<OperationRequest, Error> {
        let target = opts.and_then(|o| o.target());
        let context = Context::new(op).with_target(target);

        let params = match opts {
            Some(o) => {
                o.validate().map_err(|source| Error::Invalid {
                    context: context.clone(),
                    source,
                })?;
                encode_options(o)
            }
            None => QueryParams::new(),
        };
        if let Some(name) = params.reserved_name() {
            return Err(Error::invalid(
                &context,
                format!("option sets may not set reserved parameter {name}"),
            ));
        }
        if let Some(path) = target {
            validate_remote_path(path).map_err(|source| Error::Transfer {
                context: context.clone(),
                source,
            })?;
        }

        let mut url = self.endpoints.get(op.endpoint).clone();
        url.path_segments_mut()
            .map_err(|_| Error::invalid(&context, "endpoint URL cannot be a base"))?
            .pop_if_empty()
            .extend(op.resource.split('/'));
        {
            let mut query = url.query_pairs_mut();
            query.append_pair(PARAM_METHOD, op.method);
            query.append_pair(PARAM_ACCESS_TOKEN, self.token.expose());
            for (name, value) in params.iter() {
                query.append_pair(name, value);
            }
        }

        Ok(OperationRequest {
            context,
            verb: op.verb,
            url,
            body: RequestBody::Empty,
            range: None,
        })
    }
}
