use std::fmt;
use std::path::PathBuf;

use pcs_protocol::{InvalidArgument, Operation};
use pcs_transfer::TransferError;
use reqwest::StatusCode;

/// Coarse classification of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Rejected locally before any request was sent.
    Validation,
    /// The request never produced a complete response.
    Transport,
    /// The service answered with a non-2xx status.
    Api,
    /// A 2xx body did not match the expected shape.
    Decode,
    /// Fewer bytes were read or written than the file length promised.
    ShortIo,
}

/// The operation and remote path a failure belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    pub operation: Operation,
    pub target: Option<String>,
}

impl Context {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            target: None,
        }
    }

    pub fn with_target(mut self, target: Option<&str>) -> Self {
        self.target = target.map(str::to_string);
        self
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            Some(t) => write!(f, "{} {t}", self.operation),
            None => write!(f, "{}", self.operation),
        }
    }
}

/// A non-2xx response, with the service's error body when it had one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub message: Option<String>,
    pub code: Option<i64>,
    /// Raw response body, kept when it could not be parsed.
    pub body: String,
}

impl ApiError {
    pub fn is_retryable(&self) -> bool {
        self.status >= 500 || self.status == StatusCode::TOO_MANY_REQUESTS.as_u16()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API error {}", self.status)?;
        match (&self.message, self.code) {
            (Some(msg), Some(code)) => write!(f, ": {msg} (code {code})"),
            (Some(msg), None) => write!(f, ": {msg}"),
            (None, Some(code)) => write!(f, ": code {code}"),
            (None, None) if !self.body.is_empty() => write!(f, ": {}", self.body),
            (None, None) => Ok(()),
        }
    }
}

/// Errors from the PCS client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{context}: {source}")]
    Invalid {
        context: Context,
        #[source]
        source: InvalidArgument,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("{context}: transport error: {source}")]
    Transport {
        context: Context,
        #[source]
        source: reqwest::Error,
    },

    #[error("{context}: {error}")]
    Api { context: Context, error: ApiError },

    #[error("{context}: unfollowed redirect {status} to {}", .location.as_deref().unwrap_or("<none>"))]
    Redirect {
        context: Context,
        status: u16,
        location: Option<String>,
    },

    #[error("{context}: failed to decode response: {source}")]
    Decode {
        context: Context,
        #[source]
        source: serde_json::Error,
    },

    #[error("{context}: short write from {}: expected {expected} bytes, wrote {written}", .path.display())]
    ShortWrite {
        context: Context,
        path: PathBuf,
        expected: u64,
        written: u64,
    },

    #[error("{context}: {source}")]
    Transfer {
        context: Context,
        #[source]
        source: TransferError,
    },

    #[error("{context}: I/O error: {source}")]
    Io {
        context: Context,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn invalid(context: &Context, msg: impl Into<String>) -> Self {
        Error::Invalid {
            context: context.clone(),
            source: InvalidArgument::new(msg),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Invalid { .. } | Error::Config(_) => ErrorKind::Validation,
            Error::Transport { .. } => ErrorKind::Transport,
            Error::Api { .. } | Error::Redirect { .. } => ErrorKind::Api,
            Error::Decode { .. } => ErrorKind::Decode,
            Error::ShortWrite { .. } => ErrorKind::ShortIo,
            Error::Transfer { source, .. } => {
                if source.is_short_io() {
                    ErrorKind::ShortIo
                } else if source.is_validation() {
                    ErrorKind::Validation
                } else {
                    ErrorKind::Transport
                }
            }
            Error::Io { .. } => ErrorKind::Transport,
        }
    }

    /// Whether repeating the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { .. } | Error::ShortWrite { .. } => true,
            Error::Api { error, .. } => error.is_retryable(),
            Error::Transfer { source, .. } => source.is_short_io(),
            _ => false,
        }
    }

    /// The operation the failure belongs to, if any.
    pub fn context(&self) -> Option<&Context> {
        match self {
            Error::Config(_) => None,
            Error::Invalid { context, .. }
            | Error::Transport { context, .. }
            | Error::Api { context, .. }
            | Error::Redirect { context, .. }
            | Error::Decode { context, .. }
            | Error::ShortWrite { context, .. }
            | Error::Transfer { context, .. }
            | Error::Io { context, .. } => Some(context),
        }
    }

    /// The service's error details for a non-2xx response.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api { error, .. } => Some(error),
            _ => None,
        }
    }
}
