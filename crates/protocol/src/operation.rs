//! Endpoint selection and the per-operation request table.
//!
//! Every API call is described by an [`Operation`]: the base endpoint it
//! targets, the resource segment appended to that base, the `method`
//! query parameter and the HTTP verb. Callers never choose the endpoint;
//! it is fixed here by the operation's role.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{CONTROL_BASE_URL, DOWNLOAD_BASE_URL, UPLOAD_BASE_URL};

/// One of the three API base endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// Metadata, listing, rapid upload, merge and management calls.
    Control,
    /// File bytes for direct and block uploads.
    Upload,
    /// File bytes for downloads.
    Download,
}

impl Endpoint {
    /// All endpoints, in a stable order.
    pub const ALL: [Endpoint; 3] = [Endpoint::Control, Endpoint::Upload, Endpoint::Download];

    /// The production base URL for this endpoint.
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Endpoint::Control => CONTROL_BASE_URL,
            Endpoint::Upload => UPLOAD_BASE_URL,
            Endpoint::Download => DOWNLOAD_BASE_URL,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Endpoint::Control => "control",
            Endpoint::Upload => "upload",
            Endpoint::Download => "download",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP verb used by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    /// Plain GET, parameters in the query string only.
    Get,
    /// POST carrying a form-encoded body (possibly empty).
    PostForm,
    /// POST carrying a multipart body.
    PostMultipart,
}

/// Static description of one API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operation {
    pub endpoint: Endpoint,
    /// Resource path appended to the endpoint base, e.g. `file`.
    pub resource: &'static str,
    /// Value of the `method` query parameter.
    pub method: &'static str,
    pub verb: HttpVerb,
}

impl Operation {
    pub const fn new(
        endpoint: Endpoint,
        resource: &'static str,
        method: &'static str,
        verb: HttpVerb,
    ) -> Self {
        Self {
            endpoint,
            resource,
            method,
            verb,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource, self.method)
    }
}

use Endpoint::{Control, Download, Upload};
use HttpVerb::{Get, PostForm, PostMultipart};

pub const QUOTA_INFO: Operation = Operation::new(Control, "quota", "info", Get);

// Uploads.
pub const UPLOAD_FILE: Operation = Operation::new(Upload, "file", "upload", PostMultipart);
pub const UPLOAD_BLOCK: Operation = Operation::new(Upload, "file", "upload", PostMultipart);
pub const CREATE_SUPER_FILE: Operation =
    Operation::new(Control, "file", "createsuperfile", PostForm);
pub const RAPID_UPLOAD: Operation = Operation::new(Control, "file", "rapidupload", PostForm);

// Downloads.
pub const DOWNLOAD: Operation = Operation::new(Download, "file", "download", Get);

// Files and directories.
pub const MKDIR: Operation = Operation::new(Control, "file", "mkdir", PostForm);
pub const META: Operation = Operation::new(Control, "file", "meta", Get);
pub const BATCH_META: Operation = Operation::new(Control, "file", "meta", PostForm);
pub const LIST: Operation = Operation::new(Control, "file", "list", Get);
pub const MOVE: Operation = Operation::new(Control, "file", "move", PostForm);
pub const COPY: Operation = Operation::new(Control, "file", "copy", PostForm);
pub const DELETE: Operation = Operation::new(Control, "file", "delete", PostForm);
pub const SEARCH: Operation = Operation::new(Control, "file", "search", Get);
pub const DIFF: Operation = Operation::new(Control, "file", "diff", Get);

// Media.
pub const THUMBNAIL: Operation = Operation::new(Control, "thumbnail", "generate", Get);
pub const STREAMING: Operation = Operation::new(Control, "file", "streaming", Get);
pub const LIST_STREAM: Operation = Operation::new(Control, "stream", "list", Get);

// Offline download tasks.
pub const ADD_TASK: Operation = Operation::new(Control, "services/cloud_dl", "add_task", PostForm);
pub const QUERY_TASK: Operation =
    Operation::new(Control, "services/cloud_dl", "query_task", PostForm);
pub const LIST_TASK: Operation =
    Operation::new(Control, "services/cloud_dl", "list_task", PostForm);
pub const CANCEL_TASK: Operation =
    Operation::new(Control, "services/cloud_dl", "cancel_task", PostForm);

// Recycle bin.
pub const LIST_RECYCLE: Operation = Operation::new(Control, "file", "listrecycle", Get);
pub const RESTORE: Operation = Operation::new(Control, "file", "restore", PostForm);
