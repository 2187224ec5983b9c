use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage quota of the current user, in bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    #[serde(default)]
    pub quota: u64,
    #[serde(default)]
    pub used: u64,
}

impl Quota {
    pub fn available(&self) -> u64 {
        self.quota.saturating_sub(self.used)
    }
}

/// A remote file or directory as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Absolute remote path.
    #[serde(default)]
    pub path: String,
    /// Size in bytes (0 for directories).
    #[serde(default)]
    pub size: u64,
    /// Creation time, unix seconds.
    #[serde(default)]
    pub ctime: i64,
    /// Modification time, unix seconds.
    #[serde(default)]
    pub mtime: i64,
    /// Content MD5 (files only).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub md5: String,
    #[serde(default)]
    pub fs_id: u64,
    #[serde(default, rename = "isdir", with = "flag")]
    pub is_dir: bool,
}

impl FileRecord {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.ctime, 0)
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.mtime, 0)
    }
}

/// Metadata view of a file, with block and sub-directory details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    #[serde(flatten)]
    pub file: FileRecord,
    /// JSON-encoded block digest list, as returned by the service.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub block_list: String,
    #[serde(default, rename = "ifhassubdir", with = "flag")]
    pub has_sub_dir: bool,
}

impl FileMeta {
    /// Decodes the block digest list, empty when the service sent none.
    pub fn blocks(&self) -> Result<Vec<String>, serde_json::Error> {
        if self.block_list.is_empty() {
            return Ok(Vec::new());
        }
        serde_json::from_str(&self.block_list)
    }
}

/// Digest returned by a temporary block upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockReceipt {
    pub md5: String,
    #[serde(default)]
    pub request_id: u64,
}

/// Bare acknowledgement returned by mutating calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub request_id: u64,
}

/// Source/destination pair for moves and copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FromTo {
    pub from: String,
    pub to: String,
}

/// Result of a move or copy (single or batch).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCopyResponse {
    #[serde(default)]
    pub extra: MoveCopyExtra,
    #[serde(default)]
    pub request_id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveCopyExtra {
    #[serde(default)]
    pub list: Vec<FromTo>,
}

/// Envelope for `{"list": [...]}` responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
}

/// Media files grouped by category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFiles {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub limit: u64,
    #[serde(default)]
    pub list: Vec<FileRecord>,
}

/// Incremental change set since a cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffResponse {
    #[serde(default)]
    pub entries: HashMap<String, FileMeta>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub reset: bool,
    #[serde(default)]
    pub cursor: String,
}

/// Identifier of a newly created offline download task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTaskResponse {
    pub task_id: u64,
    #[serde(default)]
    pub request_id: u64,
}

/// Result of restoring entries from the recycle bin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreResponse {
    #[serde(default)]
    pub extra: RestoreExtra,
    #[serde(default)]
    pub request_id: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreExtra {
    #[serde(default)]
    pub list: Vec<FsId>,
}

/// A service-assigned file identifier wrapped as `{"fs_id": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsId {
    #[serde(with = "lenient_u64")]
    pub fs_id: u64,
}

/// Error body returned with non-2xx responses. Either field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub error_code: Option<i64>,
}

/// `0`/`1` integer flags exchanged as booleans.
mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &bool, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(u8::from(*v))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Bool(bool),
        }
        Ok(match Raw::deserialize(d)? {
            Raw::Int(n) => n != 0,
            Raw::Bool(b) => b,
        })
    }
}

/// Identifiers the service sometimes sends as strings.
mod lenient_u64 {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(v: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(*v)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(u64),
            Str(String),
        }
        match Raw::deserialize(d)? {
            Raw::Int(n) => Ok(n),
            Raw::Str(s) => s.parse().map_err(D::Error::custom),
        }
    }
}
