//! Typed option sets and their query-parameter encoding.
//!
//! Each option set declares its field-to-parameter mapping explicitly in
//! [`QueryOptions::encode`]. Fields that are "omitted when default" go
//! through [`QueryParams::push_opt`] or [`QueryParams::push_nonempty`] and
//! never appear as empty strings.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{MIN_RAPID_UPLOAD_SIZE, PARAM_ACCESS_TOKEN, PARAM_METHOD};

/// Local validation failure for an option set or argument.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid argument: {0}")]
pub struct InvalidArgument(pub String);

impl InvalidArgument {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Ordered list of query parameters for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter that is always emitted.
    pub fn push(&mut self, name: &'static str, value: impl Into<String>) -> &mut Self {
        self.pairs.push((name, value.into()));
        self
    }

    /// Appends a parameter only when `value` is set.
    pub fn push_opt<T: fmt::Display>(&mut self, name: &'static str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.pairs.push((name, v.to_string()));
        }
        self
    }

    /// Appends a parameter only when `value` is non-empty.
    pub fn push_nonempty(&mut self, name: &'static str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.pairs.push((name, value.to_string()));
        }
        self
    }

    /// Returns the first value recorded for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.pairs.iter().map(|(k, v)| (*k, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns the first reserved parameter name present, if any.
    pub fn reserved_name(&self) -> Option<&'static str> {
        self.pairs
            .iter()
            .map(|(k, _)| *k)
            .find(|k| *k == PARAM_METHOD || *k == PARAM_ACCESS_TOKEN)
    }
}

/// An option set that can be encoded into query parameters.
pub trait QueryOptions {
    /// Appends this option set's parameters.
    fn encode(&self, params: &mut QueryParams);

    /// Checks local constraints before any request is built.
    fn validate(&self) -> Result<(), InvalidArgument> {
        Ok(())
    }

    /// Remote path the option set targets, for error context.
    fn target(&self) -> Option<&str> {
        None
    }
}

/// Encodes an option set into a fresh parameter list.
pub fn encode_options(opts: &dyn QueryOptions) -> QueryParams {
    let mut params = QueryParams::new();
    opts.encode(&mut params);
    params
}

// ---------------------------------------------------------------------------
// Shared enums
// ---------------------------------------------------------------------------

/// What the service does when the upload target already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnDup {
    /// Replace the existing file.
    #[default]
    Overwrite,
    /// Keep the existing file and store a renamed copy.
    Newcopy,
}

impl OnDup {
    pub const fn from_overwrite(overwrite: bool) -> Self {
        if overwrite {
            OnDup::Overwrite
        } else {
            OnDup::Newcopy
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            OnDup::Overwrite => "overwrite",
            OnDup::Newcopy => "newcopy",
        }
    }
}

impl fmt::Display for OnDup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        })
    }
}

/// Sort key for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Time,
    Name,
    Size,
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortBy::Time => "time",
            SortBy::Name => "name",
            SortBy::Size => "size",
        })
    }
}

/// Half-open entry range `[start, end)` rendered as `start-end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRange {
    pub start: u64,
    pub end: u64,
}

impl fmt::Display for EntryRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Media category for stream listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Video,
    Audio,
    Image,
    Doc,
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StreamType::Video => "video",
            StreamType::Audio => "audio",
            StreamType::Image => "image",
            StreamType::Doc => "doc",
        })
    }
}

// ---------------------------------------------------------------------------
// Option sets
// ---------------------------------------------------------------------------

/// A single remote path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOptions {
    pub path: String,
}

impl PathOptions {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl QueryOptions for PathOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push("path", &self.path);
    }

    fn target(&self) -> Option<&str> {
        Some(&self.path)
    }
}

/// Target path and duplicate disposition for uploads and merges.
///
/// The disposition is always sent; it defaults to overwrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOptions {
    pub path: String,
    pub ondup: OnDup,
}

impl FileOptions {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ondup: OnDup::default(),
        }
    }

    pub fn with_ondup(mut self, ondup: OnDup) -> Self {
        self.ondup = ondup;
        self
    }
}

impl QueryOptions for FileOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push("path", &self.path);
        params.push("ondup", self.ondup.as_str());
    }

    fn target(&self) -> Option<&str> {
        Some(&self.path)
    }
}

/// Marks an upload as a temporary block for a later merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockOptions;

impl QueryOptions for BlockOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push("type", "tmpfile");
    }
}

/// Source and destination for a single move or copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveCopyOptions {
    pub from: String,
    pub to: String,
}

impl QueryOptions for MoveCopyOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push("from", &self.from);
        params.push("to", &self.to);
    }

    fn target(&self) -> Option<&str> {
        Some(&self.from)
    }
}

/// Directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListFilesOptions {
    pub path: String,
    pub order: Option<SortOrder>,
    pub by: Option<SortBy>,
    pub limit: Option<EntryRange>,
}

impl ListFilesOptions {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            order: None,
            by: None,
            limit: None,
        }
    }
}

impl QueryOptions for ListFilesOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push("path", &self.path);
        params.push_opt("order", self.order);
        params.push_opt("by", self.by);
        params.push_opt("limit", self.limit);
    }

    fn validate(&self) -> Result<(), InvalidArgument> {
        match self.limit {
            Some(r) if r.start >= r.end => Err(InvalidArgument::new(format!(
                "list limit {r} must have start < end"
            ))),
            _ => Ok(()),
        }
    }

    fn target(&self) -> Option<&str> {
        Some(&self.path)
    }
}

/// File name search (directories are not matched).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub path: String,
    pub word: String,
    pub recursive: bool,
}

impl QueryOptions for SearchOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push("path", &self.path);
        params.push("wd", &self.word);
        if self.recursive {
            params.push("re", "1");
        }
    }

    fn validate(&self) -> Result<(), InvalidArgument> {
        if self.word.is_empty() {
            return Err(InvalidArgument::new("search word must not be empty"));
        }
        Ok(())
    }

    fn target(&self) -> Option<&str> {
        Some(&self.path)
    }
}

/// Thumbnail generation for an image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThumbnailOptions {
    pub path: String,
    /// JPEG quality in (0, 100]; the service defaults to 100.
    pub quality: Option<u8>,
    pub width: u32,
    pub height: u32,
}

/// Largest thumbnail edge the service renders.
const MAX_THUMBNAIL_EDGE: u32 = 1600;

impl QueryOptions for ThumbnailOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push("path", &self.path);
        params.push_opt("quality", self.quality);
        params.push("height", self.height.to_string());
        params.push("width", self.width.to_string());
    }

    fn validate(&self) -> Result<(), InvalidArgument> {
        if let Some(q) = self.quality
            && !(1..=100).contains(&q)
        {
            return Err(InvalidArgument::new(format!(
                "thumbnail quality {q} outside (0, 100]"
            )));
        }
        for (name, edge) in [("width", self.width), ("height", self.height)] {
            if edge == 0 || edge > MAX_THUMBNAIL_EDGE {
                return Err(InvalidArgument::new(format!(
                    "thumbnail {name} {edge} outside (0, {MAX_THUMBNAIL_EDGE}]"
                )));
            }
        }
        Ok(())
    }

    fn target(&self) -> Option<&str> {
        Some(&self.path)
    }
}

/// Rapid upload: create a file from a content fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RapidUploadOptions {
    pub path: String,
    pub content_length: u64,
    pub content_md5: String,
    pub slice_md5: String,
    pub content_crc32: u32,
    pub ondup: OnDup,
}

impl QueryOptions for RapidUploadOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push("path", &self.path);
        params.push("content-length", self.content_length.to_string());
        params.push("content-md5", &self.content_md5);
        params.push("slice-md5", &self.slice_md5);
        params.push("content-crc32", self.content_crc32.to_string());
        params.push("ondup", self.ondup.as_str());
    }

    fn validate(&self) -> Result<(), InvalidArgument> {
        if self.content_length <= MIN_RAPID_UPLOAD_SIZE {
            return Err(InvalidArgument::new(format!(
                "rapid upload needs more than {MIN_RAPID_UPLOAD_SIZE} bytes, got {}",
                self.content_length
            )));
        }
        for (name, digest) in [("content-md5", &self.content_md5), ("slice-md5", &self.slice_md5)] {
            if !is_lower_hex_md5(digest) {
                return Err(InvalidArgument::new(format!(
                    "{name} must be 32 lowercase hex characters"
                )));
            }
        }
        Ok(())
    }

    fn target(&self) -> Option<&str> {
        Some(&self.path)
    }
}

fn is_lower_hex_md5(s: &str) -> bool {
    s.len() == 32 && s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

/// Incremental change query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOptions {
    /// `null` on the first call, then the cursor returned by the previous one.
    pub cursor: String,
}

impl DiffOptions {
    pub fn first() -> Self {
        Self {
            cursor: "null".into(),
        }
    }
}

impl QueryOptions for DiffOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push("cursor", &self.cursor);
    }
}

/// Video transcoding for online playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingOptions {
    pub path: String,
    /// Playlist format, e.g. `M3U8_640_480`.
    pub kind: String,
}

impl QueryOptions for StreamingOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push("path", &self.path);
        params.push("type", &self.kind);
    }

    fn validate(&self) -> Result<(), InvalidArgument> {
        if !self.kind.starts_with("M3U8_") {
            return Err(InvalidArgument::new(format!(
                "unsupported streaming type {}",
                self.kind
            )));
        }
        Ok(())
    }

    fn target(&self) -> Option<&str> {
        Some(&self.path)
    }
}

/// Listing of media files by category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListStreamOptions {
    pub kind: StreamType,
    pub start: Option<u64>,
    pub limit: Option<u64>,
    pub filter_path: String,
}

impl ListStreamOptions {
    pub fn new(kind: StreamType) -> Self {
        Self {
            kind,
            start: None,
            limit: None,
            filter_path: String::new(),
        }
    }
}

impl QueryOptions for ListStreamOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push("type", self.kind.to_string());
        params.push_opt("start", self.start);
        params.push_opt("limit", self.limit);
        params.push_nonempty("filter_path", &self.filter_path);
    }
}

/// New offline download task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddTaskOptions {
    pub save_path: String,
    pub source_url: String,
    pub expires: Option<u64>,
    /// Bytes per second; unlimited when unset.
    pub rate_limit: Option<u64>,
    /// Seconds; the service defaults to 3600.
    pub timeout: Option<u64>,
    pub callback: String,
}

impl QueryOptions for AddTaskOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push_opt("expires", self.expires);
        params.push("save_path", &self.save_path);
        params.push("source_url", &self.source_url);
        params.push_opt("rate_limit", self.rate_limit);
        params.push_opt("timeout", self.timeout);
        params.push_nonempty("callback", &self.callback);
    }

    fn validate(&self) -> Result<(), InvalidArgument> {
        if self.source_url.is_empty() {
            return Err(InvalidArgument::new("source_url must not be empty"));
        }
        Ok(())
    }

    fn target(&self) -> Option<&str> {
        Some(&self.save_path)
    }
}

/// What `query_task` reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskQuery {
    Info,
    #[default]
    Progress,
}

/// Query of specific offline tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTaskOptions {
    pub task_ids: Vec<u64>,
    pub op_type: TaskQuery,
    pub expires: Option<u64>,
}

impl QueryOptions for QueryTaskOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push_opt("expires", self.expires);
        let ids: Vec<String> = self.task_ids.iter().map(u64::to_string).collect();
        params.push("task_ids", ids.join(","));
        params.push(
            "op_type",
            match self.op_type {
                TaskQuery::Info => "0",
                TaskQuery::Progress => "1",
            },
        );
    }

    fn validate(&self) -> Result<(), InvalidArgument> {
        if self.task_ids.is_empty() {
            return Err(InvalidArgument::new("task_ids must not be empty"));
        }
        Ok(())
    }
}

/// Listing of offline tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListTaskOptions {
    pub expires: Option<u64>,
    pub start: Option<u64>,
    pub limit: Option<u64>,
    pub ascending: bool,
    pub source_url: String,
    pub save_path: String,
    pub create_time: Option<u64>,
    pub status: Option<u32>,
    /// Whether task details are returned; the service defaults to yes.
    pub need_task_info: Option<bool>,
}

impl QueryOptions for ListTaskOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push_opt("expires", self.expires);
        params.push_opt("start", self.start);
        params.push_opt("limit", self.limit);
        if self.ascending {
            params.push("asc", "1");
        }
        params.push_nonempty("source_url", &self.source_url);
        params.push_nonempty("save_path", &self.save_path);
        params.push_opt("create_time", self.create_time);
        params.push_opt("status", self.status);
        params.push_opt("need_task_info", self.need_task_info.map(u8::from));
    }
}

/// Cancellation of one offline task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelTaskOptions {
    pub task_id: u64,
    pub expires: Option<u64>,
}

impl QueryOptions for CancelTaskOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push_opt("expires", self.expires);
        params.push("task_id", self.task_id.to_string());
    }
}

/// Recycle bin listing window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListRecycleOptions {
    pub start: Option<u64>,
    pub limit: Option<u64>,
}

impl QueryOptions for ListRecycleOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push_opt("start", self.start);
        params.push_opt("limit", self.limit);
    }
}

/// Restore of one recycled entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreOptions {
    pub fs_id: u64,
}

impl QueryOptions for RestoreOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push("fs_id", self.fs_id.to_string());
    }
}

/// Empties the whole recycle bin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmptyRecycleOptions;

impl QueryOptions for EmptyRecycleOptions {
    fn encode(&self, params: &mut QueryParams) {
        params.push("type", "recycle");
    }
}
