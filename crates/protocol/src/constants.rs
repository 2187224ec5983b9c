use std::time::Duration;

/// Default base URL of the control endpoint (metadata, listing, merge, rapid upload).
pub const CONTROL_BASE_URL: &str = "https://pcs.baidu.com/rest/2.0/pcs";

/// Default base URL of the upload endpoint (direct and block uploads).
pub const UPLOAD_BASE_URL: &str = "https://c.pcs.baidu.com/rest/2.0/pcs";

/// Default base URL of the download endpoint.
pub const DOWNLOAD_BASE_URL: &str = "https://d.pcs.baidu.com/rest/2.0/pcs";

/// Query parameter carrying the access credential.
pub const PARAM_ACCESS_TOKEN: &str = "access_token";

/// Query parameter carrying the API method name.
pub const PARAM_METHOD: &str = "method";

/// Form parameter carrying JSON-encoded batch payloads.
pub const PARAM_JSON: &str = "param";

/// Multipart field name carrying uploaded file bytes.
pub const UPLOAD_FIELD: &str = "file";

/// Rapid upload is only attempted for files strictly larger than this (256 KiB).
pub const MIN_RAPID_UPLOAD_SIZE: u64 = 256 * 1024;

/// Length of the leading slice hashed into `slice-md5` (256 KiB).
pub const RAPID_SLICE_SIZE: u64 = 256 * 1024;

/// Minimum number of blocks a superfile merge accepts.
pub const MIN_BLOCKS: usize = 2;

/// Maximum number of blocks a superfile merge accepts.
pub const MAX_BLOCKS: usize = 1024;

/// Maximum length of a remote path in characters.
pub const MAX_PATH_LEN: usize = 1000;

/// Characters the service rejects anywhere in a remote path.
pub const FORBIDDEN_PATH_CHARS: &[char] = &['\\', '?', '|', '"', '>', '<', ':', '*'];

/// Idle connections kept per host by the connection pool.
pub const POOL_MAX_IDLE_PER_HOST: usize = 160;

/// Timeout for establishing a TCP connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// TCP keep-alive interval for pooled connections.
pub const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

/// Redirect hops followed before a 3xx is surfaced to the caller.
pub const MAX_REDIRECTS: usize = 10;
