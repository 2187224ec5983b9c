//! Client configuration and credentials.

use std::fmt;
use std::time::Duration;

use pcs_protocol::Endpoint;
use pcs_protocol::constants::{
    CONNECT_TIMEOUT, MAX_REDIRECTS, POOL_MAX_IDLE_PER_HOST, TCP_KEEPALIVE,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::Error;

/// Opaque bearer credential attached to every request.
///
/// `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Transport and endpoint settings for a [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub control_url: String,
    pub upload_url: String,
    pub download_url: String,
    pub connect_timeout_secs: u64,
    /// Whole-request timeout; 0 disables it.
    pub request_timeout_secs: u64,
    pub tcp_keepalive_secs: u64,
    pub pool_max_idle_per_host: usize,
    /// Redirect hops followed before a 3xx is surfaced; 0 disables following.
    pub max_redirects: usize,
    pub accept_invalid_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            control_url: Endpoint::Control.default_base_url().into(),
            upload_url: Endpoint::Upload.default_base_url().into(),
            download_url: Endpoint::Download.default_base_url().into(),
            connect_timeout_secs: CONNECT_TIMEOUT.as_secs(),
            request_timeout_secs: 0,
            tcp_keepalive_secs: TCP_KEEPALIVE.as_secs(),
            pool_max_idle_per_host: POOL_MAX_IDLE_PER_HOST,
            max_redirects: MAX_REDIRECTS,
            accept_invalid_certs: false,
        }
    }
}

impl ClientConfig {
    /// Points all three endpoints at one base URL (local mocks, proxies).
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.control_url = url.into();
        self.upload_url = url.into();
        self.download_url = url.into();
        self
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn tcp_keepalive(&self) -> Duration {
        Duration::from_secs(self.tcp_keepalive_secs)
    }

    /// Checks every field and parses the endpoint URLs.
    pub fn validate(&self) -> Result<Endpoints, Error> {
        if self.connect_timeout_secs == 0 {
            return Err(Error::Config("connect_timeout_secs must be > 0".into()));
        }
        Endpoints::parse(&self.control_url, &self.upload_url, &self.download_url)
    }
}

/// Parsed base URLs, one per [`Endpoint`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    control: Url,
    upload: Url,
    download: Url,
}

impl Endpoints {
    pub fn parse(control: &str, upload: &str, download: &str) -> Result<Self, Error> {
        Ok(Self {
            control: parse_base(Endpoint::Control, control)?,
            upload: parse_base(Endpoint::Upload, upload)?,
            download: parse_base(Endpoint::Download, download)?,
        })
    }

    pub fn get(&self, endpoint: Endpoint) -> &Url {
        match endpoint {
            Endpoint::Control => &self.control,
            Endpoint::Upload => &self.upload,
            Endpoint::Download => &self.download,
        }
    }
}

fn parse_base(endpoint: Endpoint, raw: &str) -> Result<Url, Error> {
    let url = Url::parse(raw)
        .map_err(|e| Error::Config(format!("{endpoint} endpoint {raw:?}: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(Error::Config(format!(
            "{endpoint} endpoint {raw:?} must be an http(s) base URL"
        )));
    }
    if url.query().is_some() {
        return Err(Error::Config(format!(
            "{endpoint} endpoint {raw:?} must not carry a query"
        )));
    }
    Ok(url)
}
