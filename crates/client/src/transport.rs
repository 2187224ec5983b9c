//! Pooled HTTP transport.

use std::time::Duration;

use bytes::Bytes;
use pcs_protocol::HttpVerb;
use pcs_protocol::constants::UPLOAD_FIELD;
use reqwest::header::{HeaderMap, RANGE};
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, redirect};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{Context, Error};
use crate::request::{OperationRequest, RequestBody};

/// A completed response with its body read into memory.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Executes [`OperationRequest`]s over one shared connection pool.
#[derive(Debug, Clone)]
pub struct Transport {
    http: reqwest::Client,
    request_timeout: Option<Duration>,
}

impl Transport {
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let policy = match config.max_redirects {
            0 => redirect::Policy::none(),
            n => redirect::Policy::limited(n),
        };

        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .connect_timeout(config.connect_timeout())
            .tcp_keepalive(config.tcp_keepalive())
            .redirect(policy)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            request_timeout: config.request_timeout(),
        })
    }

    /// Overrides the whole-request timeout for every request sent through
    /// this handle.
    pub fn set_request_timeout(&mut self, timeout: Option<Duration>) {
        self.request_timeout = timeout;
    }

    /// Sends the request and returns the response with its body unread.
    pub async fn send(&self, req: OperationRequest) -> Result<reqwest::Response, Error> {
        let OperationRequest {
            context,
            verb,
            url,
            body,
            range,
        } = req;

        debug!(
            operation = %context.operation,
            endpoint = %context.operation.endpoint,
            path = context.target.as_deref().unwrap_or(""),
            "sending request"
        );

        let mut builder = match verb {
            HttpVerb::Get => self.http.get(url.clone()),
            HttpVerb::PostForm | HttpVerb::PostMultipart => self.http.post(url.clone()),
        };
        if let Some(range) = range {
            builder = builder.header(RANGE, range.header_value());
        }
        if let Some(timeout) = self.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder = match body {
            RequestBody::Empty if verb == HttpVerb::PostForm => {
                builder.form(&[] as &[(&str, &str)])
            }
            RequestBody::Empty => builder,
            RequestBody::Form(pairs) => builder.form(&pairs),
            RequestBody::Multipart { file_name, data } => {
                let part = Part::bytes(data.to_vec()).file_name(file_name);
                builder.multipart(Form::new().part(UPLOAD_FIELD, part))
            }
        };

        let resp = builder
            .send()
            .await
            .map_err(|e| transport_error(&context, e))?;

        // Only host and path: the query carries the access token.
        if resp.url().host_str() != url.host_str() || resp.url().path() != url.path() {
            debug!(
                operation = %context.operation,
                host = resp.url().host_str().unwrap_or(""),
                path = resp.url().path(),
                "followed redirect"
            );
        }

        Ok(resp)
    }

    /// Sends the request and reads the whole body.
    pub async fn execute(&self, req: OperationRequest) -> Result<RawResponse, Error> {
        let context = req.context.clone();
        let resp = self.send(req).await?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp
            .bytes()
            .await
            .map_err(|e| transport_error(&context, e))?;

        debug!(
            operation = %context.operation,
            status = status.as_u16(),
            bytes = body.len(),
            "received response"
        );

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

/// Wraps a reqwest error, dropping the URL so the token never reaches logs.
pub(crate) fn transport_error(context: &Context, err: reqwest::Error) -> Error {
    Error::Transport {
        context: context.clone(),
        source: err.without_url(),
    }
}
