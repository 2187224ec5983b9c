//! PCS API client.
//!
//! Async HTTP client using `reqwest`, authenticated by an access token in
//! the query string. Operations are split across `files`, `upload`,
//! `download` and `services`; this module holds the shared plumbing.

use std::time::Duration;

use bytes::Bytes;
use pcs_protocol::{Operation, QueryOptions};
use serde::de::DeserializeOwned;

use crate::config::{AccessToken, ClientConfig};
use crate::error::Error;
use crate::request::{OperationRequest, RequestBuilder};
use crate::response;
use crate::transport::Transport;

/// PCS API client.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct Client {
    transport: Transport,
    requests: RequestBuilder,
}

impl Client {
    /// Creates a client from a token and a configuration.
    pub fn new(token: AccessToken, config: &ClientConfig) -> Result<Self, Error> {
        if token.is_empty() {
            return Err(Error::Config("access token must not be empty".into()));
        }
        let endpoints = config.validate()?;
        Ok(Self {
            transport: Transport::new(config)?,
            requests: RequestBuilder::new(endpoints, token),
        })
    }

    /// Returns a handle sharing this client's pool whose requests time out
    /// after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut client = self.clone();
        client.transport.set_request_timeout(Some(timeout));
        client
    }

    /// The request builder, for callers that need the raw request.
    pub fn requests(&self) -> &RequestBuilder {
        &self.requests
    }

    pub(crate) fn request(
        &self,
        op: Operation,
        opts: &dyn QueryOptions,
    ) -> Result<OperationRequest, Error> {
        self.requests.build(op, Some(opts))
    }

    pub(crate) fn bare_request(&self, op: Operation) -> Result<OperationRequest, Error> {
        self.requests.build(op, None)
    }

    /// Sends `req` and decodes its JSON body.
    pub(crate) async fn json<T: DeserializeOwned>(&self, req: OperationRequest) -> Result<T, Error> {
        let context = req.context.clone();
        let raw = self.transport.execute(req).await?;
        let raw = response::check(&context, raw)?;
        response::decode_json(&context, &raw)
    }

    /// Sends `req` and returns its body verbatim.
    pub(crate) async fn raw(&self, req: OperationRequest) -> Result<Bytes, Error> {
        let context = req.context.clone();
        let raw = self.transport.execute(req).await?;
        Ok(response::check(&context, raw)?.body)
    }

    /// Sends `req` and returns the checked response with its body unread.
    pub(crate) async fn stream_response(&self, req: OperationRequest) -> Result<reqwest::Response, Error> {
        let context = req.context.clone();
        let resp = self.transport.send(req).await?;
        response::check_streaming(&context, resp).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockResponse, mock_server};

    #[test]
    fn client_new_succeeds() {
        let client = Client::new(AccessToken::new("tok"), &ClientConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn empty_token_rejected() {
        let err = Client::new(AccessToken::new(""), &ClientConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn timeout_applies_per_handle() {
        let server = mock_server(|_req| {
            MockResponse::json(200, r#"{"quota":1,"used":0}"#)
                .with_delay(Duration::from_millis(500))
        })
        .await;
        let client = server.client();

        let err = client
            .with_timeout(Duration::from_millis(50))
            .quota()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Transport);
        assert!(err.is_retryable());
    }
}
