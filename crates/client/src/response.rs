//! Status classification and body decoding.

use bytes::Bytes;
use pcs_protocol::ErrorBody;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, LOCATION};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{ApiError, Context, Error};
use crate::transport::{RawResponse, transport_error};

/// Passes 2xx responses through and turns everything else into an error.
pub fn check(context: &Context, raw: RawResponse) -> Result<RawResponse, Error> {
    if raw.status.is_success() {
        return Ok(raw);
    }
    Err(classify(context, raw.status, &raw.headers, &raw.body))
}

/// Decodes a 2xx JSON body into `T`.
pub fn decode_json<T: DeserializeOwned>(context: &Context, raw: &RawResponse) -> Result<T, Error> {
    serde_json::from_slice(&raw.body).map_err(|source| Error::Decode {
        context: context.clone(),
        source,
    })
}

/// Checks the status of a response whose body has not been read yet.
///
/// On failure the body is read to build the error.
pub async fn check_streaming(
    context: &Context,
    resp: reqwest::Response,
) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let headers = resp.headers().clone();
    let body = resp
        .bytes()
        .await
        .map_err(|e| transport_error(context, e))?;
    Err(classify(context, status, &headers, &body))
}

/// Builds the error for a non-2xx response.
///
/// A 3xx reaching this point was not followed by the transport; it is
/// reported with its `Location` rather than dropped.
pub fn classify(context: &Context, status: StatusCode, headers: &HeaderMap, body: &Bytes) -> Error {
    if status.is_redirection() {
        let location = headers
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        warn!(
            operation = %context.operation,
            status = status.as_u16(),
            has_location = location.is_some(),
            "redirect not followed"
        );
        return Error::Redirect {
            context: context.clone(),
            status: status.as_u16(),
            location,
        };
    }

    let parsed = serde_json::from_slice::<ErrorBody>(body).unwrap_or_default();
    Error::Api {
        context: context.clone(),
        error: ApiError {
            status: status.as_u16(),
            message: parsed.error_msg,
            code: parsed.error_code,
            body: String::from_utf8_lossy(body).into_owned(),
        },
    }
}
