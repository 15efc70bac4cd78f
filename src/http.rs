//! Shared HTTP plumbing for feed and media requests.
//!
//! Both pipeline stages issue a plain GET, reject non-2xx responses and bound
//! the wait with the configured timeout. This module owns that behavior plus
//! the [`FetchError`] type both stages surface.

use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

use crate::util::validate_url;

/// Errors that can occur while talking to a feed or media server.
#[derive(Debug, Error)]
pub enum FetchError {
    /// URL could not be parsed or uses a scheme other than http/https
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: u64 },
}

/// Builds the client shared by every feed in a run.
///
/// No client-level timeout is set: feed and media requests apply their own
/// bounds, and a whole-request timeout would cut off long media downloads.
pub fn build_client(user_agent: &str) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder().user_agent(user_agent).build()
}

/// Sends a GET and waits (bounded by `timeout`) for a 2xx response head.
pub async fn get_checked(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<reqwest::Response, FetchError> {
    let url = validate_url(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;

    let response = tokio::time::timeout(timeout, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    Ok(response)
}

/// Reads a whole response body into memory, refusing anything over `limit`.
pub async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Capture Content-Length for completeness check
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    check_complete(expected_length, bytes.len() as u64)?;

    Ok(bytes)
}

/// Fails when fewer bytes arrived than the server announced.
pub fn check_complete(expected: Option<u64>, received: u64) -> Result<(), FetchError> {
    match expected {
        Some(expected) if received < expected => {
            Err(FetchError::IncompleteResponse { expected, received })
        }
        _ => Ok(()),
    }
}
