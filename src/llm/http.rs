//! HTTP plumbing shared by the chat clients.
//!
//! A request is sent exactly once. Transport failures surface as
//! `WardenError::Llm` and are never retried here.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{Result, WardenError};

/// Status and body of a completed HTTP exchange.
#[derive(Debug)]
pub(crate) struct Reply {
    pub status: StatusCode,
    pub body: String,
}

/// Builds a client with the given request timeout.
pub(crate) fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| WardenError::llm(format!("Failed to create HTTP client: {e}")))
}

/// Sends `request` and reads the whole body. `service` names the endpoint
/// in error messages.
pub(crate) async fn send_once(
    request: RequestBuilder,
    service: &str,
    timeout_secs: u64,
) -> Result<Reply> {
    let response = request
        .send()
        .await
        .map_err(|e| transport_error(&e, service, timeout_secs))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| WardenError::llm(format!("Failed to read response from {service}: {e}")))?;

    Ok(Reply { status, body })
}

/// Decodes a successful JSON body.
pub(crate) fn decode<T: DeserializeOwned>(body: &str, service: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| WardenError::llm(format!("Unexpected response from {service}: {e}")))
}

fn transport_error(e: &reqwest::Error, service: &str, timeout_secs: u64) -> WardenError {
    if e.is_timeout() {
        WardenError::llm(format!(
            "Request to {service} timed out after {timeout_secs} seconds"
        ))
    } else if e.is_connect() {
        WardenError::llm(format!(
            "Failed to connect to {service}. Is the server running?"
        ))
    } else {
        WardenError::llm(format!("Request to {service} failed: {e}"))
    }
}
