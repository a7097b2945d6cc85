//! Homework status fetching.
//!
//! [`StatusSource`] is the seam the poll loop fetches through;
//! [`PracticumClient`] is the reqwest-backed implementation that talks to
//! the homework status endpoint.
//!
//! A fetch performs exactly one request. Retrying is left to the poll loop,
//! which simply fetches again on its next cycle.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use crate::config::Secret;
use crate::error::{BotError, Result};
use crate::types::{Cursor, FetchResult};

/// HTTP request timeout.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Envelope field holding the homework list.
const HOMEWORKS_KEY: &str = "homeworks";

/// Envelope field holding the next cursor.
const CURRENT_DATE_KEY: &str = "current_date";

/// Something that can report homework items changed since a cursor.
#[async_trait]
pub trait StatusSource: Send + Sync {
    /// Fetches items updated at or after `cursor`.
    async fn fetch(&self, cursor: Cursor) -> Result<FetchResult>;
}

/// Client for the homework status endpoint.
#[derive(Debug, Clone)]
pub struct PracticumClient {
    client: Client,
    endpoint: String,
    headers: HeaderMap,
}

impl PracticumClient {
    /// Creates a client for `endpoint` authenticating with `token`.
    ///
    /// # Errors
    ///
    /// Returns `BotError::Transport` if the token is not a valid header value
    /// or the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, token: &Secret) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BotError::Transport(format!("failed to build HTTP client: {e}")))?;

        let mut auth = HeaderValue::from_str(&format!("OAuth {}", token.expose()))
            .map_err(|e| BotError::Transport(format!("invalid authorization header: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            headers,
        })
    }

    /// Returns the configured endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StatusSource for PracticumClient {
    async fn fetch(&self, cursor: Cursor) -> Result<FetchResult> {
        debug!(endpoint = %self.endpoint, from_date = cursor, "Requesting homework statuses");

        let response = self
            .client
            .get(&self.endpoint)
            .headers(self.headers.clone())
            .query(&[("from_date", cursor)])
            .send()
            .await
            .map_err(|e| BotError::Transport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(BotError::BadStatus {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| BotError::Transport(format!("failed to read response body: {e}")))?;

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| BotError::MalformedResponse(format!("response is not JSON: {e}")))?;

        check_response(value)
    }
}

/// Validates the response envelope and splits it into items and cursor.
///
/// # Errors
///
/// Returns `BotError::MalformedResponse` if the body is not an object, has no
/// `homeworks` list, or has no integer `current_date`.
pub fn check_response(value: Value) -> Result<FetchResult> {
    let mut envelope = match value {
        Value::Object(envelope) => envelope,
        other => {
            return Err(BotError::MalformedResponse(format!(
                "response is not an object: {other}"
            )))
        }
    };

    let items = match envelope.remove(HOMEWORKS_KEY) {
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(BotError::MalformedResponse(format!(
                "'{HOMEWORKS_KEY}' is not a list: {other}"
            )))
        }
        None => {
            return Err(BotError::MalformedResponse(format!(
                "missing '{HOMEWORKS_KEY}' key"
            )))
        }
    };

    let next_cursor = match envelope.get(CURRENT_DATE_KEY) {
        Some(date) => date.as_i64().ok_or_else(|| {
            BotError::MalformedResponse(format!("'{CURRENT_DATE_KEY}' is not an integer: {date}"))
        })?,
        None => {
            return Err(BotError::MalformedResponse(format!(
                "missing '{CURRENT_DATE_KEY}' key"
            )))
        }
    };

    Ok(FetchResult { items, next_cursor })
}
