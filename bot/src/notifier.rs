//! Rendering and delivery of chat notifications.
//!
//! - [`render`] / [`render_failure`] turn changes and errors into chat text
//! - [`Messenger`] is the delivery seam, implemented for Telegram by
//!   [`TelegramMessenger`] using the Bot API `sendMessage` method
//! - [`Notifier`] wraps a messenger with logging and quiets repeated
//!   identical delivery failures
//!
//! Delivery is best-effort: a failed message is reported to the caller once
//! and never retried here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::config::Secret;
use crate::error::{BotError, Result};
use crate::types::Homework;

/// HTTP request timeout for the Bot API.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Renders the chat message announcing a homework's current status.
#[must_use]
pub fn render(homework: &Homework) -> String {
    format!(
        "Homework status changed for \"{}\". {}",
        homework.name,
        homework.status.verdict()
    )
}

/// Renders the operator message for a failed poll cycle.
///
/// The returned text doubles as the error signature used for deduplication.
#[must_use]
pub fn render_failure(err: &BotError) -> String {
    format!("Program failure: {err}")
}

/// A channel that can deliver text messages to a fixed destination.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Sends `text` to the configured destination.
    async fn send_message(&self, text: &str) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct TgResponse {
    ok: bool,
    description: Option<String>,
}

/// Telegram Bot API messenger bound to one chat.
#[derive(Debug, Clone)]
pub struct TelegramMessenger {
    client: Client,
    api_url: String,
    token: Secret,
    chat_id: String,
}

impl TelegramMessenger {
    /// Creates a messenger posting to `chat_id` through the Bot API at `api_url`.
    ///
    /// # Errors
    ///
    /// Returns `BotError::Delivery` if the HTTP client cannot be built.
    pub fn new(api_url: impl Into<String>, token: Secret, chat_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| BotError::Delivery(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
            chat_id: chat_id.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_url, self.token.expose())
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&SendMessageRequest {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await
            // Strip the URL: it embeds the bot token.
            .map_err(|e| BotError::Delivery(e.without_url().to_string()))?;

        let status = response.status();
        let body: Option<TgResponse> = response.json().await.ok();

        match body {
            Some(TgResponse { ok: true, .. }) if status.is_success() => Ok(()),
            Some(TgResponse { description, .. }) => Err(BotError::Delivery(format!(
                "telegram returned {}: {}",
                status.as_u16(),
                description.unwrap_or_else(|| "no description".to_string())
            ))),
            None => Err(BotError::Delivery(format!(
                "telegram returned {} with unreadable body",
                status.as_u16()
            ))),
        }
    }
}

/// Delivers rendered notifications through a [`Messenger`].
pub struct Notifier<M> {
    messenger: M,
    last_failure: Option<String>,
}

impl<M: Messenger> Notifier<M> {
    pub fn new(messenger: M) -> Self {
        Self {
            messenger,
            last_failure: None,
        }
    }

    /// Returns the wrapped messenger.
    pub fn messenger(&self) -> &M {
        &self.messenger
    }

    /// Sends `message` once.
    ///
    /// # Errors
    ///
    /// Returns `BotError::Delivery` when the messenger fails. Consecutive
    /// identical failures are logged at debug level after the first.
    pub async fn notify(&mut self, message: &str) -> Result<()> {
        match self.messenger.send_message(message).await {
            Ok(()) => {
                info!(channel = self.messenger.name(), "Message sent");
                self.last_failure = None;
                Ok(())
            }
            Err(err) => {
                let text = err.to_string();
                if self.last_failure.as_deref() == Some(text.as_str()) {
                    debug!(channel = self.messenger.name(), error = %err, "Message delivery failed again");
                } else {
                    error!(channel = self.messenger.name(), error = %err, "Message delivery failed");
                    self.last_failure = Some(text);
                }
                Err(err)
            }
        }
    }
}
