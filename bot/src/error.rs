//! Error types for the Homework Bot.
//!
//! Every failure the poll loop can run into is one variant of [`BotError`].
//! The variant's message is what the operator sees, and [`BotError::stage`]
//! tells the logs which part of the cycle failed.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that can occur while polling, detecting or notifying.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BotError {
    /// The status endpoint could not be reached.
    #[error("endpoint request failed: {0}")]
    Transport(String),

    /// The status endpoint answered with a non-success status code.
    #[error("endpoint returned unexpected status: {status}")]
    BadStatus { status: u16 },

    /// The response body does not match the expected envelope.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// A homework item lacks a required field or has the wrong shape.
    #[error("malformed homework item: {0}")]
    MalformedItem(String),

    /// A homework status outside the known set.
    #[error("unknown homework status: {0}")]
    UnknownStatus(String),

    /// The messaging channel rejected or failed to deliver a message.
    #[error("message delivery failed: {0}")]
    Delivery(String),

    /// Configuration-related error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Poll cycle phase in which an error surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetching,
    Detecting,
    Notifying,
    Startup,
}

impl BotError {
    /// Returns the poll cycle phase this error belongs to.
    #[must_use]
    pub fn stage(&self) -> Stage {
        match self {
            Self::Transport(_) | Self::BadStatus { .. } | Self::MalformedResponse(_) => {
                Stage::Fetching
            }
            Self::MalformedItem(_) | Self::UnknownStatus(_) => Stage::Detecting,
            Self::Delivery(_) => Stage::Notifying,
            Self::Config(_) => Stage::Startup,
        }
    }
}

/// A specialized `Result` type for bot operations.
pub type Result<T> = std::result::Result<T, BotError>;
