//! Homework Bot - homework review status notifier.
//!
//! This crate polls a homework status endpoint, works out which homework
//! submissions changed review status since the last poll, and announces the
//! changes in a Telegram chat.
//!
//! # Overview
//!
//! Each poll cycle fetches everything updated since the current cursor,
//! compares it with the statuses seen earlier in the run, sends one message
//! per new or changed homework, then sleeps for a fixed interval. Failures
//! are logged and reported to the chat once per distinct failure.
//!
//! Nothing is persisted: the cursor and status table live for one run.
//!
//! # Modules
//!
//! - [`types`]: Homework, status and change types
//! - [`config`]: Configuration from environment variables
//! - [`error`]: Error taxonomy for the poll cycle
//! - [`fetcher`]: Status endpoint client and response validation
//! - [`detector`]: Status table and change detection
//! - [`notifier`]: Message rendering and Telegram delivery
//! - [`poller`]: The poll loop state machine

pub mod config;
pub mod detector;
pub mod error;
pub mod fetcher;
pub mod notifier;
pub mod poller;
pub mod types;

pub use config::{Config, ConfigError, Secret};
pub use detector::{detect, parse_homework, StatusTable};
pub use error::{BotError, Result, Stage};
pub use fetcher::{check_response, PracticumClient, StatusSource};
pub use notifier::{render, render_failure, Messenger, Notifier, TelegramMessenger};
pub use poller::{CycleOutcome, PollLoop};
pub use types::{initial_cursor, Change, ChangeKind, Cursor, FetchResult, Homework, HomeworkStatus};
