//! Domain types for homework status tracking.
//!
//! These types describe what the bot observes on each poll: the homework
//! items returned by the status endpoint, the closed set of review statuses,
//! and the changes the detector hands on to the notifier.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BotError;

/// Lower bound (seconds since the Unix epoch) for the next status fetch.
pub type Cursor = i64;

/// Returns the cursor used on startup: `lookback_days` before now.
#[must_use]
pub fn initial_cursor(lookback_days: u32) -> Cursor {
    (Utc::now() - Duration::days(i64::from(lookback_days))).timestamp()
}

/// Review status of a homework submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HomeworkStatus {
    Approved,
    Reviewing,
    Rejected,
}

impl HomeworkStatus {
    /// Wire representation used by the status endpoint.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Reviewing => "reviewing",
            Self::Rejected => "rejected",
        }
    }

    /// Human-readable verdict sent to the chat.
    #[must_use]
    pub fn verdict(&self) -> &'static str {
        match self {
            Self::Approved => "The work has been reviewed: the reviewer liked everything. Hooray!",
            Self::Reviewing => "The work has been taken for review by a reviewer.",
            Self::Rejected => "The work has been reviewed: the reviewer has comments.",
        }
    }
}

impl fmt::Display for HomeworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HomeworkStatus {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approved" => Ok(Self::Approved),
            "reviewing" => Ok(Self::Reviewing),
            "rejected" => Ok(Self::Rejected),
            other => Err(BotError::UnknownStatus(other.to_string())),
        }
    }
}

/// A single homework item as reported by the status endpoint.
///
/// `name` is both the stable identifier and the display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Homework {
    #[serde(rename = "homework_name")]
    pub name: String,
    pub status: HomeworkStatus,
}

impl Homework {
    pub fn new(name: impl Into<String>, status: HomeworkStatus) -> Self {
        Self {
            name: name.into(),
            status,
        }
    }
}

/// Decoded response of one successful fetch.
///
/// Items are kept as raw JSON values; per-item validation belongs to the
/// change detector so that a bad item fails detection, not the fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub items: Vec<serde_json::Value>,
    pub next_cursor: Cursor,
}

/// How a detected change relates to what was seen before.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// First sighting of this homework during the run.
    New,
    /// Status differs from the stored one.
    Changed { previous: HomeworkStatus },
}

/// A homework whose status needs to be announced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub homework: Homework,
    pub kind: ChangeKind,
}

impl Change {
    #[must_use]
    pub fn is_new(&self) -> bool {
        matches!(self.kind, ChangeKind::New)
    }
}
