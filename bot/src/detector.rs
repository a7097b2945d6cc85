//! Status change detection.
//!
//! The [`StatusTable`] remembers the last status seen for every homework in
//! this run. [`detect`] compares a freshly fetched batch against it and
//! returns the items that appeared for the first time or changed status.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::error::{BotError, Result};
use crate::types::{Change, ChangeKind, Homework, HomeworkStatus};

/// Last observed status per homework name.
///
/// Entries are only ever inserted or updated, never removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusTable {
    statuses: HashMap<String, HomeworkStatus>,
}

impl StatusTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored status for `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<HomeworkStatus> {
        self.statuses.get(name).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Records `homework` and reports how it differs from what was stored.
    fn observe(&mut self, homework: &Homework) -> Option<ChangeKind> {
        match self.statuses.insert(homework.name.clone(), homework.status) {
            None => Some(ChangeKind::New),
            Some(previous) if previous != homework.status => Some(ChangeKind::Changed { previous }),
            Some(_) => None,
        }
    }
}

/// Validates one raw item from the endpoint.
///
/// # Errors
///
/// - `BotError::MalformedItem` if the item is not an object or lacks a string
///   `homework_name` or `status`
/// - `BotError::UnknownStatus` if the status is not one of the known values
pub fn parse_homework(item: &Value) -> Result<Homework> {
    let Some(fields) = item.as_object() else {
        return Err(BotError::MalformedItem(format!("item is not an object: {item}")));
    };

    let name = string_field(fields, "homework_name")?;
    let status = string_field(fields, "status")?.parse::<HomeworkStatus>()?;

    Ok(Homework::new(name, status))
}

fn string_field<'a>(fields: &'a serde_json::Map<String, Value>, key: &str) -> Result<&'a str> {
    match fields.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(BotError::MalformedItem(format!(
            "'{key}' is not a string: {other}"
        ))),
        None => Err(BotError::MalformedItem(format!("missing '{key}' key"))),
    }
}

/// Compares `items` against `table`, updating it, and returns the changes.
///
/// Changes come back in the order the items were received. The whole batch
/// is validated before the table is touched, so a failing batch leaves the
/// table exactly as it was.
///
/// # Errors
///
/// Returns the first `MalformedItem` or `UnknownStatus` error in the batch.
pub fn detect(items: &[Value], table: &mut StatusTable) -> Result<Vec<Change>> {
    let homeworks = items
        .iter()
        .map(parse_homework)
        .collect::<Result<Vec<_>>>()?;

    let changes: Vec<Change> = homeworks
        .into_iter()
        .filter_map(|homework| {
            let kind = table.observe(&homework)?;
            Some(Change { homework, kind })
        })
        .collect();

    debug!(
        items = items.len(),
        changes = changes.len(),
        tracked = table.len(),
        "Detected status changes"
    );

    Ok(changes)
}
