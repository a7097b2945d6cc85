//! The poll loop: fetch, detect, notify, sleep, repeat.
//!
//! [`PollLoop`] owns all mutable state of a run: the cursor, the status table
//! and the signature of the last reported failure. Each cycle is strictly
//! sequential; the only point where the loop yields to the outside world is
//! the sleep between cycles, which is also where a shutdown request is
//! honoured.
//!
//! # Cursor policy
//!
//! - fetch fails: cursor stays where it is
//! - fetch succeeds: cursor moves to the server's `current_date` after the
//!   cycle's changes were processed, even if detection or delivery failed
//!
//! # Failure reports
//!
//! Every failed cycle is logged. The operator is only messaged when the
//! failure text differs from the last one reported, so a failure that
//! persists across cycles produces a single chat message. A successful cycle
//! does not reset this.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::detector::{detect, StatusTable};
use crate::error::{BotError, Result};
use crate::fetcher::StatusSource;
use crate::notifier::{render, render_failure, Messenger, Notifier};
use crate::types::{Change, Cursor};

/// What happened during one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Change notifications delivered.
    pub notified: usize,

    /// Change notifications that could not be delivered.
    pub delivery_failures: usize,

    /// The failure that ended the cycle, if any.
    pub error: Option<BotError>,

    /// Whether the failure was new and an operator report was attempted.
    pub reported: bool,
}

impl CycleOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Drives the fetch → detect → notify cycle on a fixed interval.
pub struct PollLoop<S, M> {
    source: S,
    notifier: Notifier<M>,
    table: StatusTable,
    cursor: Cursor,
    last_error: Option<String>,
    poll_interval: Duration,
}

impl<S, M> PollLoop<S, M>
where
    S: StatusSource,
    M: Messenger,
{
    /// Creates a loop starting at `cursor` with an empty status table.
    pub fn new(source: S, messenger: M, cursor: Cursor, poll_interval: Duration) -> Self {
        Self {
            source,
            notifier: Notifier::new(messenger),
            table: StatusTable::new(),
            cursor,
            last_error: None,
            poll_interval,
        }
    }

    /// Current cursor.
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Statuses observed so far.
    #[must_use]
    pub fn table(&self) -> &StatusTable {
        &self.table
    }

    /// Text of the last failure reported to the operator.
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Returns the status source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the messenger used for all notifications.
    pub fn messenger(&self) -> &M {
        self.notifier.messenger()
    }

    /// Runs cycles until `shutdown` completes.
    ///
    /// Shutdown is only observed between cycles; a cycle in progress always
    /// runs to completion.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(
            cursor = self.cursor,
            interval_secs = self.poll_interval.as_secs(),
            "Poll loop started"
        );

        loop {
            let outcome = self.run_cycle().await;
            debug!(
                notified = outcome.notified,
                delivery_failures = outcome.delivery_failures,
                success = outcome.is_success(),
                "Poll cycle finished"
            );

            tokio::select! {
                () = &mut shutdown => {
                    info!("Shutdown requested, stopping poll loop");
                    break;
                }
                () = sleep(self.poll_interval) => {}
            }
        }
    }

    /// Runs a single fetch → detect → notify pass without sleeping.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let mut outcome = CycleOutcome::default();

        if let Err(err) = self.poll(&mut outcome).await {
            outcome.reported = self.report_failure(&err).await;
            outcome.error = Some(err);
        }

        outcome
    }

    async fn poll(&mut self, outcome: &mut CycleOutcome) -> Result<()> {
        let fetched = self.source.fetch(self.cursor).await?;

        let result = match detect(&fetched.items, &mut self.table) {
            Ok(changes) => self.deliver(&changes, outcome).await,
            Err(err) => Err(err),
        };

        self.commit_cursor(fetched.next_cursor);
        result
    }

    /// Announces each change in order. Fails only if nothing got through.
    async fn deliver(&mut self, changes: &[Change], outcome: &mut CycleOutcome) -> Result<()> {
        if changes.is_empty() {
            debug!("No status changes");
            return Ok(());
        }

        let mut last_failure = None;

        for change in changes {
            info!(
                homework = %change.homework.name,
                status = %change.homework.status,
                new = change.is_new(),
                "Homework status changed"
            );

            match self.notifier.notify(&render(&change.homework)).await {
                Ok(()) => outcome.notified += 1,
                Err(err) => {
                    outcome.delivery_failures += 1;
                    last_failure = Some(err);
                }
            }
        }

        match last_failure {
            Some(err) if outcome.notified == 0 => Err(err),
            Some(_) => {
                warn!(
                    delivered = outcome.notified,
                    failed = outcome.delivery_failures,
                    "Some notifications were not delivered"
                );
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn commit_cursor(&mut self, next: Cursor) {
        if next < self.cursor {
            warn!(
                cursor = self.cursor,
                server_cursor = next,
                "Server cursor moved backwards, keeping current cursor"
            );
            return;
        }
        debug!(from = self.cursor, to = next, "Cursor advanced");
        self.cursor = next;
    }

    /// Logs a failed cycle and messages the operator if the failure is new.
    ///
    /// Returns whether a report was attempted. A report that cannot be
    /// delivered is only logged.
    async fn report_failure(&mut self, err: &BotError) -> bool {
        error!(error = %err, stage = ?err.stage(), cursor = self.cursor, "Poll cycle failed");

        let message = render_failure(err);
        if self.last_error.as_deref() == Some(message.as_str()) {
            info!("Same failure as last reported, not notifying again");
            return false;
        }

        self.last_error = Some(message.clone());

        if let Err(report_err) = self.notifier.notify(&message).await {
            warn!(error = %report_err, "Could not report failure to operator");
        }
        true
    }
}
