//! Integration tests for the poll loop.
//!
//! The first group drives [`PollLoop`] with a scripted status source and a
//! recording messenger through a sequence of cycles. The last test wires the
//! real HTTP clients to wiremock servers.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use homework_bot::config::Secret;
use homework_bot::error::{BotError, Result};
use homework_bot::fetcher::{PracticumClient, StatusSource};
use homework_bot::notifier::{Messenger, TelegramMessenger};
use homework_bot::poller::PollLoop;
use homework_bot::types::{Cursor, FetchResult, HomeworkStatus};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// =============================================================================
// Test Helpers
// =============================================================================

/// Source that replays canned responses and records the cursors it was asked for.
struct ScriptedSource {
    responses: Mutex<VecDeque<Result<FetchResult>>>,
    requested: Mutex<Vec<Cursor>>,
}

impl ScriptedSource {
    fn new(responses: Vec<Result<FetchResult>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl StatusSource for ScriptedSource {
    async fn fetch(&self, cursor: Cursor) -> Result<FetchResult> {
        self.requested.lock().unwrap().push(cursor);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BotError::Transport("script exhausted".into())))
    }
}

/// Messenger that records every message it is asked to send.
#[derive(Default)]
struct RecordingMessenger {
    sent: Mutex<Vec<String>>,
}

impl RecordingMessenger {
    fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send_message(&self, text: &str) -> Result<()> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn response(items: serde_json::Value, current_date: Cursor) -> Result<FetchResult> {
    let serde_json::Value::Array(items) = items else {
        panic!("items must be a JSON array");
    };
    Ok(FetchResult {
        items,
        next_cursor: current_date,
    })
}

fn create_poll_loop(
    responses: Vec<Result<FetchResult>>,
) -> PollLoop<ScriptedSource, RecordingMessenger> {
    PollLoop::new(
        ScriptedSource::new(responses),
        RecordingMessenger::default(),
        0,
        Duration::from_secs(600),
    )
}

// =============================================================================
// Scenarios
// =============================================================================

/// Walks through first sighting, unchanged status and a transition.
#[tokio::test]
async fn test_status_lifecycle_scenarios() {
    let mut poll_loop = create_poll_loop(vec![
        response(json!([{"homework_name": "hw1", "status": "reviewing"}]), 1000),
        response(json!([{"homework_name": "hw1", "status": "reviewing"}]), 1600),
        response(json!([{"homework_name": "hw1", "status": "approved"}]), 2200),
    ]);

    // First sighting.
    let outcome = poll_loop.run_cycle().await;
    assert!(outcome.is_success());
    assert_eq!(outcome.notified, 1);
    assert_eq!(poll_loop.cursor(), 1000);
    assert_eq!(poll_loop.table().get("hw1"), Some(HomeworkStatus::Reviewing));
    let sent = poll_loop.messenger().sent();
    assert!(sent[0].contains("hw1"));
    assert!(sent[0].contains(HomeworkStatus::Reviewing.verdict()));

    // Same status again.
    let outcome = poll_loop.run_cycle().await;
    assert!(outcome.is_success());
    assert_eq!(outcome.notified, 0);
    assert_eq!(poll_loop.cursor(), 1600);
    assert_eq!(poll_loop.messenger().sent().len(), 1);

    // Transition to approved.
    let outcome = poll_loop.run_cycle().await;
    assert_eq!(outcome.notified, 1);
    assert_eq!(poll_loop.cursor(), 2200);
    let sent = poll_loop.messenger().sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[1].contains("hw1"));
    assert!(sent[1].contains(HomeworkStatus::Approved.verdict()));
    assert_eq!(poll_loop.table().get("hw1"), Some(HomeworkStatus::Approved));
}

/// The cursor sent to the source is the one committed by the previous cycle.
#[tokio::test]
async fn test_cursor_feeds_next_fetch() {
    let mut poll_loop = create_poll_loop(vec![
        response(json!([]), 1000),
        Err(BotError::BadStatus { status: 503 }),
        response(json!([]), 1600),
    ]);

    poll_loop.run_cycle().await;
    poll_loop.run_cycle().await;
    poll_loop.run_cycle().await;

    assert_eq!(poll_loop.cursor(), 1600);
    assert_eq!(
        *poll_loop.source().requested.lock().unwrap(),
        vec![0, 1000, 1000]
    );
}

/// A repeated 503 is reported once.
#[tokio::test]
async fn test_identical_failures_notify_once() {
    let mut poll_loop = create_poll_loop(vec![
        Err(BotError::BadStatus { status: 503 }),
        Err(BotError::BadStatus { status: 503 }),
    ]);

    let first = poll_loop.run_cycle().await;
    let second = poll_loop.run_cycle().await;

    assert!(first.reported);
    assert!(!second.reported);
    assert_eq!(second.error, Some(BotError::BadStatus { status: 503 }));

    let sent = poll_loop.messenger().sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("503"));
    assert_eq!(poll_loop.cursor(), 0);
}

#[tokio::test]
async fn test_different_failures_notify_each() {
    let mut poll_loop = create_poll_loop(vec![
        Err(BotError::BadStatus { status: 503 }),
        Err(BotError::Transport("connection reset".into())),
    ]);

    assert!(poll_loop.run_cycle().await.reported);
    assert!(poll_loop.run_cycle().await.reported);
    assert_eq!(poll_loop.messenger().sent().len(), 2);
}

/// A success between two identical failures does not re-arm the report.
#[tokio::test]
async fn test_success_does_not_reset_failure_signature() {
    let mut poll_loop = create_poll_loop(vec![
        Err(BotError::BadStatus { status: 503 }),
        response(json!([]), 500),
        Err(BotError::BadStatus { status: 503 }),
    ]);

    poll_loop.run_cycle().await;
    poll_loop.run_cycle().await;
    let third = poll_loop.run_cycle().await;

    assert!(!third.reported);
    assert_eq!(poll_loop.messenger().sent().len(), 1);
}

/// An unknown status fails the cycle but the cursor still advances.
#[tokio::test]
async fn test_unknown_status_advances_cursor() {
    let mut poll_loop = create_poll_loop(vec![response(
        json!([{"homework_name": "hw1", "status": "unknown_value"}]),
        2800,
    )]);

    let outcome = poll_loop.run_cycle().await;

    assert_eq!(
        outcome.error,
        Some(BotError::UnknownStatus("unknown_value".to_string()))
    );
    assert_eq!(poll_loop.cursor(), 2800);
    assert!(poll_loop.table().is_empty());

    let sent = poll_loop.messenger().sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].contains("unknown_value"));
}

#[tokio::test]
async fn test_malformed_item_advances_cursor() {
    let mut poll_loop = create_poll_loop(vec![response(json!([{"status": "approved"}]), 900)]);

    let outcome = poll_loop.run_cycle().await;

    assert!(matches!(outcome.error, Some(BotError::MalformedItem(_))));
    assert_eq!(poll_loop.cursor(), 900);
}

/// Replaying the same response produces no further notifications.
#[tokio::test]
async fn test_replay_is_idempotent() {
    let items = json!([
        {"homework_name": "hw1", "status": "approved"},
        {"homework_name": "hw2", "status": "rejected"}
    ]);
    let mut poll_loop = create_poll_loop(vec![
        response(items.clone(), 100),
        response(items, 100),
    ]);

    assert_eq!(poll_loop.run_cycle().await.notified, 2);
    assert_eq!(poll_loop.run_cycle().await.notified, 0);
    assert_eq!(poll_loop.messenger().sent().len(), 2);
    assert_eq!(poll_loop.table().len(), 2);
}

// =============================================================================
// End to end
// =============================================================================

/// Real clients against wiremock: one status change, then one failure report.
#[tokio::test]
async fn test_end_to_end_with_http_clients() {
    let api = MockServer::start().await;
    let telegram = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/statuses/"))
        .and(query_param("from_date", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "homeworks": [{"homework_name": "hw1", "status": "reviewing"}],
            "current_date": 1000
        })))
        .mount(&api)
        .await;

    Mock::given(method("GET"))
        .and(path("/statuses/"))
        .and(query_param("from_date", "1000"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&api)
        .await;

    Mock::given(method("POST"))
        .and(path("/bottoken/sendMessage"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(2)
        .mount(&telegram)
        .await;

    let source = PracticumClient::new(format!("{}/statuses/", api.uri()), &Secret::new("t"))
        .expect("source should build");
    let messenger = TelegramMessenger::new(telegram.uri(), Secret::new("token"), "42")
        .expect("messenger should build");
    let mut poll_loop = PollLoop::new(source, messenger, 10, Duration::from_secs(600));

    let first = poll_loop.run_cycle().await;
    assert!(first.is_success());
    assert_eq!(first.notified, 1);
    assert_eq!(poll_loop.cursor(), 1000);

    let second = poll_loop.run_cycle().await;
    assert_eq!(second.error, Some(BotError::BadStatus { status: 500 }));
    assert!(second.reported);

    let third = poll_loop.run_cycle().await;
    assert!(!third.reported);
    assert_eq!(poll_loop.cursor(), 1000);
}
