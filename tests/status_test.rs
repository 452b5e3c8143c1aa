//! Integration tests for the status placeholder's edit fallbacks
//!
//! Run with: cargo test --test status_test

mod common;
mod mocks;

use common::USER_CHAT;
use mocks::{Call, RecordingTransport};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};
use teloxide::types::{MessageId, Seconds};
use teloxide::{ApiError, RequestError};
use vidrelay::core::AppError;
use vidrelay::download::{RelayStatus, StatusMessage};
use vidrelay::telegram::SentMessage;

fn not_modified() -> AppError {
    AppError::Telegram(RequestError::Api(ApiError::MessageNotModified))
}

fn flood_control(secs: u32) -> AppError {
    AppError::Telegram(RequestError::RetryAfter(Seconds::from_seconds(secs)))
}

async fn placeholder(transport: &RecordingTransport) -> StatusMessage {
    let mut status = StatusMessage::new(USER_CHAT);
    status.update(transport, &RelayStatus::Processing).await.unwrap();
    status
}

#[tokio::test]
async fn test_first_update_sends_then_edits() {
    let transport = RecordingTransport::new();
    let mut status = placeholder(&transport).await;
    let first = status.message().unwrap();

    status.update(&transport, &RelayStatus::Uploading).await.unwrap();

    assert_eq!(status.message(), Some(first));
    assert_eq!(
        transport.calls(),
        vec![
            Call::SendText {
                chat_id: USER_CHAT,
                text: "⏳ Processing...".into()
            },
            Call::EditText {
                message: first,
                text: "📤 Uploading...".into()
            },
        ]
    );
}

#[tokio::test]
async fn test_not_modified_counts_as_success() {
    let transport = RecordingTransport::new();
    let mut status = placeholder(&transport).await;
    let first = status.message().unwrap();
    transport.fail_next_edits([not_modified()]);

    status.update(&transport, &RelayStatus::Processing).await.unwrap();

    assert_eq!(status.message(), Some(first));
    assert_eq!(transport.sent_texts().len(), 1);
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn test_flood_control_waits_and_retries_once() {
    let transport = RecordingTransport::new();
    let mut status = placeholder(&transport).await;
    let first = status.message().unwrap();
    transport.fail_next_edits([flood_control(0)]);

    let started = Instant::now();
    status.update(&transport, &RelayStatus::Done).await.unwrap();

    // the hint is padded by one second
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(status.message(), Some(first));
    let edits: Vec<_> = transport
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::EditText { .. }))
        .collect();
    assert_eq!(edits.len(), 2);
    assert_eq!(transport.sent_texts().len(), 1);
}

#[tokio::test]
async fn test_flood_control_twice_sends_new_message() {
    let transport = RecordingTransport::new();
    let mut status = placeholder(&transport).await;
    let first = status.message().unwrap();
    transport.fail_next_edits([flood_control(0), flood_control(0)]);

    status.update(&transport, &RelayStatus::Done).await.unwrap();

    assert_ne!(status.message(), Some(first));
    assert_eq!(
        transport.sent_texts(),
        vec!["⏳ Processing...".to_string(), "✅ Done!".to_string()]
    );
}

#[tokio::test]
async fn test_other_edit_failure_sends_new_message() {
    let transport = RecordingTransport::new();
    let mut status = placeholder(&transport).await;
    let first = status.message().unwrap();
    transport.fail_next_edits([AppError::Telegram(RequestError::Api(ApiError::MessageToEditNotFound))]);

    status.update(&transport, &RelayStatus::Uploading).await.unwrap();

    let replacement = status.message().unwrap();
    assert_ne!(replacement, first);
    assert_eq!(replacement.chat_id, USER_CHAT);
    assert_eq!(
        transport.sent_texts(),
        vec!["⏳ Processing...".to_string(), "📤 Uploading...".to_string()]
    );

    // later updates edit the replacement
    status.update(&transport, &RelayStatus::Done).await.unwrap();
    assert_eq!(
        transport.calls().last(),
        Some(&Call::EditText {
            message: replacement,
            text: "✅ Done!".into()
        })
    );
}

#[tokio::test]
async fn test_existing_message_is_edited_first() {
    let transport = RecordingTransport::new();
    let prompt = SentMessage {
        chat_id: USER_CHAT,
        message_id: MessageId(42),
    };
    let mut status = StatusMessage::with_existing(prompt);

    status.report(&transport, RelayStatus::Processing).await;

    assert!(transport.sent_texts().is_empty());
    assert_eq!(
        transport.calls(),
        vec![Call::EditText {
            message: prompt,
            text: "⏳ Processing...".into()
        }]
    );
}
