//! Transport that records every outbound call
//!
//! File uploads also record whether the file was still on disk when it was
//! sent, so tests can check that cleanup happens after delivery.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Mutex;
use teloxide::types::{ChatId, MessageId};
use vidrelay::core::AppError;
use vidrelay::telegram::{ChatTransport, MediaUpload, PromptButton, SentMessage, UploadKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SendText {
        chat_id: ChatId,
        text: String,
    },
    EditText {
        message: SentMessage,
        text: String,
    },
    SendFile {
        chat_id: ChatId,
        path: PathBuf,
        /// File existed when the upload started
        existed: bool,
        size: u64,
        caption: String,
        has_thumbnail: bool,
        kind: UploadKind,
    },
    Forward {
        message: SentMessage,
        target: ChatId,
    },
    SendPrompt {
        /// Message the prompt became
        message: SentMessage,
        text: String,
        payloads: Vec<String>,
    },
    EditPrompt {
        message: SentMessage,
        text: String,
        payloads: Vec<String>,
    },
}

#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<Call>>,
    next_id: AtomicI32,
    failing_uploads: Mutex<HashSet<ChatId>>,
    fail_forward: AtomicBool,
    /// Errors returned by the next edits, one per edit
    edit_errors: Mutex<VecDeque<AppError>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `send_file` to `chat_id` fails from now on.
    pub fn fail_uploads_to(&self, chat_id: ChatId) {
        self.failing_uploads.lock().unwrap().insert(chat_id);
    }

    pub fn fail_forwards(&self) {
        self.fail_forward.store(true, Ordering::SeqCst);
    }

    /// The next edits fail with these errors, in order.
    pub fn fail_next_edits(&self, errors: impl IntoIterator<Item = AppError>) {
        self.edit_errors.lock().unwrap().extend(errors);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Texts of every sent or edited message, in order
    pub fn texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SendText { text, .. }
                | Call::EditText { text, .. }
                | Call::SendPrompt { text, .. }
                | Call::EditPrompt { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn last_text(&self) -> Option<String> {
        self.texts().pop()
    }

    /// The most recent prompt, sent or edited in, and its button payloads
    pub fn last_prompt(&self) -> Option<(SentMessage, Vec<String>)> {
        self.calls().into_iter().rev().find_map(|call| match call {
            Call::SendPrompt { message, payloads, .. } | Call::EditPrompt { message, payloads, .. } => {
                Some((message, payloads))
            }
            _ => None,
        })
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::SendText { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::SendFile { .. }))
            .collect()
    }

    pub fn forwards(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Forward { .. }))
            .collect()
    }

    fn next_edit_error(&self) -> Option<AppError> {
        self.edit_errors.lock().unwrap().pop_front()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_message(&self, chat_id: ChatId) -> SentMessage {
        SentMessage {
            chat_id,
            message_id: MessageId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1),
        }
    }
}

#[async_trait]
impl ChatTransport for RecordingTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<SentMessage, AppError> {
        self.record(Call::SendText {
            chat_id,
            text: text.to_string(),
        });
        Ok(self.next_message(chat_id))
    }

    async fn edit_text(&self, message: SentMessage, text: &str) -> Result<(), AppError> {
        self.record(Call::EditText {
            message,
            text: text.to_string(),
        });
        match self.next_edit_error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn send_file(&self, chat_id: ChatId, upload: &MediaUpload) -> Result<SentMessage, AppError> {
        let size = std::fs::metadata(&upload.path).map(|m| m.len()).ok();
        self.record(Call::SendFile {
            chat_id,
            path: upload.path.clone(),
            existed: size.is_some(),
            size: size.unwrap_or(0),
            caption: upload.caption.clone(),
            has_thumbnail: upload.thumbnail.is_some(),
            kind: upload.kind,
        });

        if self.failing_uploads.lock().unwrap().contains(&chat_id) {
            return Err(AppError::Transport(format!("upload to {} rejected", chat_id)));
        }
        Ok(self.next_message(chat_id))
    }

    async fn forward(&self, message: SentMessage, target: ChatId) -> Result<SentMessage, AppError> {
        self.record(Call::Forward { message, target });
        if self.fail_forward.load(Ordering::SeqCst) {
            return Err(AppError::Transport("forward rejected".to_string()));
        }
        Ok(self.next_message(target))
    }

    async fn send_prompt(&self, chat_id: ChatId, text: &str, buttons: &[PromptButton]) -> Result<SentMessage, AppError> {
        let message = self.next_message(chat_id);
        self.record(Call::SendPrompt {
            message,
            text: text.to_string(),
            payloads: buttons.iter().map(|b| b.payload.clone()).collect(),
        });
        Ok(message)
    }

    async fn edit_prompt(&self, message: SentMessage, text: &str, buttons: &[PromptButton]) -> Result<(), AppError> {
        self.record(Call::EditPrompt {
            message,
            text: text.to_string(),
            payloads: buttons.iter().map(|b| b.payload.clone()).collect(),
        });
        match self.next_edit_error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
