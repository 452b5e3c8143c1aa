//! Outbound chat operations.
//!
//! The relay pipeline and handlers only see [`ChatTransport`]; the
//! production implementation wraps a teloxide [`Bot`]. Every file upload
//! opens the file on disk anew, so the same artifact can be sent to two
//! chats without sharing a stream.

use crate::core::error::AppError;
use crate::telegram::Bot;
use async_trait::async_trait;
use std::path::PathBuf;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile, MessageId, ParseMode};

/// A message the bot sent, enough to edit or forward it later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

impl From<&Message> for SentMessage {
    fn from(msg: &Message) -> Self {
        Self {
            chat_id: msg.chat.id,
            message_id: msg.id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Playable inline (mp4)
    Video,
    /// Any other container
    Document,
}

/// A file upload with its caption. The caption is MarkdownV2.
#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub path: PathBuf,
    pub caption: String,
    pub thumbnail: Option<PathBuf>,
    pub duration: Option<u32>,
    pub kind: UploadKind,
}

/// Inline button under a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptButton {
    pub label: String,
    pub payload: String,
}

impl PromptButton {
    pub fn new(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: payload.into(),
        }
    }
}

#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Plain text message
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<SentMessage, AppError>;

    /// Replaces the text of a previously sent message (and drops its buttons).
    async fn edit_text(&self, message: SentMessage, text: &str) -> Result<(), AppError>;

    async fn send_file(&self, chat_id: ChatId, upload: &MediaUpload) -> Result<SentMessage, AppError>;

    /// Forwards `message` into `target` and returns the new copy.
    async fn forward(&self, message: SentMessage, target: ChatId) -> Result<SentMessage, AppError>;

    /// Text with one row of inline buttons.
    async fn send_prompt(&self, chat_id: ChatId, text: &str, buttons: &[PromptButton])
        -> Result<SentMessage, AppError>;

    /// Turns an existing message into a prompt.
    async fn edit_prompt(&self, message: SentMessage, text: &str, buttons: &[PromptButton]) -> Result<(), AppError>;
}

fn keyboard(buttons: &[PromptButton]) -> InlineKeyboardMarkup {
    let row: Vec<InlineKeyboardButton> = buttons
        .iter()
        .map(|b| InlineKeyboardButton::callback(b.label.clone(), b.payload.clone()))
        .collect();
    InlineKeyboardMarkup::new(vec![row])
}

/// [`ChatTransport`] over the Telegram Bot API.
#[derive(Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<SentMessage, AppError> {
        let msg = self.bot.send_message(chat_id, text).await?;
        Ok(SentMessage::from(&msg))
    }

    async fn edit_text(&self, message: SentMessage, text: &str) -> Result<(), AppError> {
        self.bot
            .edit_message_text(message.chat_id, message.message_id, text)
            .await?;
        Ok(())
    }

    async fn send_file(&self, chat_id: ChatId, upload: &MediaUpload) -> Result<SentMessage, AppError> {
        let input = InputFile::file(&upload.path);

        let msg = match upload.kind {
            UploadKind::Video => {
                let mut request = self
                    .bot
                    .send_video(chat_id, input)
                    .caption(upload.caption.clone())
                    .parse_mode(ParseMode::MarkdownV2)
                    .supports_streaming(true);
                if let Some(thumb) = &upload.thumbnail {
                    request = request.thumbnail(InputFile::file(thumb));
                }
                if let Some(duration) = upload.duration {
                    request = request.duration(duration);
                }
                request.await?
            }
            UploadKind::Document => {
                let mut request = self
                    .bot
                    .send_document(chat_id, input)
                    .caption(upload.caption.clone())
                    .parse_mode(ParseMode::MarkdownV2);
                if let Some(thumb) = &upload.thumbnail {
                    request = request.thumbnail(InputFile::file(thumb));
                }
                request.await?
            }
        };

        Ok(SentMessage::from(&msg))
    }

    async fn forward(&self, message: SentMessage, target: ChatId) -> Result<SentMessage, AppError> {
        let msg = self
            .bot
            .forward_message(target, message.chat_id, message.message_id)
            .await?;
        Ok(SentMessage::from(&msg))
    }

    async fn send_prompt(
        &self,
        chat_id: ChatId,
        text: &str,
        buttons: &[PromptButton],
    ) -> Result<SentMessage, AppError> {
        let msg = self
            .bot
            .send_message(chat_id, text)
            .reply_markup(keyboard(buttons))
            .await?;
        Ok(SentMessage::from(&msg))
    }

    async fn edit_prompt(&self, message: SentMessage, text: &str, buttons: &[PromptButton]) -> Result<(), AppError> {
        self.bot
            .edit_message_text(message.chat_id, message.message_id, text)
            .reply_markup(keyboard(buttons))
            .await?;
        Ok(())
    }
}
