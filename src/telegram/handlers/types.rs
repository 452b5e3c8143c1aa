//! Handler types, dependencies and normalized inbound events

use std::sync::Arc;

use teloxide::types::{CallbackQuery, ChatId, Message, MessageId};

use crate::download::service::RelayService;
use crate::download::source::MediaExtractor;
use crate::telegram::pending::PendingRequests;
use crate::telegram::transport::ChatTransport;

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub transport: Arc<dyn ChatTransport>,
    pub extractor: Arc<dyn MediaExtractor>,
    pub service: RelayService,
    pub pending: PendingRequests,
    /// Ask before downloading
    pub confirm_downloads: bool,
}

impl HandlerDeps {
    /// Create new handler dependencies
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        extractor: Arc<dyn MediaExtractor>,
        service: RelayService,
        pending: PendingRequests,
        confirm_downloads: bool,
    ) -> Self {
        Self {
            transport,
            extractor,
            service,
            pending,
            confirm_downloads,
        }
    }
}

/// A text message from a chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundText {
    pub chat_id: ChatId,
    pub text: String,
}

impl InboundText {
    pub fn new(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
        }
    }

    /// `None` for messages without text (stickers, media without caption, ...)
    pub fn from_message(msg: &Message) -> Option<Self> {
        msg.text().map(|text| Self::new(msg.chat.id, text))
    }
}

/// A pressed inline button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundButton {
    pub chat_id: ChatId,
    /// Message carrying the button
    pub message_id: MessageId,
    pub payload: String,
}

impl InboundButton {
    /// `None` when the query has no data or the original message is gone.
    pub fn from_callback(q: &CallbackQuery) -> Option<Self> {
        let message = q.message.as_ref()?;
        Some(Self {
            chat_id: message.chat().id,
            message_id: message.id(),
            payload: q.data.clone()?,
        })
    }
}
