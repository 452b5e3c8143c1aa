//! Status placeholder shown to the requester.
//!
//! One message per request, edited in place as the pipeline advances.
//! Status updates are best-effort: failures are logged and never change
//! the outcome of the request.

use crate::core::error::AppError;
use crate::telegram::transport::{ChatTransport, SentMessage};
use std::time::Duration;
use teloxide::types::ChatId;

/// Stages reported to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayStatus {
    Processing,
    Downloading { title: Option<String> },
    Uploading,
    Done,
    /// Requester got the video, archive copy failed
    DoneArchiveFailed,
    /// Terminal failure with the user-facing reason
    Failed { reason: String },
}

impl RelayStatus {
    pub fn to_message(&self) -> String {
        match self {
            RelayStatus::Processing => "⏳ Processing...".to_string(),
            RelayStatus::Downloading { title: Some(title) } => format!("📥 Downloading: {}", title),
            RelayStatus::Downloading { title: None } => "📥 Downloading...".to_string(),
            RelayStatus::Uploading => "📤 Uploading...".to_string(),
            RelayStatus::Done => "✅ Done!".to_string(),
            RelayStatus::DoneArchiveFailed => "✅ Done! ⚠️ The archive copy could not be saved.".to_string(),
            RelayStatus::Failed { reason } => reason.clone(),
        }
    }
}

/// The single status message of one request.
#[derive(Debug, Clone)]
pub struct StatusMessage {
    chat_id: ChatId,
    message: Option<SentMessage>,
}

impl StatusMessage {
    /// Nothing is sent until the first update.
    pub fn new(chat_id: ChatId) -> Self {
        Self { chat_id, message: None }
    }

    /// Reuses an existing message, e.g. a confirmation prompt.
    pub fn with_existing(message: SentMessage) -> Self {
        Self {
            chat_id: message.chat_id,
            message: Some(message),
        }
    }

    pub fn message(&self) -> Option<SentMessage> {
        self.message
    }

    /// Sends or edits the placeholder.
    ///
    /// "message is not modified" counts as success. A flood-control error on
    /// edit waits once and retries; any other edit failure falls back to
    /// sending a new message.
    pub async fn update(&mut self, transport: &dyn ChatTransport, status: &RelayStatus) -> Result<(), AppError> {
        let text = status.to_message();

        let Some(existing) = self.message else {
            self.message = Some(transport.send_text(self.chat_id, &text).await?);
            return Ok(());
        };

        match transport.edit_text(existing, &text).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_message_not_modified() => return Ok(()),
            Err(e) => match e.retry_after() {
                Some(wait) => {
                    log::warn!(
                        "Rate limit hit when editing status message: retry after {:?}. Waiting...",
                        wait
                    );
                    tokio::time::sleep(wait + Duration::from_secs(1)).await;
                    match transport.edit_text(existing, &text).await {
                        Ok(()) => return Ok(()),
                        Err(e2) if e2.is_message_not_modified() => return Ok(()),
                        Err(e2) => log::warn!("Still failed to edit status message: {}. Sending a new one.", e2),
                    }
                }
                None => log::warn!("Failed to edit status message: {}. Sending a new one.", e),
            },
        }

        self.message = Some(transport.send_text(self.chat_id, &text).await?);
        Ok(())
    }

    /// [`update`](Self::update) that only logs failures.
    pub async fn report(&mut self, transport: &dyn ChatTransport, status: RelayStatus) {
        if let Err(e) = self.update(transport, &status).await {
            log::warn!("Failed to report status {:?} to chat {}: {}", status, self.chat_id, e);
        }
    }
}
