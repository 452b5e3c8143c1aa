use super::error::RelayError;
use super::source::MediaInfo;
use chrono::{DateTime, Utc};
use teloxide::types::ChatId;
use url::Url;
use uuid::Uuid;

/// One user request to relay a video. Lives for a single pipeline run.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub id: Uuid,
    pub chat_id: ChatId,
    /// Raw text as received
    pub text: String,
    pub received_at: DateTime<Utc>,
    /// Metadata already fetched for a confirmation prompt
    pub preview: Option<MediaInfo>,
}

impl RelayRequest {
    pub fn new(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id,
            text: text.into(),
            received_at: Utc::now(),
            preview: None,
        }
    }

    #[must_use]
    pub fn with_preview(mut self, info: MediaInfo) -> Self {
        self.preview = Some(info);
        self
    }
}

/// Accepts only absolute http(s) URLs with a host.
pub fn validate_source_url(text: &str) -> Result<Url, RelayError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RelayError::InvalidInput("empty message".to_string()));
    }

    let url = Url::parse(trimmed).map_err(|e| RelayError::InvalidInput(format!("{}: {}", trimmed, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => return Err(RelayError::InvalidInput(format!("unsupported scheme {}", other))),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(RelayError::InvalidInput(format!("{} has no host", trimmed)));
    }

    Ok(url)
}
