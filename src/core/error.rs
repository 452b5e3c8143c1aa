use teloxide::{ApiError, RequestError};
use thiserror::Error;

use crate::core::config::ConfigError;

/// Centralized error types for the application
///
/// Infrastructure failures from every collaborator (Bot API, HTTP, filesystem,
/// yt-dlp) are converted to this enum. The relay pipeline wraps them into
/// [`crate::download::RelayError`] to attach user-facing meaning.
#[derive(Error, Debug)]
pub enum AppError {
    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] RequestError),

    /// HTTP/Fetch errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP status code errors
    #[error("HTTP request failed with status: {0}")]
    HttpStatus(reqwest::StatusCode),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Malformed JSON from an external tool
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// yt-dlp reported a failure or could not be run
    #[error("Extractor error: {0}")]
    Extractor(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Chat transport failures that do not come from teloxide (used by test transports)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Flood-control hint from the Bot API, if any.
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            AppError::Telegram(RequestError::RetryAfter(secs)) => Some(secs.duration()),
            _ => None,
        }
    }

    /// Editing a message to identical content is reported as an error by Telegram.
    pub fn is_message_not_modified(&self) -> bool {
        matches!(self, AppError::Telegram(RequestError::Api(ApiError::MessageNotModified)))
    }
}
