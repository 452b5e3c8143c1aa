use crate::core::error::AppError;
use crate::core::utils::format_file_size;
use std::path::PathBuf;
use strum::{AsRefStr, Display};
use thiserror::Error;

/// Which extractor call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum SourceStage {
    Probe,
    Download,
}

/// Everything that can stop a relay request.
///
/// Internal detail stays in the `Display` output for logs; users only ever
/// see [`RelayError::user_message`].
#[derive(Debug, Error)]
pub enum RelayError {
    /// Text is not an http(s) URL
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Extractor failed during probe or download
    #[error("source unavailable during {stage}: {source}")]
    SourceUnavailable { stage: SourceStage, source: AppError },

    /// Extractor reported success but the expected file is not there
    #[error("artifact missing: expected {expected}")]
    ArtifactMissing { expected: String },

    /// File exceeds the upload limit
    #[error("artifact too large: {size} bytes (limit {limit})")]
    ArtifactTooLarge { size: u64, limit: u64 },

    /// Upload to the requester failed
    #[error("delivery failed: {0}")]
    DeliveryFailed(#[source] AppError),

    /// Upload or forward to the archive failed; the requester was still served
    #[error("archive delivery failed: {0}")]
    ArchiveDeliveryFailed(#[source] AppError),

    /// Per-request staging directory could not be created
    #[error("staging unavailable: {0}")]
    StagingUnavailable(#[source] AppError),

    /// Request was aborted with /cancel
    #[error("cancelled")]
    Cancelled,
}

impl RelayError {
    /// Short message shown in chat.
    pub fn user_message(&self) -> String {
        match self {
            RelayError::InvalidInput(_) => "❌ Please send a valid http(s) link.".to_string(),
            RelayError::SourceUnavailable {
                stage: SourceStage::Probe,
                ..
            } => "❌ Cannot fetch info for this link.".to_string(),
            RelayError::SourceUnavailable {
                stage: SourceStage::Download,
                ..
            }
            | RelayError::ArtifactMissing { .. } => "❌ Download failed.".to_string(),
            RelayError::ArtifactTooLarge { size, limit } => format!(
                "❌ File is too large ({}, limit {}).",
                format_file_size(*size),
                format_file_size(*limit)
            ),
            RelayError::DeliveryFailed(_) => "❌ Upload failed.".to_string(),
            RelayError::ArchiveDeliveryFailed(_) => "⚠️ Sent to you, but the archive copy failed.".to_string(),
            RelayError::StagingUnavailable(_) => "❌ An error occurred".to_string(),
            RelayError::Cancelled => "🛑 Cancelled.".to_string(),
        }
    }

    /// Label for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            RelayError::InvalidInput(_) => "rejected",
            RelayError::SourceUnavailable {
                stage: SourceStage::Probe,
                ..
            } => "probe_failed",
            RelayError::SourceUnavailable {
                stage: SourceStage::Download,
                ..
            } => "download_failed",
            RelayError::ArtifactMissing { .. } => "artifact_missing",
            RelayError::ArtifactTooLarge { .. } => "too_large",
            RelayError::DeliveryFailed(_) => "delivery_failed",
            RelayError::ArchiveDeliveryFailed(_) => "archive_failed",
            RelayError::StagingUnavailable(_) => "staging_unavailable",
            RelayError::Cancelled => "cancelled",
        }
    }
}

/// A staged file or directory that could not be removed. Logged, never returned
/// to the user, never aborts removal of sibling entries.
#[derive(Debug, Error)]
#[error("failed to remove {}: {source}", .path.display())]
pub struct CleanupWarning {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
