//! Delivery of a staged artifact to the requester and the archive chat.

use super::error::RelayError;
use crate::core::config::{ArchiveMode, ArchiveTarget};
use crate::core::metrics;
use crate::telegram::transport::{ChatTransport, MediaUpload, SentMessage};
use teloxide::types::ChatId;

/// What happened with the archive copy
#[derive(Debug)]
pub enum ArchiveOutcome {
    NotConfigured,
    Delivered(SentMessage),
    Failed(RelayError),
}

impl ArchiveOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ArchiveOutcome::Failed(_))
    }
}

#[derive(Debug)]
pub struct DeliveryReport {
    /// The message the requester received
    pub primary: SentMessage,
    pub archive: ArchiveOutcome,
}

/// Sends the artifact to the requester and, if configured, the archive.
///
/// Only a failure to reach the requester is an error. Archive problems are
/// logged and reported in [`DeliveryReport::archive`].
pub async fn deliver(
    transport: &dyn ChatTransport,
    requester: ChatId,
    upload: &MediaUpload,
    archive: Option<ArchiveTarget>,
) -> Result<DeliveryReport, RelayError> {
    let Some(archive) = archive else {
        let primary = upload_primary(transport, requester, upload).await?;
        return Ok(DeliveryReport {
            primary,
            archive: ArchiveOutcome::NotConfigured,
        });
    };

    if archive.chat_id == requester {
        let primary = upload_primary(transport, requester, upload).await?;
        return Ok(DeliveryReport {
            primary,
            archive: ArchiveOutcome::Delivered(primary),
        });
    }

    match archive.mode {
        ArchiveMode::Forward => deliver_via_archive(transport, requester, upload, archive.chat_id).await,
        ArchiveMode::Reupload => {
            let primary = upload_primary(transport, requester, upload).await?;
            let archive = match transport.send_file(archive.chat_id, upload).await {
                Ok(copy) => ArchiveOutcome::Delivered(copy),
                Err(e) => archive_failed(RelayError::ArchiveDeliveryFailed(e)),
            };
            Ok(DeliveryReport { primary, archive })
        }
    }
}

/// Upload once to the archive, then forward that message to the requester.
async fn deliver_via_archive(
    transport: &dyn ChatTransport,
    requester: ChatId,
    upload: &MediaUpload,
    archive_chat: ChatId,
) -> Result<DeliveryReport, RelayError> {
    let archived = match transport.send_file(archive_chat, upload).await {
        Ok(msg) => msg,
        Err(e) => {
            let failure = archive_failed(RelayError::ArchiveDeliveryFailed(e));
            log::info!("Falling back to a direct upload to chat {}", requester);
            let primary = upload_primary(transport, requester, upload).await?;
            return Ok(DeliveryReport {
                primary,
                archive: failure,
            });
        }
    };

    let primary = match transport.forward(archived, requester).await {
        Ok(forwarded) => forwarded,
        Err(e) => {
            log::warn!(
                "Forward from archive {} to chat {} failed: {}. Uploading directly.",
                archive_chat,
                requester,
                e
            );
            upload_primary(transport, requester, upload).await?
        }
    };

    Ok(DeliveryReport {
        primary,
        archive: ArchiveOutcome::Delivered(archived),
    })
}

async fn upload_primary(
    transport: &dyn ChatTransport,
    requester: ChatId,
    upload: &MediaUpload,
) -> Result<SentMessage, RelayError> {
    transport
        .send_file(requester, upload)
        .await
        .map_err(RelayError::DeliveryFailed)
}

fn archive_failed(error: RelayError) -> ArchiveOutcome {
    log::error!("{}", error);
    metrics::record_archive_failure();
    ArchiveOutcome::Failed(error)
}
