//! Download-and-relay pipeline.
//!
//! One run turns a [`RelayRequest`] into either a delivered video or a
//! [`RelayError`]:
//!   validate → probe → create staging → download → locate artifact → size gate
//!   → thumbnail → caption → deliver → cleanup → final status
//!
//! The staging directory is removed before `run` returns on every path,
//! including cancellation.

use super::caption::build_caption;
use super::error::{RelayError, SourceStage};
use super::progress::{RelayStatus, StatusMessage};
use super::request::{validate_source_url, RelayRequest};
use super::send::{self, ArchiveOutcome};
use super::source::{FormatPreference, MediaExtractor, MediaInfo};
use super::staging::StagingArea;
use super::thumbnail::ThumbnailFetcher;
use crate::core::config::{ArchiveTarget, Settings};
use crate::core::metrics;
use crate::telegram::transport::{ChatTransport, MediaUpload, SentMessage, UploadKind};
use chrono::Utc;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

/// Knobs the pipeline reads on every run.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub staging_root: PathBuf,
    pub format: FormatPreference,
    /// Probe metadata before downloading
    pub probe_first: bool,
    /// `None` disables size gating
    pub size_limit: Option<u64>,
    pub archive: Option<ArchiveTarget>,
}

impl PipelineSettings {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            staging_root: settings.staging_root.clone(),
            format: FormatPreference::new(settings.preferred_container.clone()),
            probe_first: settings.probe_before_download,
            size_limit: settings.max_upload_bytes,
            archive: settings.archive,
        }
    }
}

/// Downloaded file and what we know about it. Lives inside the staging area.
#[derive(Debug, Clone)]
pub struct MediaArtifact {
    pub path: PathBuf,
    pub size: u64,
    pub info: MediaInfo,
    pub thumbnail: Option<PathBuf>,
}

/// Successful run
#[derive(Debug)]
pub struct Delivery {
    pub request_id: Uuid,
    pub info: MediaInfo,
    pub size: u64,
    pub primary: SentMessage,
    pub archive: ArchiveOutcome,
}

pub struct RelayPipeline {
    extractor: Arc<dyn MediaExtractor>,
    transport: Arc<dyn ChatTransport>,
    thumbnails: ThumbnailFetcher,
    settings: PipelineSettings,
}

impl RelayPipeline {
    pub fn new(
        extractor: Arc<dyn MediaExtractor>,
        transport: Arc<dyn ChatTransport>,
        thumbnails: ThumbnailFetcher,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            extractor,
            transport,
            thumbnails,
            settings,
        }
    }

    /// Runs the whole pipeline and leaves the final status in `status`.
    pub async fn run(
        &self,
        request: RelayRequest,
        status: &mut StatusMessage,
        cancel: &CancellationToken,
    ) -> Result<Delivery, RelayError> {
        let started = Instant::now();
        let request_id = request.id;
        let chat_id = request.chat_id;
        log::debug!(
            "[{}] Starting relay for chat {}, queued {} ms",
            request_id,
            chat_id,
            (Utc::now() - request.received_at).num_milliseconds()
        );

        let result = self.execute(request, status, cancel).await;

        let (final_status, outcome) = match &result {
            Ok(delivery) if delivery.archive.is_failed() => (RelayStatus::DoneArchiveFailed, "delivered_archive_failed"),
            Ok(_) => (RelayStatus::Done, "delivered"),
            Err(e) => (
                RelayStatus::Failed {
                    reason: e.user_message(),
                },
                e.kind(),
            ),
        };
        status.report(self.transport.as_ref(), final_status).await;
        metrics::record_relay_outcome(outcome, started.elapsed());

        match &result {
            Ok(delivery) => log::info!(
                "[{}] Relayed {} ({} bytes) to chat {} in {:?}",
                request_id,
                delivery.info.id,
                delivery.size,
                chat_id,
                started.elapsed()
            ),
            Err(RelayError::InvalidInput(reason)) => log::info!("[{}] Rejected input: {}", request_id, reason),
            Err(e) => log::warn!("[{}] Relay for chat {} failed: {}", request_id, chat_id, e),
        }

        result
    }

    async fn execute(
        &self,
        request: RelayRequest,
        status: &mut StatusMessage,
        cancel: &CancellationToken,
    ) -> Result<Delivery, RelayError> {
        // ── Step 1: Validate input ──
        let url = validate_source_url(&request.text)?;
        log::info!("[{}] Relay requested by chat {}: {}", request.id, request.chat_id, url);

        // ── Step 2: Placeholder ──
        status.report(self.transport.as_ref(), RelayStatus::Processing).await;

        // ── Step 3: Probe metadata ──
        let preview = match request.preview.clone() {
            Some(info) => Some(info),
            None if self.settings.probe_first => {
                let info = cancellable(cancel, self.extractor.probe(&url))
                    .await?
                    .map_err(|source| RelayError::SourceUnavailable {
                        stage: SourceStage::Probe,
                        source,
                    })?;
                Some(info)
            }
            None => None,
        };

        if let (Some(limit), Some(size)) = (self.settings.size_limit, preview.as_ref().and_then(|i| i.filesize)) {
            if size > limit {
                return Err(RelayError::ArtifactTooLarge { size, limit });
            }
        }

        // ── Step 4: Staging area ──
        let staging = StagingArea::create(&self.settings.staging_root, request.id)
            .await
            .map_err(RelayError::StagingUnavailable)?;

        // ── Step 5: Download and deliver ──
        let outcome = cancellable(
            cancel,
            self.relay_staged(&request, &url, preview.as_ref(), &staging, status),
        )
        .await
        .and_then(|r| r);

        // ── Step 6: Cleanup ──
        let warnings = staging.cleanup().await;
        if !warnings.is_empty() {
            log::warn!("[{}] {} staged entries could not be removed", request.id, warnings.len());
        }

        outcome
    }

    async fn relay_staged(
        &self,
        request: &RelayRequest,
        url: &Url,
        preview: Option<&MediaInfo>,
        staging: &StagingArea,
        status: &mut StatusMessage,
    ) -> Result<Delivery, RelayError> {
        let transport = self.transport.as_ref();

        status
            .report(
                transport,
                RelayStatus::Downloading {
                    title: preview.map(|i| i.display_title().to_string()),
                },
            )
            .await;

        let fetched = self
            .extractor
            .fetch(url, &self.settings.format, staging.path())
            .await
            .map_err(|source| RelayError::SourceUnavailable {
                stage: SourceStage::Download,
                source,
            })?;
        let info = fill_missing(fetched, preview);

        let mut artifact = self.locate_artifact(info, staging).await?;
        log::info!(
            "[{}] Downloaded {} ({} bytes) via {}",
            request.id,
            artifact.path.display(),
            artifact.size,
            self.extractor.name()
        );

        if let Some(limit) = self.settings.size_limit {
            if artifact.size > limit {
                return Err(RelayError::ArtifactTooLarge {
                    size: artifact.size,
                    limit,
                });
            }
        }

        if let Some(thumb_url) = artifact.info.thumbnail.clone() {
            match self.thumbnails.fetch(&thumb_url, staging).await {
                Ok(path) => artifact.thumbnail = Some(path),
                Err(e) => log::warn!("[{}] Thumbnail unavailable, sending without it: {}", request.id, e),
            }
        }

        let upload = MediaUpload {
            caption: build_caption(&artifact.info, url),
            kind: upload_kind(&artifact),
            duration: artifact.info.duration_secs(),
            thumbnail: artifact.thumbnail.clone(),
            path: artifact.path.clone(),
        };

        status.report(transport, RelayStatus::Uploading).await;

        let report = send::deliver(transport, request.chat_id, &upload, self.settings.archive).await?;

        Ok(Delivery {
            request_id: request.id,
            info: artifact.info,
            size: artifact.size,
            primary: report.primary,
            archive: report.archive,
        })
    }

    /// Re-derives the artifact path from the reported id and extension.
    async fn locate_artifact(&self, info: MediaInfo, staging: &StagingArea) -> Result<MediaArtifact, RelayError> {
        let container = self.settings.format.container.as_str();
        let Some(expected) = info.artifact_file_name(container) else {
            return Err(RelayError::ArtifactMissing {
                expected: format!("unusable id {:?}", info.id),
            });
        };

        // yt-dlp reports the final name after merging, which wins over our guess
        let mut candidates = Vec::with_capacity(2);
        if let Some(name) = info.filepath.as_deref().and_then(|p| p.file_name()) {
            candidates.push(staging.path().join(name));
        }
        candidates.push(staging.file(&expected));

        for path in candidates {
            if let Ok(meta) = tokio::fs::metadata(&path).await {
                if meta.is_file() {
                    return Ok(MediaArtifact {
                        path,
                        size: meta.len(),
                        info,
                        thumbnail: None,
                    });
                }
            }
        }

        Err(RelayError::ArtifactMissing { expected })
    }
}

fn upload_kind(artifact: &MediaArtifact) -> UploadKind {
    let ext = artifact
        .path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp4") => UploadKind::Video,
        _ => UploadKind::Document,
    }
}

/// Fields the download did not report are taken from the probe.
fn fill_missing(mut info: MediaInfo, preview: Option<&MediaInfo>) -> MediaInfo {
    if let Some(p) = preview {
        info.title = info.title.or_else(|| p.title.clone());
        info.uploader = info.uploader.or_else(|| p.uploader.clone());
        info.duration = info.duration.or(p.duration);
        info.thumbnail = info.thumbnail.or_else(|| p.thumbnail.clone());
        info.webpage_url = info.webpage_url.or_else(|| p.webpage_url.clone());
    }
    info
}

/// Races `fut` against the cancellation token. Dropping the future kills any
/// child process it owns.
pub(crate) async fn cancellable<F: Future>(cancel: &CancellationToken, fut: F) -> Result<F::Output, RelayError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RelayError::Cancelled),
        out = fut => Ok(out),
    }
}
