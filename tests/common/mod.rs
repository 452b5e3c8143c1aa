//! Common test utilities
//!
//! This module is shared across all integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use teloxide::types::ChatId;
use vidrelay::download::{FormatPreference, MediaInfo, PipelineSettings, RelayPipeline, RelayService, ThumbnailFetcher};
use vidrelay::telegram::{ChatTransport, HandlerDeps, PendingRequests};

use crate::mocks::{MockExtractor, RecordingTransport};

pub const USER_CHAT: ChatId = ChatId(123456789);
pub const OTHER_CHAT: ChatId = ChatId(987654321);
pub const ARCHIVE_CHAT: ChatId = ChatId(-1001234567890);

pub const SAMPLE_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

/// 2:05 clip without a thumbnail
pub fn sample_info() -> MediaInfo {
    MediaInfo {
        id: "dQw4w9WgXcQ".to_string(),
        title: Some("Test Clip".to_string()),
        uploader: Some("Test Channel".to_string()),
        duration: Some(125.0),
        ext: Some("mp4".to_string()),
        webpage_url: Some(SAMPLE_URL.to_string()),
        ..Default::default()
    }
}

/// Temp staging root plus the mocks a pipeline runs against
pub struct TestEnvironment {
    pub temp: TempDir,
    pub extractor: Arc<MockExtractor>,
    pub transport: Arc<RecordingTransport>,
    pub settings: PipelineSettings,
}

impl TestEnvironment {
    pub fn new(extractor: MockExtractor) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let settings = PipelineSettings {
            staging_root: temp.path().join("staging"),
            format: FormatPreference::default(),
            probe_first: true,
            size_limit: Some(50 * 1024 * 1024),
            archive: None,
        };
        Self {
            temp,
            extractor: Arc::new(extractor),
            transport: Arc::new(RecordingTransport::new()),
            settings,
        }
    }

    pub fn staging_root(&self) -> PathBuf {
        self.settings.staging_root.clone()
    }

    pub fn pipeline(&self) -> RelayPipeline {
        let transport: Arc<dyn ChatTransport> = self.transport.clone();
        RelayPipeline::new(
            self.extractor.clone(),
            transport,
            ThumbnailFetcher::new(reqwest::Client::new()),
            self.settings.clone(),
        )
    }

    pub fn service(&self) -> RelayService {
        RelayService::new(Arc::new(self.pipeline()))
    }

    pub fn handler_deps(&self, confirm_downloads: bool) -> HandlerDeps {
        HandlerDeps::new(
            self.transport.clone(),
            self.extractor.clone(),
            self.service(),
            PendingRequests::new(std::time::Duration::from_secs(600)),
            confirm_downloads,
        )
    }
}

/// Entries directly under `dir`; empty when `dir` does not exist.
pub fn dir_entries(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries.map(|e| e.unwrap().path()).collect(),
        Err(_) => Vec::new(),
    }
}
