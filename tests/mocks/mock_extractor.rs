//! Scriptable extractor
//!
//! Writes sparse files into the destination directory instead of running
//! yt-dlp, and counts every call.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;
use vidrelay::core::AppError;
use vidrelay::download::{FormatPreference, MediaExtractor, MediaInfo};

/// What `fetch` does
#[derive(Debug, Clone)]
pub enum FetchBehavior {
    /// Writes `<id>.<ext>` of `size` bytes
    WriteFile { size: u64, ext: String },
    /// Reports success but leaves the directory empty
    NoFile,
    /// Returns an extractor error
    Fail(String),
    /// Writes `name` and reports it as the final file path
    WriteRenamed { size: u64, name: String },
    /// Writes a partial file, then hangs
    Slow,
}

pub struct MockExtractor {
    info: MediaInfo,
    probe_error: Option<String>,
    lookup_delay: Option<Duration>,
    behavior: FetchBehavior,
    probe_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    dest_dirs: Mutex<Vec<PathBuf>>,
}

impl MockExtractor {
    pub fn new(info: MediaInfo, behavior: FetchBehavior) -> Self {
        Self {
            info,
            probe_error: None,
            lookup_delay: None,
            behavior,
            probe_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            dest_dirs: Mutex::new(Vec::new()),
        }
    }

    /// Writes a file of `size` bytes with the given extension.
    pub fn writing(info: MediaInfo, size: u64, ext: &str) -> Self {
        Self::new(
            info,
            FetchBehavior::WriteFile {
                size,
                ext: ext.to_string(),
            },
        )
    }

    pub fn failing_probe(mut self, message: &str) -> Self {
        self.probe_error = Some(message.to_string());
        self
    }

    /// Metadata lookups take `delay` before answering.
    pub fn slow_lookup(mut self, delay: Duration) -> Self {
        self.lookup_delay = Some(delay);
        self
    }

    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.probe_calls() + self.fetch_calls()
    }

    /// Directories `fetch` was asked to write into
    pub fn dest_dirs(&self) -> Vec<PathBuf> {
        self.dest_dirs.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaExtractor for MockExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, _url: &Url) -> Result<MediaInfo, AppError> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.lookup_delay {
            tokio::time::sleep(delay).await;
        }
        match &self.probe_error {
            Some(message) => Err(AppError::Extractor(message.clone())),
            None => Ok(self.info.clone()),
        }
    }

    async fn fetch(&self, _url: &Url, _format: &FormatPreference, dest_dir: &Path) -> Result<MediaInfo, AppError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.dest_dirs.lock().unwrap().push(dest_dir.to_path_buf());

        match &self.behavior {
            FetchBehavior::WriteFile { size, ext } => {
                let path = dest_dir.join(format!("{}.{}", self.info.id, ext));
                let file = std::fs::File::create(&path)?;
                file.set_len(*size)?;
                let mut info = self.info.clone();
                info.ext = Some(ext.clone());
                Ok(info)
            }
            FetchBehavior::WriteRenamed { size, name } => {
                let path = dest_dir.join(name);
                let file = std::fs::File::create(&path)?;
                file.set_len(*size)?;
                let mut info = self.info.clone();
                info.ext = path.extension().map(|e| e.to_string_lossy().into_owned());
                info.filepath = Some(path);
                Ok(info)
            }
            FetchBehavior::NoFile => Ok(self.info.clone()),
            FetchBehavior::Fail(message) => Err(AppError::Extractor(message.clone())),
            FetchBehavior::Slow => {
                std::fs::write(dest_dir.join(format!("{}.mp4.part", self.info.id)), b"partial")?;
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(self.info.clone())
            }
        }
    }
}
