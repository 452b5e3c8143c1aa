//! Media extractor abstraction.
//!
//! The relay pipeline talks to the downloader only through [`MediaExtractor`],
//! so tests can swap yt-dlp for an in-process fake. The only built-in
//! backend is [`ytdlp::YtDlpExtractor`].

pub mod ytdlp;

use crate::core::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Metadata reported by the extractor, either from a probe or after a download.
///
/// Every field except `id` is optional because sites omit them freely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    /// Seconds, possibly fractional
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub webpage_url: Option<String>,
    #[serde(default)]
    pub filesize: Option<u64>,
    #[serde(default)]
    pub filesize_approx: Option<u64>,
    /// Final path after post-processing, only present after a download
    #[serde(default)]
    pub filepath: Option<PathBuf>,
}

impl MediaInfo {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().filter(|t| !t.trim().is_empty()).unwrap_or("No Title")
    }

    pub fn display_uploader(&self) -> &str {
        self.uploader.as_deref().filter(|u| !u.trim().is_empty()).unwrap_or("N/A")
    }

    /// Whole seconds, or `None` when the duration is unknown or nonsensical.
    pub fn duration_secs(&self) -> Option<u32> {
        self.duration
            .filter(|d| d.is_finite() && *d >= 0.0)
            .map(|d| d.round().min(u32::MAX as f64) as u32)
    }

    /// Size hint in bytes, exact when the site reports it.
    pub fn size_hint(&self) -> Option<u64> {
        self.filesize.or(self.filesize_approx)
    }

    /// `<id>.<ext>`, the name the downloader is told to write.
    ///
    /// Returns `None` for ids that could escape the staging directory.
    pub fn artifact_file_name(&self, fallback_ext: &str) -> Option<String> {
        let id = self.id.trim();
        if id.is_empty() || id == "." || id == ".." || id.contains('/') || id.contains('\\') || id.contains('\0') {
            return None;
        }
        let ext = self
            .ext
            .as_deref()
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or(fallback_ext);
        Some(format!("{}.{}", id, ext))
    }
}

/// Which container the downloader should produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPreference {
    pub container: String,
}

impl FormatPreference {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
        }
    }

    /// yt-dlp format selector: best video+audio in the container, then any
    /// single file in the container, then anything at all.
    pub fn selector(&self) -> String {
        let c = &self.container;
        let audio = match c.as_str() {
            "mp4" => "bestaudio[ext=m4a]".to_string(),
            "webm" => "bestaudio[ext=webm]".to_string(),
            _ => "bestaudio".to_string(),
        };
        format!("bestvideo[ext={c}]+{audio}/best[ext={c}]/best")
    }
}

impl Default for FormatPreference {
    fn default() -> Self {
        Self::new(crate::core::config::download::DEFAULT_CONTAINER)
    }
}

/// A backend that can describe and download media behind a URL.
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Human-readable name of this extractor (e.g., "yt-dlp")
    fn name(&self) -> &str;

    /// Fetch metadata only. Must not write anything to disk.
    async fn probe(&self, url: &Url) -> Result<MediaInfo, AppError>;

    /// Download into `dest_dir` as `<id>.<ext>` and return the final metadata.
    async fn fetch(&self, url: &Url, format: &FormatPreference, dest_dir: &Path) -> Result<MediaInfo, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_defaults() {
        let info = MediaInfo {
            id: "abc".into(),
            title: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(info.display_title(), "No Title");
        assert_eq!(info.display_uploader(), "N/A");
    }

    #[test]
    fn test_duration_secs() {
        let mut info = MediaInfo {
            duration: Some(124.6),
            ..Default::default()
        };
        assert_eq!(info.duration_secs(), Some(125));
        info.duration = Some(-1.0);
        assert_eq!(info.duration_secs(), None);
        info.duration = Some(f64::NAN);
        assert_eq!(info.duration_secs(), None);
    }

    #[test]
    fn test_artifact_file_name() {
        let mut info = MediaInfo {
            id: "dQw4w9WgXcQ".into(),
            ext: Some("mp4".into()),
            ..Default::default()
        };
        assert_eq!(info.artifact_file_name("mp4").as_deref(), Some("dQw4w9WgXcQ.mp4"));

        info.ext = None;
        assert_eq!(info.artifact_file_name("webm").as_deref(), Some("dQw4w9WgXcQ.webm"));

        info.id = "../etc".into();
        assert_eq!(info.artifact_file_name("mp4"), None);
        info.id = "".into();
        assert_eq!(info.artifact_file_name("mp4"), None);
    }

    #[test]
    fn test_format_selector() {
        assert_eq!(
            FormatPreference::new("mp4").selector(),
            "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best"
        );
        assert_eq!(
            FormatPreference::new("webm").selector(),
            "bestvideo[ext=webm]+bestaudio[ext=webm]/best[ext=webm]/best"
        );
        assert_eq!(
            FormatPreference::new("mkv").selector(),
            "bestvideo[ext=mkv]+bestaudio/best[ext=mkv]/best"
        );
    }

    #[test]
    fn test_media_info_tolerates_nulls() {
        let info: MediaInfo =
            serde_json::from_str(r#"{"id":"x","title":null,"duration":null,"extra":"ignored"}"#).unwrap();
        assert_eq!(info.id, "x");
        assert_eq!(info.title, None);
    }
}
