//! Thumbnail acquisition.
//!
//! Downloads the preview image reported by the extractor into the staging
//! area and makes sure it is a JPEG small enough for Telegram (≤ 200 KB).
//! Every failure is returned to the caller, who treats it as "no thumbnail".

use super::staging::StagingArea;
use crate::core::config;
use crate::core::error::AppError;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const SOURCE_FILE: &str = "thumbnail.src";
const THUMBNAIL_FILE: &str = "thumbnail.jpg";

/// Image format detected by magic bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Unknown,
}

/// Detects image format from the first bytes of a file (magic bytes)
pub(crate) fn detect_image_format(bytes: &[u8]) -> ImageFormat {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => ImageFormat::Jpeg,
        [0x89, b'P', b'N', b'G', ..] => ImageFormat::Png,
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => ImageFormat::WebP,
        _ => ImageFormat::Unknown,
    }
}

#[derive(Debug, Clone)]
pub struct ThumbnailFetcher {
    client: reqwest::Client,
    max_download_bytes: u64,
    ffmpeg_bin: String,
}

impl ThumbnailFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            max_download_bytes: config::thumbnail::MAX_DOWNLOAD_BYTES,
            ffmpeg_bin: config::FFMPEG_BIN.clone(),
        }
    }

    /// Client with the thumbnail timeout applied.
    pub fn with_default_client() -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config::network::thumbnail_timeout())
            .build()?;
        Ok(Self::new(client))
    }

    #[must_use]
    pub fn max_download_bytes(mut self, max: u64) -> Self {
        self.max_download_bytes = max;
        self
    }

    #[must_use]
    pub fn ffmpeg_bin(mut self, bin: impl Into<String>) -> Self {
        self.ffmpeg_bin = bin.into();
        self
    }

    /// Fetches `url` into the staging area and returns the JPEG path.
    pub async fn fetch(&self, url: &str, staging: &StagingArea) -> Result<PathBuf, AppError> {
        let url = url::Url::parse(url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!("unsupported thumbnail scheme {}", url.scheme())));
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::HttpStatus(response.status()));
        }
        if let Some(len) = response.content_length() {
            if len > self.max_download_bytes {
                return Err(AppError::Validation(format!("thumbnail is {} bytes", len)));
            }
        }

        let source_path = staging.file(SOURCE_FILE);
        let mut file = fs_err::tokio::File::create(&source_path).await?;
        let mut stream = response.bytes_stream();
        let mut head: Vec<u8> = Vec::with_capacity(12);
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            if written > self.max_download_bytes {
                return Err(AppError::Validation(format!(
                    "thumbnail exceeds {} bytes",
                    self.max_download_bytes
                )));
            }
            if head.len() < 12 {
                let take = (12 - head.len()).min(chunk.len());
                head.extend_from_slice(&chunk[..take]);
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        drop(file);

        let target = staging.file(THUMBNAIL_FILE);
        match detect_image_format(&head) {
            ImageFormat::Jpeg if written <= config::thumbnail::TELEGRAM_MAX_BYTES => {
                fs_err::tokio::rename(&source_path, &target).await?;
            }
            ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP => {
                self.convert_to_jpeg(&source_path, &target).await?;
                let _ = fs_err::tokio::remove_file(&source_path).await;
            }
            ImageFormat::Unknown => {
                return Err(AppError::Validation("unrecognized thumbnail format".to_string()));
            }
        }

        log::debug!("Thumbnail ready at {}", target.display());
        Ok(target)
    }

    /// Scales to fit 320x320 and re-encodes as JPEG.
    async fn convert_to_jpeg(&self, input: &Path, output: &Path) -> Result<(), AppError> {
        let child = Command::new(&self.ffmpeg_bin)
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-y")
            .arg("-i")
            .arg(input)
            .arg("-vf")
            .arg("scale=320:320:force_original_aspect_ratio=decrease")
            .arg("-frames:v")
            .arg("1")
            .arg("-q:v")
            .arg("5")
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let result = tokio::time::timeout(config::thumbnail::convert_timeout(), child.wait_with_output())
            .await
            .map_err(|_| AppError::Validation("ffmpeg thumbnail conversion timed out".to_string()))??;

        if !result.status.success() {
            return Err(AppError::Validation(format!(
                "ffmpeg failed: {}",
                String::from_utf8_lossy(&result.stderr).trim()
            )));
        }

        let size = fs_err::tokio::metadata(output).await?.len();
        if size > config::thumbnail::TELEGRAM_MAX_BYTES {
            return Err(AppError::Validation(format!("converted thumbnail is still {} bytes", size)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0xFF, 0xD9];

    #[test]
    fn test_detect_image_format() {
        assert_eq!(detect_image_format(JPEG), ImageFormat::Jpeg);
        assert_eq!(
            detect_image_format(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]),
            ImageFormat::Png
        );
        assert_eq!(detect_image_format(b"RIFF\x00\x00\x00\x00WEBPVP8 "), ImageFormat::WebP);
        assert_eq!(detect_image_format(b"<html>"), ImageFormat::Unknown);
        assert_eq!(detect_image_format(&[0xFF, 0xD8]), ImageFormat::Unknown);
    }

    async fn staging() -> (tempfile::TempDir, StagingArea) {
        let root = tempfile::tempdir().unwrap();
        let area = StagingArea::create(root.path(), Uuid::new_v4()).await.unwrap();
        (root, area)
    }

    #[tokio::test]
    async fn test_small_jpeg_is_used_as_is() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/thumb.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG))
            .mount(&server)
            .await;

        let (_root, area) = staging().await;
        let fetcher = ThumbnailFetcher::new(reqwest::Client::new());
        let thumb = fetcher
            .fetch(&format!("{}/thumb.jpg", server.uri()), &area)
            .await
            .unwrap();

        assert_eq!(thumb, area.file("thumbnail.jpg"));
        assert_eq!(std::fs::read(&thumb).unwrap(), JPEG);
        assert!(!area.file("thumbnail.src").exists());
        area.cleanup().await;
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let (_root, area) = staging().await;
        let fetcher = ThumbnailFetcher::new(reqwest::Client::new());
        let err = fetcher.fetch(&format!("{}/missing.jpg", server.uri()), &area).await.unwrap_err();
        assert!(matches!(err, AppError::HttpStatus(s) if s.as_u16() == 404));
        area.cleanup().await;
    }

    #[tokio::test]
    async fn test_unknown_format_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not an image</html>"))
            .mount(&server)
            .await;

        let (_root, area) = staging().await;
        let fetcher = ThumbnailFetcher::new(reqwest::Client::new());
        let err = fetcher.fetch(&format!("{}/x", server.uri()), &area).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        area.cleanup().await;
    }

    #[tokio::test]
    async fn test_oversized_download_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFFu8; 4096]))
            .mount(&server)
            .await;

        let (_root, area) = staging().await;
        let fetcher = ThumbnailFetcher::new(reqwest::Client::new()).max_download_bytes(1024);
        let err = fetcher.fetch(&format!("{}/big", server.uri()), &area).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        area.cleanup().await;
    }

    #[tokio::test]
    async fn test_non_http_scheme_is_rejected() {
        let (_root, area) = staging().await;
        let fetcher = ThumbnailFetcher::new(reqwest::Client::new());
        assert!(fetcher.fetch("file:///etc/passwd", &area).await.is_err());
        area.cleanup().await;
    }
}
