//! yt-dlp backed extractor.
//!
//! Both operations run yt-dlp as a child process with a hard timeout.
//! `kill_on_drop` makes sure an abandoned download (timeout or `/cancel`)
//! does not keep running in the background.

use super::{FormatPreference, MediaExtractor, MediaInfo};
use crate::core::config;
use crate::core::error::AppError;
use crate::core::utils::truncate_chars;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use url::Url;

/// Output template inside the staging directory. Naming by id keeps the
/// artifact path predictable no matter what the title contains.
const OUTPUT_TEMPLATE: &str = "%(id)s.%(ext)s";

/// Longest stderr excerpt kept in error messages
const STDERR_SUMMARY_CHARS: usize = 300;

#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    bin: String,
    probe_timeout: Duration,
    fetch_timeout: Duration,
}

impl Default for YtDlpExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl YtDlpExtractor {
    /// Uses `YTDL_BIN` and the default timeouts.
    pub fn new() -> Self {
        Self::with_binary(
            config::YTDL_BIN.as_str(),
            config::download::probe_timeout(),
            config::download::fetch_timeout(),
        )
    }

    pub fn with_binary(bin: impl Into<String>, probe_timeout: Duration, fetch_timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            probe_timeout,
            fetch_timeout,
        }
    }

    async fn run_ytdlp(&self, args: Vec<OsString>, timeout: Duration, operation: &str) -> Result<String, AppError> {
        let started = Instant::now();
        log::debug!("Running {} {:?}", self.bin, args);

        let child = Command::new(&self.bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AppError::Extractor(format!("failed to start {}: {}", self.bin, e)))?;

        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                log::error!("yt-dlp {} timed out after {}s, killing", operation, timeout.as_secs());
                return Err(AppError::Extractor(format!(
                    "yt-dlp {} timed out after {}s",
                    operation,
                    timeout.as_secs()
                )));
            }
        };

        log::debug!("yt-dlp {} finished in {:?}", operation, started.elapsed());

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let summary = summarize_stderr(&stderr);
            log::warn!("yt-dlp {} failed ({}): {}", operation, output.status, summary);
            return Err(AppError::Extractor(summary));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl MediaExtractor for YtDlpExtractor {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn probe(&self, url: &Url) -> Result<MediaInfo, AppError> {
        let stdout = self.run_ytdlp(probe_args(url), self.probe_timeout, "probe").await?;
        parse_info_json(&stdout)
    }

    async fn fetch(&self, url: &Url, format: &FormatPreference, dest_dir: &Path) -> Result<MediaInfo, AppError> {
        let stdout = self
            .run_ytdlp(fetch_args(url, format, dest_dir), self.fetch_timeout, "download")
            .await?;
        parse_info_json(&stdout)
    }
}

/// Metadata only, never touches the filesystem.
pub fn probe_args(url: &Url) -> Vec<OsString> {
    [
        "--dump-single-json",
        "--no-playlist",
        "--skip-download",
        "--no-warnings",
        url.as_str(),
    ]
    .into_iter()
    .map(OsString::from)
    .collect()
}

/// Download into `dest_dir` and print the final info JSON once post-processing is done.
pub fn fetch_args(url: &Url, format: &FormatPreference, dest_dir: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = [
        "--no-playlist",
        "--no-warnings",
        "--no-progress",
        "--format",
    ]
    .into_iter()
    .map(OsString::from)
    .collect();

    args.push(format.selector().into());
    args.push("--merge-output-format".into());
    args.push(format.container.clone().into());
    args.push("--output".into());
    args.push(dest_dir.join(OUTPUT_TEMPLATE).into_os_string());
    args.push("--print".into());
    args.push("after_move:%()j".into());
    args.push("--no-simulate".into());
    args.push(url.as_str().into());
    args
}

/// Parses the last JSON object line of yt-dlp's stdout.
///
/// yt-dlp may print stray lines before the document (e.g. from plugins).
pub fn parse_info_json(stdout: &str) -> Result<MediaInfo, AppError> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with('{'))
        .ok_or_else(|| AppError::Extractor("yt-dlp produced no metadata".to_string()))?;

    let info: MediaInfo = serde_json::from_str(line)?;
    if info.id.trim().is_empty() {
        return Err(AppError::Extractor("yt-dlp metadata has no id".to_string()));
    }
    Ok(info)
}

/// Picks the most useful line from yt-dlp's stderr.
pub fn summarize_stderr(stderr: &str) -> String {
    let line = stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with("ERROR:"))
        .or_else(|| stderr.lines().rev().map(str::trim).find(|l| !l.is_empty()))
        .unwrap_or("yt-dlp exited with an error");
    truncate_chars(line, STDERR_SUMMARY_CHARS)
}
