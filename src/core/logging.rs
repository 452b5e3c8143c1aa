//! Logging initialization and startup diagnostics
//!
//! This module provides:
//! - Logger initialization (console + file)
//! - A configuration banner printed once at startup

use anyhow::Result;
use simplelog::*;

use crate::core::config::{self, Settings};

/// Initialize logger for both console and file output
///
/// # Arguments
/// * `log_file_path` - Path to the log file
///
/// # Returns
/// * `Ok(())` - Logger initialized successfully
/// * `Err(anyhow::Error)` - Failed to initialize logger
pub fn init_logger(log_file_path: &str) -> Result<()> {
    let log_file =
        fs_err::File::create(log_file_path).map_err(|e| anyhow::anyhow!("Failed to create log file: {}", e))?;

    let log_config = ConfigBuilder::new()
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("reqwest")
        .build();

    CombinedLogger::init(vec![
        TermLogger::new(
            LevelFilter::Info,
            log_config.clone(),
            TerminalMode::Mixed,
            ColorChoice::Auto,
        ),
        WriteLogger::new(LevelFilter::Info, log_config, log_file),
    ])
    .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {}", e))?;

    Ok(())
}

/// Logs the effective configuration at application startup
///
/// The bot token is never printed.
pub fn log_startup_configuration(settings: &Settings) {
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("🎬 vidrelay configuration");
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    log::info!("yt-dlp binary: {}", config::YTDL_BIN.as_str());
    log::info!("ffmpeg binary: {}", config::FFMPEG_BIN.as_str());

    match settings.archive {
        Some(archive) => log::info!("✅ Archive chat: {} (mode: {})", archive.chat_id, archive.mode),
        None => log::warn!("⚠️  Archive chat: not set, videos go to the requester only"),
    }

    match settings.max_upload_bytes {
        Some(limit) => log::info!("Upload limit: {}", crate::core::utils::format_file_size(limit)),
        None => log::info!("Upload limit: disabled"),
    }

    log::info!("Staging root: {}", settings.staging_root.display());
    log::info!("Preferred container: {}", settings.preferred_container);
    log::info!("Probe before download: {}", settings.probe_before_download);
    log::info!("Confirm downloads: {}", settings.confirm_downloads);

    if let Some(url) = &settings.bot_api_url {
        log::info!("Bot API URL: {}", url);
    }
    if let Some(url) = &settings.webhook_url {
        log::info!("Webhook URL: {} (listening on {})", url, settings.listen_addr);
    }
    if let Some(port) = settings.metrics_port {
        log::info!("Metrics port: {}", port);
    }
    log::info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}
