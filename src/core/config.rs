use once_cell::sync::Lazy;
use secrecy::SecretString;
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use strum::{Display, EnumString};
use teloxide::types::ChatId;
use thiserror::Error;
use url::Url;

/// Cached yt-dlp binary path
/// Read once at startup from YTDL_BIN environment variable or defaults to "yt-dlp"
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// ffmpeg binary used to turn thumbnails into Telegram-compatible JPEGs
pub static FFMPEG_BIN: Lazy<String> = Lazy::new(|| env::var("FFMPEG_BIN").unwrap_or_else(|_| "ffmpeg".to_string()));

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: app.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "app.log".to_string()));

/// Download configuration
pub mod download {
    use super::Duration;

    /// Timeout for metadata-only yt-dlp calls (in seconds)
    pub const YTDLP_PROBE_TIMEOUT_SECS: u64 = 240;

    /// Timeout for a full yt-dlp download including the merge step (in seconds)
    pub const YTDLP_FETCH_TIMEOUT_SECS: u64 = 30 * 60;

    /// Default Bot API upload limit (in megabytes)
    pub const DEFAULT_MAX_UPLOAD_MB: u64 = 50;

    /// Container requested from yt-dlp when none is configured
    pub const DEFAULT_CONTAINER: &str = "mp4";

    /// Prefix of every per-request staging directory
    pub const STAGING_PREFIX: &str = "vidrelay-";

    pub fn probe_timeout() -> Duration {
        Duration::from_secs(YTDLP_PROBE_TIMEOUT_SECS)
    }

    pub fn fetch_timeout() -> Duration {
        Duration::from_secs(YTDLP_FETCH_TIMEOUT_SECS)
    }
}

/// Thumbnail configuration
pub mod thumbnail {
    use super::Duration;

    /// Largest thumbnail we are willing to download (in bytes)
    pub const MAX_DOWNLOAD_BYTES: u64 = 5 * 1024 * 1024;

    /// Telegram rejects thumbnails above 200 KB
    pub const TELEGRAM_MAX_BYTES: u64 = 200 * 1024;

    /// Timeout for the ffmpeg conversion step (in seconds)
    pub const CONVERT_TIMEOUT_SECS: u64 = 30;

    pub fn convert_timeout() -> Duration {
        Duration::from_secs(CONVERT_TIMEOUT_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for Bot API calls (in seconds)
    /// Large video uploads can take several minutes
    pub const REQUEST_TIMEOUT_SECS: u64 = 900; // 15 minutes

    /// Timeout for fetching a thumbnail image (in seconds)
    pub const THUMBNAIL_TIMEOUT_SECS: u64 = 20;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }

    pub fn thumbnail_timeout() -> Duration {
        Duration::from_secs(THUMBNAIL_TIMEOUT_SECS)
    }
}

/// Retry configuration for startup calls against the Bot API
pub mod retry {
    /// Attempts for webhook registration before giving up
    pub const WEBHOOK_MAX_ATTEMPTS: u32 = 5;

    /// Attempts for the initial getMe call
    pub const STARTUP_MAX_ATTEMPTS: u32 = 12;
}

/// Pending confirmation configuration
pub mod pending {
    /// How long a confirmation button stays valid (in seconds)
    pub const DEFAULT_TTL_SECS: u64 = 600;

    /// Upper bound on stored confirmations
    pub const MAX_ENTRIES: u64 = 10_000;
}

/// Configuration errors that stop the process from starting
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// How the archive channel receives a copy of each video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ArchiveMode {
    /// Upload once to the archive, then forward that message to the requester
    Forward,
    /// Upload to the requester, then upload a second copy to the archive
    Reupload,
}

/// Archive destination and delivery mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveTarget {
    pub chat_id: ChatId,
    pub mode: ArchiveMode,
}

/// Everything needed to run in webhook mode
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    pub url: Url,
    pub listen_addr: SocketAddr,
    pub secret: Option<String>,
}

/// Process configuration, read once at startup.
#[derive(Debug)]
pub struct Settings {
    pub bot_token: SecretString,
    pub bot_api_url: Option<Url>,
    pub archive: Option<ArchiveTarget>,
    pub webhook_url: Option<Url>,
    pub listen_addr: SocketAddr,
    pub webhook_secret: Option<String>,
    /// `None` disables size gating
    pub max_upload_bytes: Option<u64>,
    pub staging_root: PathBuf,
    pub preferred_container: String,
    pub probe_before_download: bool,
    pub confirm_downloads: bool,
    pub pending_ttl: Duration,
    pub metrics_port: Option<u16>,
}

impl Settings {
    /// Reads settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Reads settings through an arbitrary lookup function.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get("BOT_TOKEN")
            .or_else(|| get("TELOXIDE_TOKEN"))
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;

        let bot_api_url = get("BOT_API_URL").map(|v| parse_url("BOT_API_URL", &v)).transpose()?;

        let archive = match get("ARCHIVE_CHAT_ID").or_else(|| get("DUMB_CHANNEL_ID")) {
            Some(raw) => {
                let chat_id = raw.parse::<i64>().map_err(|e| invalid("ARCHIVE_CHAT_ID", &raw, e))?;
                let mode = match get("ARCHIVE_MODE") {
                    Some(m) => m.parse::<ArchiveMode>().map_err(|e| invalid("ARCHIVE_MODE", &m, e))?,
                    None => ArchiveMode::Forward,
                };
                Some(ArchiveTarget {
                    chat_id: ChatId(chat_id),
                    mode,
                })
            }
            None => None,
        };

        let webhook_url = get("WEBHOOK_URL")
            .map(|v| parse_url("WEBHOOK_URL", &v).map(webhook_endpoint))
            .transpose()?;

        let listen_addr = match (get("WEBHOOK_LISTEN_ADDR"), get("PORT")) {
            (Some(addr), _) => addr
                .parse::<SocketAddr>()
                .map_err(|e| invalid("WEBHOOK_LISTEN_ADDR", &addr, e))?,
            (None, Some(port)) => {
                let port = port.parse::<u16>().map_err(|e| invalid("PORT", &port, e))?;
                SocketAddr::from(([0, 0, 0, 0], port))
            }
            (None, None) => SocketAddr::from(([0, 0, 0, 0], 8080)),
        };

        let max_upload_mb = match get("MAX_UPLOAD_MB") {
            Some(raw) => raw.parse::<u64>().map_err(|e| invalid("MAX_UPLOAD_MB", &raw, e))?,
            None => download::DEFAULT_MAX_UPLOAD_MB,
        };
        let max_upload_bytes = (max_upload_mb > 0).then(|| max_upload_mb.saturating_mul(1024 * 1024));

        let staging_raw = get("STAGING_DIR")
            .or_else(|| get("TEMP_FILES_DIR"))
            .unwrap_or_else(|| "/tmp".to_string());
        let staging_root = PathBuf::from(shellexpand::tilde(&staging_raw).into_owned());

        let preferred_container = get("PREFERRED_CONTAINER").unwrap_or_else(|| download::DEFAULT_CONTAINER.to_string());
        if !preferred_container.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Invalid {
                name: "PREFERRED_CONTAINER",
                value: preferred_container,
                reason: "expected a bare extension such as mp4".to_string(),
            });
        }

        let probe_before_download = parse_flag(&get, "PROBE_BEFORE_DOWNLOAD", true)?;
        let confirm_downloads = parse_flag(&get, "CONFIRM_DOWNLOADS", false)?;

        let pending_ttl = match get("PENDING_TTL_SECS") {
            Some(raw) => Duration::from_secs(raw.parse::<u64>().map_err(|e| invalid("PENDING_TTL_SECS", &raw, e))?),
            None => Duration::from_secs(pending::DEFAULT_TTL_SECS),
        };

        let metrics_port = get("METRICS_PORT")
            .map(|raw| raw.parse::<u16>().map_err(|e| invalid("METRICS_PORT", &raw, e)))
            .transpose()?;

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            bot_api_url,
            archive,
            webhook_url,
            listen_addr,
            webhook_secret: get("WEBHOOK_SECRET"),
            max_upload_bytes,
            staging_root,
            preferred_container: preferred_container.to_lowercase(),
            probe_before_download,
            confirm_downloads,
            pending_ttl,
            metrics_port,
        })
    }

    /// Webhook settings, or an error when WEBHOOK_URL is missing.
    pub fn require_webhook(&self) -> Result<WebhookSettings, ConfigError> {
        let url = self.webhook_url.clone().ok_or(ConfigError::Missing("WEBHOOK_URL"))?;
        Ok(WebhookSettings {
            url,
            listen_addr: self.listen_addr,
            secret: self.webhook_secret.clone(),
        })
    }
}

/// Appends the default `/webhook` path when the configured URL has none.
fn webhook_endpoint(mut url: Url) -> Url {
    if url.path().is_empty() || url.path() == "/" {
        url.set_path("/webhook");
    }
    url
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| invalid(name, raw, e))
}

fn parse_flag<G>(get: &G, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                name,
                value: raw,
                reason: "expected true or false".to_string(),
            }),
        },
    }
}

fn invalid(name: &'static str, value: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
