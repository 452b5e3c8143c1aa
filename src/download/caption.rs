//! Caption and preview text for relayed videos (Telegram MarkdownV2).

use super::source::MediaInfo;
use crate::core::utils::{
    escape_markdown_v2, escape_markdown_v2_url, format_duration, format_file_size, truncate_chars,
};
use url::Url;

/// Telegram caps captions at 1024 characters after entity parsing
const MAX_TITLE_CHARS: usize = 300;
const MAX_UPLOADER_CHARS: usize = 200;

/// Builds the video caption:
///
/// ```text
/// 🎬 *Title:* <title>
/// 👤 *Uploader:* <uploader>
/// ⏱ *Duration:* m:ss
/// 🔗 *Source:* [Link](<url>)
/// ```
pub fn build_caption(info: &MediaInfo, source: &Url) -> String {
    let title = truncate_chars(info.display_title(), MAX_TITLE_CHARS);
    let uploader = truncate_chars(info.display_uploader(), MAX_UPLOADER_CHARS);
    let duration = info
        .duration_secs()
        .map(|s| format_duration(u64::from(s)))
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "🎬 *Title:* {}\n👤 *Uploader:* {}\n⏱ *Duration:* {}\n🔗 *Source:* [Link]({})",
        escape_markdown_v2(&title),
        escape_markdown_v2(&uploader),
        escape_markdown_v2(&duration),
        escape_markdown_v2_url(source.as_str()),
    )
}

/// Plain-text preview shown above the confirmation buttons.
pub fn preview_text(info: &MediaInfo) -> String {
    let mut text = format!("🎬 {}\n👤 {}", info.display_title(), info.display_uploader());
    if let Some(secs) = info.duration_secs() {
        text.push_str(&format!("\n⏱ {}", format_duration(u64::from(secs))));
    }
    if let Some(size) = info.size_hint() {
        text.push_str(&format!("\n💾 ~{}", format_file_size(size)));
    }
    text.push_str("\n\nDownload this video?");
    text
}
