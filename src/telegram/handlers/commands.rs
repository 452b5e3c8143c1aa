//! Command handler implementations (/start, /help, /cancel)

use indoc::indoc;
use teloxide::types::ChatId;

use super::types::{HandlerDeps, HandlerError};
use crate::telegram::bot::Command;

const WELCOME_TEXT: &str = indoc! {"
    👋 Hi! Send me a link to a video and I'll download it and send it back to you.

    Use /help to see what I can do.
"};

const HELP_TEXT: &str = indoc! {"
    📖 How to use:
    1. Send a link (YouTube, Vimeo, TikTok and many more).
    2. Wait while I download and upload the video.

    Commands:
    /start - welcome message
    /help - this message
    /cancel - stop your running downloads
"};

pub async fn handle_command(deps: &HandlerDeps, chat_id: ChatId, cmd: Command) -> Result<(), HandlerError> {
    log::info!("Received command {:?} from chat {}", cmd, chat_id);

    match cmd {
        Command::Start => {
            deps.transport.send_text(chat_id, WELCOME_TEXT.trim_end()).await?;
        }
        Command::Help => {
            deps.transport.send_text(chat_id, HELP_TEXT.trim_end()).await?;
        }
        Command::Cancel => {
            let cancelled = deps.service.cancel_chat(chat_id);
            let text = if cancelled == 0 {
                "Nothing to cancel.".to_string()
            } else {
                format!("🛑 Cancelling {} download(s)...", cancelled)
            };
            deps.transport.send_text(chat_id, &text).await?;
        }
    }

    Ok(())
}
