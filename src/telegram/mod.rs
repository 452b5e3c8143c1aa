//! Telegram bot integration: bot setup, transport, confirmation cache and handlers

pub mod bot;
pub mod handlers;
pub mod pending;
pub mod transport;
pub mod webhook;

pub type Bot = teloxide::Bot;

pub use bot::{create_bot, setup_bot_commands, Command};
pub use handlers::{schema, HandlerDeps, HandlerError};
pub use pending::{PendingRequest, PendingRequests};
pub use transport::{ChatTransport, MediaUpload, PromptButton, SentMessage, TelegramTransport, UploadKind};
pub use webhook::run_webhook;
