//! vidrelay - Telegram bot that downloads videos with yt-dlp and relays them
//!
//! # Module Structure
//!
//! - `core`: configuration, errors, logging, metrics and retries
//! - `download`: extractor, staging area, thumbnails, captions and the relay pipeline
//! - `telegram`: bot setup, chat transport, confirmation cache and handlers

pub mod cli;
pub mod core;
pub mod download;
pub mod telegram;

// Re-export commonly used types for convenience
pub use crate::core::{config, AppError, Settings};
pub use crate::download::{RelayError, RelayPipeline, RelayRequest, RelayService};
pub use crate::telegram::{schema, HandlerDeps};
