//! Telegram bot handler tree configuration
//!
//! The handler functions take normalized inbound events and [`HandlerDeps`],
//! so integration tests drive them with a recording transport instead of a
//! live bot. [`schema`] wires them into teloxide's dispatcher.

mod callbacks;
mod commands;
mod messages;
mod schema;
mod types;

pub use callbacks::{handle_button, ButtonAction, ButtonOutcome};
pub use commands::handle_command;
pub use messages::{handle_text, LinkAction, PreviewOutcome};
pub use schema::schema;
pub use types::{HandlerDeps, HandlerError, InboundButton, InboundText};
