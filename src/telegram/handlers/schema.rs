//! Dispatcher schema and handler chain builders

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::Message;

use super::callbacks::handle_button;
use super::commands::handle_command;
use super::messages::handle_text;
use super::types::{HandlerDeps, HandlerError, InboundButton, InboundText};
use crate::telegram::bot::Command;
use crate::telegram::Bot;

/// Creates the main dispatcher schema for the Telegram bot.
///
/// The handlers return as soon as a relay task is spawned, so one slow
/// download never holds up other chats.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    dptree::entry()
        .branch(command_handler(deps.clone()))
        .branch(message_handler(deps.clone()))
        .branch(callback_handler(deps))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move { handle_command(&deps, msg.chat.id, cmd).await }
        },
    ))
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_map(|msg: Message| InboundText::from_message(&msg))
        .endpoint(move |inbound: InboundText| {
            let deps = deps.clone();
            async move {
                handle_text(&deps, inbound).await?;
                Ok(())
            }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            // Stop the spinner on the button regardless of the outcome
            if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
                log::warn!("Failed to answer callback query: {}", e);
            }

            if let Some(inbound) = InboundButton::from_callback(&q) {
                handle_button(&deps, inbound).await?;
            }
            Ok(())
        }
    })
}
