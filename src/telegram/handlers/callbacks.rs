//! Confirmation buttons

use chrono::Utc;
use tokio::task::JoinHandle;

use super::types::{HandlerDeps, HandlerError, InboundButton};
use crate::download::error::RelayError;
use crate::download::pipeline::Delivery;
use crate::download::progress::StatusMessage;
use crate::download::request::RelayRequest;
use crate::telegram::transport::SentMessage;

const RELAY_PREFIX: &str = "relay:";
const DROP_PREFIX: &str = "drop:";

/// Parsed button payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Relay(String),
    Drop(String),
}

impl ButtonAction {
    pub fn parse(payload: &str) -> Option<Self> {
        if let Some(token) = payload.strip_prefix(RELAY_PREFIX) {
            (!token.is_empty()).then(|| ButtonAction::Relay(token.to_string()))
        } else if let Some(token) = payload.strip_prefix(DROP_PREFIX) {
            (!token.is_empty()).then(|| ButtonAction::Drop(token.to_string()))
        } else {
            None
        }
    }

    pub fn payload(&self) -> String {
        match self {
            ButtonAction::Relay(token) => format!("{}{}", RELAY_PREFIX, token),
            ButtonAction::Drop(token) => format!("{}{}", DROP_PREFIX, token),
        }
    }

    fn token(&self) -> &str {
        match self {
            ButtonAction::Relay(token) | ButtonAction::Drop(token) => token,
        }
    }
}

#[derive(Debug)]
pub enum ButtonOutcome {
    /// Payload did not come from us
    Ignored,
    /// Token unknown, expired, already used or owned by another chat
    Expired,
    Dropped,
    Relaying(JoinHandle<Result<Delivery, RelayError>>),
}

pub async fn handle_button(deps: &HandlerDeps, inbound: InboundButton) -> Result<ButtonOutcome, HandlerError> {
    let Some(action) = ButtonAction::parse(&inbound.payload) else {
        log::debug!("Ignoring unknown callback payload {:?}", inbound.payload);
        return Ok(ButtonOutcome::Ignored);
    };

    let prompt = SentMessage {
        chat_id: inbound.chat_id,
        message_id: inbound.message_id,
    };

    let Some(pending) = deps.pending.take(action.token(), inbound.chat_id).await else {
        deps.transport.edit_text(prompt, "⌛ This request has expired. Send the link again.").await?;
        return Ok(ButtonOutcome::Expired);
    };

    log::debug!(
        "Chat {} answered a prompt created {}s ago",
        pending.chat_id,
        (Utc::now() - pending.created_at).num_seconds()
    );

    match action {
        ButtonAction::Drop(_) => {
            deps.transport.edit_text(prompt, "🛑 Cancelled.").await?;
            Ok(ButtonOutcome::Dropped)
        }
        ButtonAction::Relay(_) => {
            let request = RelayRequest::new(pending.chat_id, pending.url).with_preview(pending.preview);
            let handle = deps.service.spawn(request, StatusMessage::with_existing(prompt));
            Ok(ButtonOutcome::Relaying(handle))
        }
    }
}
