//! Text messages: every non-command text is treated as a link request

use teloxide::types::ChatId;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use url::Url;

use super::callbacks::ButtonAction;
use super::types::{HandlerDeps, HandlerError, InboundText};
use crate::download::caption::preview_text;
use crate::download::error::{RelayError, SourceStage};
use crate::download::pipeline::{cancellable, Delivery};
use crate::download::progress::{RelayStatus, StatusMessage};
use crate::download::request::{validate_source_url, RelayRequest};
use crate::telegram::pending::PendingRequest;
use crate::telegram::transport::PromptButton;

/// What the handler did with a message
#[derive(Debug)]
pub enum LinkAction {
    /// Not a link; the user was told so
    Rejected,
    /// Preview is being prepared in the background
    Previewing(JoinHandle<PreviewOutcome>),
    /// Pipeline is running in the background
    Relaying(JoinHandle<Result<Delivery, RelayError>>),
}

/// How a preview ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewOutcome {
    /// Download/Cancel buttons are shown
    Prompted { token: String },
    /// Metadata lookup failed; the user was told so
    Unavailable,
    /// Stopped by `/cancel`
    Cancelled,
}

pub async fn handle_text(deps: &HandlerDeps, inbound: InboundText) -> Result<LinkAction, HandlerError> {
    if !deps.confirm_downloads {
        let request = RelayRequest::new(inbound.chat_id, inbound.text);
        let handle = deps.service.spawn(request, StatusMessage::new(inbound.chat_id));
        return Ok(LinkAction::Relaying(handle));
    }

    let url = match validate_source_url(&inbound.text) {
        Ok(url) => url,
        Err(e) => {
            log::info!("Rejected input from chat {}: {}", inbound.chat_id, e);
            deps.transport.send_text(inbound.chat_id, &e.user_message()).await?;
            return Ok(LinkAction::Rejected);
        }
    };

    let mut status = StatusMessage::new(inbound.chat_id);
    status.report(deps.transport.as_ref(), RelayStatus::Processing).await;

    let task_deps = deps.clone();
    let chat_id = inbound.chat_id;
    let handle = deps.service.spawn_tracked(inbound.chat_id, move |cancel| async move {
        prepare_preview(&task_deps, chat_id, url, status, &cancel).await
    });
    Ok(LinkAction::Previewing(handle))
}

/// Looks up metadata and turns the placeholder into a Download/Cancel prompt.
async fn prepare_preview(
    deps: &HandlerDeps,
    chat_id: ChatId,
    url: Url,
    mut status: StatusMessage,
    cancel: &CancellationToken,
) -> PreviewOutcome {
    let transport = deps.transport.as_ref();

    let info = match cancellable(cancel, deps.extractor.probe(&url)).await {
        Ok(Ok(info)) => info,
        Ok(Err(source)) => {
            let err = RelayError::SourceUnavailable {
                stage: SourceStage::Probe,
                source,
            };
            log::warn!("Preview for chat {} failed: {}", chat_id, err);
            status
                .report(transport, RelayStatus::Failed { reason: err.user_message() })
                .await;
            return PreviewOutcome::Unavailable;
        }
        Err(cancelled) => {
            log::info!("Preview for chat {} cancelled", chat_id);
            status
                .report(transport, RelayStatus::Failed { reason: cancelled.user_message() })
                .await;
            return PreviewOutcome::Cancelled;
        }
    };

    let text = preview_text(&info);
    let token = deps
        .pending
        .insert(PendingRequest::new(url.as_str(), chat_id, info))
        .await;
    let buttons = [
        PromptButton::new("📥 Download", ButtonAction::Relay(token.clone()).payload()),
        PromptButton::new("✖️ Cancel", ButtonAction::Drop(token.clone()).payload()),
    ];

    let edited = match status.message() {
        Some(placeholder) => match transport.edit_prompt(placeholder, &text, &buttons).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to turn placeholder into a prompt: {}. Sending a new one.", e);
                false
            }
        },
        None => false,
    };
    if !edited {
        if let Err(e) = transport.send_prompt(chat_id, &text, &buttons).await {
            log::error!("Failed to send prompt to chat {}: {}", chat_id, e);
        }
    }

    PreviewOutcome::Prompted { token }
}
