//! Webhook mode: teloxide's axum listener plus our health routes on one port.

use anyhow::Context;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tokio::net::TcpListener;
use uuid::Uuid;

use crate::core::config::WebhookSettings;
use crate::core::error::AppError;
use crate::core::metrics_server::health_router;
use crate::core::retry::{retry, RetryConfig};
use crate::telegram::handlers::HandlerError;
use crate::telegram::Bot;

/// Registers the webhook URL with Telegram, retrying transient failures.
pub async fn register_webhook(bot: &Bot, hook: &WebhookSettings, secret: &str) -> Result<(), AppError> {
    let result = retry(&RetryConfig::webhook(), "set_webhook", || {
        let bot = bot.clone();
        let url = hook.url.clone();
        let secret = secret.to_string();
        async move {
            bot.set_webhook(url)
                .secret_token(secret)
                .drop_pending_updates(true)
                .await
                .map(|_| ())
                .map_err(AppError::from)
        }
    })
    .await;

    let attempts = result.attempts;
    result.into_result()?;
    log::info!("Webhook set to {} after {} attempt(s)", hook.url, attempts);
    Ok(())
}

/// Serves the webhook and health routes and dispatches updates until Ctrl-C.
pub async fn run_webhook(bot: Bot, handler: UpdateHandler<HandlerError>, hook: WebhookSettings) -> anyhow::Result<()> {
    // Telegram echoes the secret in a header; without one anyone could post updates
    let secret = hook.secret.clone().unwrap_or_else(|| Uuid::new_v4().simple().to_string());

    // Telegram must not be pointed at a port we could not take
    let tcp = TcpListener::bind(hook.listen_addr)
        .await
        .with_context(|| format!("Failed to bind webhook listener on {}", hook.listen_addr))?;

    let options = webhooks::Options::new(hook.listen_addr, hook.url.clone()).secret_token(secret.clone());
    let (listener, stop_flag, router) = webhooks::axum_no_setup(options);

    register_webhook(&bot, &hook, &secret).await?;

    let app = router.merge(health_router());
    log::info!("Listening for webhook updates on {} ({})", hook.listen_addr, hook.url.path());

    let server = tokio::spawn(async move { axum::serve(tcp, app).with_graceful_shutdown(stop_flag).await });

    Dispatcher::builder(bot.clone(), handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the webhook listener"),
        )
        .await;

    if let Err(e) = bot.delete_webhook().await {
        log::warn!("Failed to delete webhook on shutdown: {}", e);
    }

    match server.await {
        Ok(Ok(())) => log::info!("Webhook server stopped"),
        Ok(Err(e)) => log::error!("Webhook server failed: {}", e),
        Err(e) => log::error!("Webhook server task failed: {}", e),
    }

    Ok(())
}
