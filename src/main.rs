use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use vidrelay::cli::{Cli, Commands};
use vidrelay::core::metrics::init_metrics;
use vidrelay::core::metrics_server::start_metrics_server;
use vidrelay::core::retry::{retry, RetryConfig};
use vidrelay::core::utils::{format_duration, format_file_size};
use vidrelay::core::{config, init_logger, log_startup_configuration, AppError, Settings};
use vidrelay::download::source::ytdlp::YtDlpExtractor;
use vidrelay::download::{MediaExtractor, PipelineSettings, RelayPipeline, RelayService, ThumbnailFetcher};
use vidrelay::telegram::{
    create_bot, run_webhook, schema, setup_bot_commands, ChatTransport, HandlerDeps, PendingRequests, TelegramTransport,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // .env first so LOG_FILE_PATH and friends can come from it
    let _ = dotenv();

    std::panic::set_hook(Box::new(|info| {
        log::error!("Panic: {}", info);
        eprintln!("Panic: {}", info);
    }));

    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run { webhook }) => run_bot(webhook).await,
        Some(Commands::Info { url, json }) => run_cli_info(&url, json).await,
        None => run_bot(false).await,
    }
}

async fn run_bot(use_webhook: bool) -> Result<()> {
    log::info!("Starting vidrelay...");

    let settings = Settings::from_env()?;
    log_startup_configuration(&settings);

    if let Err(e) = init_metrics() {
        log::warn!("Failed to register metrics: {}", e);
    }

    let bot = create_bot(&settings)?;

    let me = retry(&RetryConfig::startup(), "get_me", || {
        let bot = bot.clone();
        async move { bot.get_me().await.map_err(AppError::from) }
    })
    .await
    .into_result()?;
    log::info!("Authorized as @{}", me.username());

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let transport: Arc<dyn ChatTransport> = Arc::new(TelegramTransport::new(bot.clone()));
    let extractor: Arc<dyn MediaExtractor> = Arc::new(YtDlpExtractor::new());
    let pipeline = RelayPipeline::new(
        Arc::clone(&extractor),
        Arc::clone(&transport),
        ThumbnailFetcher::with_default_client()?,
        PipelineSettings::from_settings(&settings),
    );
    let service = RelayService::new(Arc::new(pipeline));
    let pending = PendingRequests::new(settings.pending_ttl);
    let deps = HandlerDeps::new(transport, extractor, service, pending, settings.confirm_downloads);
    let handler = schema(deps);

    if use_webhook {
        let hook = settings.require_webhook()?;
        log::info!("Running in webhook mode");
        return run_webhook(bot, handler, hook).await;
    }

    if let Some(port) = settings.metrics_port {
        tokio::spawn(async move {
            if let Err(e) = start_metrics_server(port).await {
                log::error!("Metrics server error: {}", e);
            }
        });
    }

    log::info!("Running in long polling mode");
    let listener = Polling::builder(bot.clone())
        .drop_pending_updates()
        .delete_webhook()
        .await
        .build();

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        )
        .await;

    log::info!("Dispatcher stopped");
    Ok(())
}

async fn run_cli_info(raw_url: &str, json: bool) -> Result<()> {
    let url = url::Url::parse(raw_url)?;
    let extractor = YtDlpExtractor::new();
    let info = extractor.probe(&url).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("ID:       {}", info.id);
    println!("Title:    {}", info.display_title());
    println!("Uploader: {}", info.display_uploader());
    println!(
        "Duration: {}",
        info.duration_secs().map(|d| format_duration(u64::from(d))).unwrap_or_else(|| "N/A".to_string())
    );
    if let Some(size) = info.size_hint() {
        println!("Size:     ~{}", format_file_size(size));
    }
    if let Some(thumb) = &info.thumbnail {
        println!("Thumb:    {}", thumb);
    }
    Ok(())
}
