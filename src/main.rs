use anyhow::{Context, Result};
use std::sync::Arc;
use teloxide::Bot;
use tokio::sync::watch;
use tracing::{error, info, warn};

use product_bot::config::Config;
use product_bot::monitor::Scanner;
use product_bot::parsers::ProductExtractor;
use product_bot::storage;
use product_bot::telegram::{self, AppContext, TelegramNotifier};
use product_bot::utils;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Arc::new(Config::load()?);

    // Initialize logging
    utils::logging::init(&config.log)?;

    info!("Starting Product Bot");

    let token = config
        .bot_token
        .clone()
        .context("BOT_TOKEN environment variable is not set")?;
    let bot = Bot::new(token);

    // Initialize HTTP client with connection pooling
    let client = Arc::new(utils::http::create_client(&config.http)?);
    let extractor = Arc::new(ProductExtractor::new(&config.extractor)?);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let scanner = if config.monitor.enabled && !config.monitor.categories.is_empty() {
        let storage = storage::open(&config.storage).await?;

        if config.monitor.notify_chat_ids.is_empty() {
            warn!("Monitor has categories but no notify_chat_ids, changes will only be logged");
        }

        let notifier = Arc::new(TelegramNotifier::new(
            bot.clone(),
            &config.monitor.notify_chat_ids,
            config.format.clone(),
        ));
        let scanner = Scanner::new(client.clone(), config.clone(), extractor.clone(), storage, notifier);
        Some(tokio::spawn(scanner.run(shutdown_rx)))
    } else {
        info!("Category monitor disabled");
        None
    };

    let ctx = Arc::new(AppContext {
        client,
        config: config.clone(),
        extractor,
    });

    telegram::run_dispatcher(bot, ctx).await;

    let _ = shutdown_tx.send(true);
    if let Some(handle) = scanner {
        if let Err(e) = handle.await {
            error!("Scanner task ended abnormally: {}", e);
        }
    }

    info!("Product Bot stopped");
    Ok(())
}
