use reqwest::Client;
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{info, warn};

use crate::config::Config;
use crate::parsers::ProductExtractor;

pub mod format;
mod handlers;
mod notifier;

pub use notifier::TelegramNotifier;

pub type HandlerResult = anyhow::Result<()>;

/// Shared state injected into every update handler.
pub struct AppContext {
    pub client: Arc<Client>,
    pub config: Arc<Config>,
    pub extractor: Arc<ProductExtractor>,
}

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "These commands are supported:")]
pub enum Command {
    #[command(description = "show the menu")]
    Start,
    #[command(description = "find products on a page: /search <URL>")]
    Search(String),
    #[command(description = "show help")]
    Help,
    #[command(description = "check that fetching and parsing work")]
    Test,
}

pub fn schema() -> UpdateHandler<anyhow::Error> {
    let commands = dptree::entry()
        .filter_command::<Command>()
        .branch(dptree::case![Command::Start].endpoint(handlers::start))
        .branch(dptree::case![Command::Search(url)].endpoint(handlers::search))
        .branch(dptree::case![Command::Help].endpoint(handlers::help))
        .branch(dptree::case![Command::Test].endpoint(handlers::test));

    let messages = Update::filter_message()
        .branch(commands)
        .branch(dptree::endpoint(handlers::text_message));

    let callbacks = Update::filter_callback_query().endpoint(handlers::callback);

    dptree::entry().branch(messages).branch(callbacks)
}

pub async fn run_dispatcher(bot: Bot, ctx: Arc<AppContext>) {
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Failed to register bot commands: {}", e);
    }

    info!("Bot is running");

    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![ctx])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_commands() {
        assert_eq!(Command::parse("/start", "product_bot").unwrap(), Command::Start);
        assert_eq!(
            Command::parse("/search https://shop.test", "product_bot").unwrap(),
            Command::Search("https://shop.test".to_string())
        );
        assert_eq!(Command::parse("/search", "product_bot").unwrap(), Command::Search(String::new()));
        assert_eq!(Command::parse("/test", "product_bot").unwrap(), Command::Test);
        assert!(Command::parse("/unknown", "product_bot").is_err());
    }
}
