use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardButton, InlineKeyboardMarkup, InputFile, ParseMode};
use teloxide::{ApiError, RequestError};
use tracing::{info, instrument, warn};
use url::Url;

use crate::models::Product;
use crate::parsers::Extraction;
use crate::telegram::{format, AppContext, HandlerResult};
use crate::utils::http::{fetch_html, normalize_url};

static URL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("Invalid URL regex"));

const CB_SEARCH: &str = "search_products";
const CB_HELP: &str = "help";
const CB_BACK: &str = "back_to_menu";

fn main_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback("🛍️ Search products", CB_SEARCH)],
        vec![InlineKeyboardButton::callback("ℹ️ Help", CB_HELP)],
    ])
}

fn back_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("🔙 Back", CB_BACK)]])
}

/// First http(s) URL in a free-form message.
pub(crate) fn find_url(text: &str) -> Option<&str> {
    URL_REGEX.find(text).map(|m| m.as_str())
}

#[instrument(skip_all, fields(chat = msg.chat.id.0))]
pub async fn start(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, format::welcome_text())
        .parse_mode(ParseMode::Html)
        .reply_markup(main_menu_keyboard())
        .await?;
    Ok(())
}

#[instrument(skip_all, fields(chat = msg.chat.id.0))]
pub async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, format::help_text())
        .parse_mode(ParseMode::Html)
        .await?;
    Ok(())
}

#[instrument(skip_all, fields(chat = msg.chat.id.0))]
pub async fn search(bot: Bot, msg: Message, url: String, ctx: Arc<AppContext>) -> HandlerResult {
    let url = url.trim();
    if url.is_empty() {
        bot.send_message(msg.chat.id, format::search_usage())
            .parse_mode(ParseMode::Html)
            .await?;
        return Ok(());
    }

    // only the first argument is the URL
    let url = url.split_whitespace().next().unwrap_or(url);
    process_website(&bot, &ctx, msg.chat.id, url).await
}

#[instrument(skip_all, fields(chat = msg.chat.id.0))]
pub async fn test(bot: Bot, msg: Message, ctx: Arc<AppContext>) -> HandlerResult {
    let test_url = ctx.config.test_url.clone();
    let status = bot
        .send_message(msg.chat.id, format!("🧪 Testing {}...", format::escape(&test_url)))
        .parse_mode(ParseMode::Html)
        .await?;

    let report = match normalize_url(&test_url) {
        Ok(url) => {
            let started = Instant::now();
            match fetch_html(&ctx.client, &url, &ctx.config.http).await {
                Ok(page) => {
                    let extraction = ctx.extractor.extract(&page.html, &page.url);
                    format::test_report(&page, &extraction, started.elapsed())
                }
                Err(e) => {
                    warn!("Test fetch failed: {}", e);
                    format::test_failed(&test_url, &e)
                }
            }
        }
        Err(e) => format::test_failed(&test_url, &e),
    };

    bot.edit_message_text(msg.chat.id, status.id, report)
        .parse_mode(ParseMode::Html)
        .disable_web_page_preview(true)
        .await?;
    Ok(())
}

#[instrument(skip_all, fields(chat = msg.chat.id.0))]
pub async fn text_message(bot: Bot, msg: Message, ctx: Arc<AppContext>) -> HandlerResult {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    match find_url(text) {
        Some(url) => process_website(&bot, &ctx, msg.chat.id, url).await,
        None => {
            bot.send_message(msg.chat.id, format::not_a_url()).await?;
            Ok(())
        }
    }
}

#[instrument(skip_all, fields(data = ?query.data))]
pub async fn callback(bot: Bot, query: CallbackQuery) -> HandlerResult {
    bot.answer_callback_query(query.id.clone()).await?;

    let Some(message) = query.message else {
        return Ok(());
    };

    let (text, keyboard) = match query.data.as_deref() {
        Some(CB_SEARCH) => (format::search_prompt(), None),
        Some(CB_HELP) => (format::help_text(), Some(back_keyboard())),
        Some(CB_BACK) => (format::menu_text(), Some(main_menu_keyboard())),
        other => {
            warn!("Unknown callback data: {:?}", other);
            return Ok(());
        }
    };

    let mut request = bot
        .edit_message_text(message.chat.id, message.id, text)
        .parse_mode(ParseMode::Html);
    if let Some(keyboard) = keyboard {
        request = request.reply_markup(keyboard);
    }

    match request.await {
        Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Fetch a page, extract products and answer in `chat`. Problems with the
/// page itself are reported to the user, not returned.
async fn process_website(bot: &Bot, ctx: &AppContext, chat: ChatId, raw_url: &str) -> HandlerResult {
    let url = match normalize_url(raw_url) {
        Ok(url) => url,
        Err(e) => {
            info!("Rejected URL {:?}: {}", raw_url, e);
            bot.send_message(chat, format::url_error(&e)).await?;
            return Ok(());
        }
    };

    let status = bot.send_message(chat, format::searching()).await?;

    let page = match fetch_html(&ctx.client, &url, &ctx.config.http).await {
        Ok(page) => page,
        Err(e) => {
            warn!(url = %url, "Failed to load site: {}", e);
            bot.edit_message_text(chat, status.id, format::load_failed()).await?;
            return Ok(());
        }
    };

    let Extraction { products, selector } = ctx.extractor.extract(&page.html, &page.url);
    info!(
        url = %page.url,
        selector = selector.as_deref().unwrap_or("none"),
        "Found {} products",
        products.len()
    );

    let site_name = page.url.host_str().unwrap_or("site").to_string();
    let message = format::products_message(&products, &site_name, &ctx.config.format);

    bot.edit_message_text(chat, status.id, message)
        .parse_mode(ParseMode::Html)
        .disable_web_page_preview(true)
        .await?;

    if ctx.config.format.send_photos {
        send_photo_cards(bot, ctx, chat, &products).await;
    }

    Ok(())
}

async fn send_photo_cards(bot: &Bot, ctx: &AppContext, chat: ChatId, products: &[Product]) {
    let with_images = products
        .iter()
        .take(ctx.config.format.max_reply_items)
        .filter_map(|p| {
            let image = p.image_url.as_deref().and_then(|u| Url::parse(u).ok())?;
            Some((p, image))
        })
        .take(ctx.config.format.max_photo_cards);

    for (product, image) in with_images {
        let caption = format::product_caption(product, &ctx.config.format);
        if let Err(e) = bot
            .send_photo(chat, InputFile::url(image))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .await
        {
            warn!("Failed to send photo card for {}: {}", product.name, e);
        }
    }
}
