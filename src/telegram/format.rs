//! Chat message bodies, rendered for Telegram's HTML parse mode.
//!
//! Everything that comes from a scraped page goes through [`escape`].

use html_escape::{encode_double_quoted_attribute, encode_text};
use std::time::Duration;

use crate::config::FormatConfig;
use crate::error::FetchError;
use crate::models::{
    Price, Product, EMOJI_BOOK, EMOJI_CHECK, EMOJI_CROSS, EMOJI_EMPTY, EMOJI_LINK, EMOJI_NEW,
    EMOJI_PRICE, EMOJI_PRICE_CHANGE, EMOJI_ROBOT, EMOJI_SEARCH, EMOJI_SHOP, EMOJI_WARNING,
};
use crate::monitor::ProductChange;
use crate::parsers::Extraction;
use crate::utils::http::FetchedPage;

/// Telegram's limit for photo captions.
pub const MAX_CAPTION_CHARS: usize = 1024;

pub fn escape(text: &str) -> String {
    encode_text(text).to_string()
}

fn link(href: &str, label: &str) -> String {
    format!("<a href=\"{}\">{}</a>", encode_double_quoted_attribute(href), escape(label))
}

fn price_line(price: &Price, currency: &str) -> String {
    format!("{} Price: <code>{}</code> {}", EMOJI_PRICE, escape(&price.0), escape(currency))
}

pub fn products_message(products: &[Product], site_name: &str, format: &FormatConfig) -> String {
    if products.is_empty() {
        return format!("{} No products found.", EMOJI_EMPTY);
    }

    let mut message = format!("{} <b>{}</b> products:\n\n", EMOJI_SHOP, escape(site_name));

    for (i, product) in products.iter().take(format.max_reply_items).enumerate() {
        message.push_str(&format!("{}. <b>{}</b>\n", i + 1, escape(&product.name)));
        message.push_str(&price_line(&product.price, &format.currency));
        message.push('\n');
        if let Some(url) = &product.link_url {
            message.push_str(&format!("{} {}\n", EMOJI_LINK, link(url, "View more")));
        }
        message.push('\n');
    }

    if products.len() > format.max_reply_items {
        message.push_str(&format!(
            "<i>…and {} more</i>",
            products.len() - format.max_reply_items
        ));
    }

    message.trim_end().to_string()
}

/// Escapes `text`, cutting it so the escaped form fits in `max_chars`
/// without splitting an entity.
fn escape_truncated(text: &str, max_chars: usize) -> String {
    let escaped = escape(text);
    if escaped.chars().count() <= max_chars {
        return escaped;
    }

    let mut out = String::new();
    let mut used = 1; // trailing ellipsis
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let piece = escape(c.encode_utf8(&mut buf));
        let len = piece.chars().count();
        if used + len > max_chars {
            break;
        }
        used += len;
        out.push_str(&piece);
    }
    out.push('…');
    out
}

fn caption_with_header(header: Option<&str>, product: &Product, body: &str) -> String {
    let render = |name: &str, link_line: &str| {
        let mut caption = String::new();
        if let Some(header) = header {
            caption.push_str(header);
            caption.push_str("\n\n");
        }
        caption.push_str(&format!("<b>{}</b>\n{}{}", name, body, link_line));
        caption
    };

    let name = escape(&product.name);

    if let Some(url) = &product.link_url {
        let with_link = render(&name, &format!("\n{} {}", EMOJI_LINK, link(url, "View")));
        if with_link.chars().count() <= MAX_CAPTION_CHARS {
            return with_link;
        }
    }

    let without_link = render(&name, "");
    if without_link.chars().count() <= MAX_CAPTION_CHARS {
        return without_link;
    }

    // Shorten the name before the markup goes around it.
    let fixed = render("", "").chars().count();
    if fixed < MAX_CAPTION_CHARS {
        return render(&escape_truncated(&product.name, MAX_CAPTION_CHARS - fixed), "");
    }

    // Header or body alone are over the limit.
    format!("<b>{}</b>", escape_truncated(&product.name, MAX_CAPTION_CHARS - "<b></b>".len()))
}

/// Caption for a product photo card.
pub fn product_caption(product: &Product, format: &FormatConfig) -> String {
    caption_with_header(None, product, &price_line(&product.price, &format.currency))
}

pub fn new_product_message(product: &Product, category: &str, format: &FormatConfig) -> String {
    let header = format!("{} <b>New product</b> in {}", EMOJI_NEW, escape(category));
    caption_with_header(Some(&header), product, &price_line(&product.price, &format.currency))
}

pub fn price_changed_message(
    product: &Product,
    old_price: &Price,
    category: &str,
    format: &FormatConfig,
) -> String {
    let header = format!("{} <b>Price changed</b> in {}", EMOJI_PRICE_CHANGE, escape(category));

    let delta = match (old_price.as_number(), product.price.as_number()) {
        (Some(old), Some(new)) => format!(" ({:+.2})", new - old),
        _ => String::new(),
    };

    let body = format!(
        "{} <s>{}</s> → <code>{}</code> {}{}",
        EMOJI_PRICE,
        escape(&old_price.0),
        escape(&product.price.0),
        escape(&format.currency),
        delta
    );

    caption_with_header(Some(&header), product, &body)
}

pub fn change_message(change: &ProductChange, category: &str, format: &FormatConfig) -> String {
    match change {
        ProductChange::New(product) => new_product_message(product, category, format),
        ProductChange::PriceChanged { product, old_price } => {
            price_changed_message(product, old_price, category, format)
        }
    }
}

pub fn welcome_text() -> String {
    format!(
        "{} <b>Welcome!</b>\n\n\
         This bot finds product listings on web pages.\n\n\
         <b>Usage:</b>\n\
         • send a page URL\n\
         • or use <code>/search &lt;URL&gt;</code>\n\n\
         Pick an option to get started:",
        EMOJI_ROBOT
    )
}

pub fn menu_text() -> String {
    format!(
        "{} <b>Welcome!</b>\n\nThis bot finds product listings on web pages.\n\nPick an option to get started:",
        EMOJI_ROBOT
    )
}

pub fn help_text() -> String {
    format!(
        "{} <b>Help</b>\n\n\
         <b>Commands:</b>\n\
         • <code>/start</code> - show the menu\n\
         • <code>/search &lt;URL&gt;</code> - find products on a page\n\
         • <code>/help</code> - this help\n\
         • <code>/test</code> - check that fetching and parsing work\n\n\
         <b>How it works:</b>\n\
         1. send a page URL\n\
         2. the bot downloads the page\n\
         3. it looks for products and prices\n\
         4. the results are sent back to this chat\n\n\
         <b>Examples:</b>\n\
         • <code>https://shop.example.com</code>\n\
         • <code>/search https://store.example.com</code>",
        EMOJI_BOOK
    )
}

pub fn search_prompt() -> String {
    format!(
        "{} Send the URL of the page you want to search for products:\n\nExample: <code>https://example.com</code>",
        EMOJI_SEARCH
    )
}

pub fn search_usage() -> String {
    format!(
        "{} Please provide a page URL\n\nExample: <code>/search https://example.com</code>",
        EMOJI_WARNING
    )
}

pub fn not_a_url() -> String {
    format!("{} Please send a valid URL", EMOJI_WARNING)
}

pub fn url_error(error: &FetchError) -> String {
    match error {
        FetchError::UnsupportedScheme(_) => format!("{} Please use an HTTP or HTTPS URL", EMOJI_WARNING),
        _ => format!("{} Invalid URL format", EMOJI_WARNING),
    }
}

pub fn searching() -> String {
    format!("{} Searching for products...", EMOJI_SEARCH)
}

pub fn load_failed() -> String {
    format!("{} Could not load the site", EMOJI_CROSS)
}

pub fn test_report(page: &FetchedPage, extraction: &Extraction, elapsed: Duration) -> String {
    let selector = extraction
        .selector
        .as_deref()
        .map(|s| format!("<code>{}</code>", escape(s)))
        .unwrap_or_else(|| "none".to_string());

    format!(
        "{} <b>Test passed</b>\n\n\
         URL: {}\n\
         Status: <code>{}</code>\n\
         Attempts: {}\n\
         HTML size: {} bytes\n\
         Container selector: {}\n\
         Products found: {}\n\
         Time: {:.1}s",
        EMOJI_CHECK,
        escape(page.url.as_str()),
        page.status.as_u16(),
        page.attempts,
        page.html.len(),
        selector,
        extraction.products.len(),
        elapsed.as_secs_f64()
    )
}

pub fn test_failed(url: &str, error: &FetchError) -> String {
    format!(
        "{} <b>Test failed</b>\n\nURL: {}\nError: <code>{}</code>",
        EMOJI_CROSS,
        escape(url),
        escape(&error.to_string())
    )
}
