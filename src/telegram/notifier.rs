use anyhow::{anyhow, Result};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};
use tracing::{info, warn};
use url::Url;

use crate::config::{CategoryConfig, FormatConfig};
use crate::monitor::{Notifier, ProductChange};
use crate::telegram::format;

/// Sends scanner changes to a fixed set of chats.
pub struct TelegramNotifier {
    bot: Bot,
    chat_ids: Vec<ChatId>,
    format: FormatConfig,
}

impl TelegramNotifier {
    pub fn new(bot: Bot, chat_ids: &[i64], format: FormatConfig) -> Self {
        Self {
            bot,
            chat_ids: chat_ids.iter().copied().map(ChatId).collect(),
            format,
        }
    }

    async fn send_to(&self, chat: ChatId, text: &str, image: Option<&Url>) -> Result<(), teloxide::RequestError> {
        if let Some(image) = image {
            let sent = self
                .bot
                .send_photo(chat, InputFile::url(image.clone()))
                .caption(text)
                .parse_mode(ParseMode::Html)
                .await;

            match sent {
                Ok(_) => return Ok(()),
                Err(e) => warn!("Photo notification failed, falling back to text: {}", e),
            }
        }

        self.bot
            .send_message(chat, text)
            .parse_mode(ParseMode::Html)
            .disable_web_page_preview(true)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, change: &ProductChange, category: &CategoryConfig) -> Result<()> {
        if self.chat_ids.is_empty() {
            warn!("No notify_chat_ids configured, dropping notification");
            return Ok(());
        }

        let text = format::change_message(change, &category.name, &self.format);
        let image = change
            .product()
            .image_url
            .as_deref()
            .and_then(|u| Url::parse(u).ok());

        let mut failures = 0;
        for chat in &self.chat_ids {
            if let Err(e) = self.send_to(*chat, &text, image.as_ref()).await {
                warn!(chat = chat.0, "Failed to send notification: {}", e);
                failures += 1;
            }
        }

        if failures == self.chat_ids.len() {
            return Err(anyhow!("notification for {} failed in every chat", change.product().name));
        }

        info!("Sent notification for {}", change.product().name);
        Ok(())
    }
}
