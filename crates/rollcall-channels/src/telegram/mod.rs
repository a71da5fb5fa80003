//! Telegram Bot API notifier.
//!
//! Delivers the run report with `sendMessage`.
//! Docs: <https://core.telegram.org/bots/api>

mod send;
pub(crate) mod types;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use rollcall_core::{config::TelegramNotifyConfig, error::CheckinError, traits::Notifier};

/// Telegram message length limit.
const MAX_MESSAGE_LEN: usize = 4096;

/// Notifier posting to one chat through a bot.
pub struct TelegramNotifier {
    chat_id: String,
    client: reqwest::Client,
    base_url: String,
}

impl TelegramNotifier {
    /// Create a new Telegram notifier from config.
    pub fn new(config: &TelegramNotifyConfig) -> Self {
        Self::with_base_url(
            config,
            format!("https://api.telegram.org/bot{}", config.bot_token),
        )
    }

    /// Create a notifier against a custom Bot API root (self-hosted API servers).
    pub fn with_base_url(config: &TelegramNotifyConfig, base_url: String) -> Self {
        Self {
            chat_id: config.chat_id.clone(),
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn notify(&self, title: &str, body: &str) -> Result<(), CheckinError> {
        let text = format!("*{title}*\n\n{body}");
        self.send_text(&text).await
    }
}
