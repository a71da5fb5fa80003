//! Message sending with Markdown first and a plain-text fallback.

use super::types::TgResponse;
use super::{TelegramNotifier, MAX_MESSAGE_LEN};
use crate::utils::split_message;
use rollcall_core::error::CheckinError;
use tracing::{info, warn};

impl TelegramNotifier {
    /// Send a text message to the configured chat.
    pub(crate) async fn send_text(&self, text: &str) -> Result<(), CheckinError> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            let body = serde_json::json!({
                "chat_id": self.chat_id,
                "text": chunk,
                "parse_mode": "Markdown",
                "disable_web_page_preview": true,
            });

            let resp = self
                .client
                .post(format!("{}/sendMessage", self.base_url))
                .json(&body)
                .send()
                .await
                .map_err(|e| CheckinError::Notify(format!("telegram send failed: {e}")))?;

            let status = resp.status();
            if status.is_success() {
                continue;
            }

            let error_text = resp.text().await.unwrap_or_default();
            if !error_text.contains("can't parse entities") {
                return Err(CheckinError::Notify(format!(
                    "telegram send failed ({status}): {error_text}"
                )));
            }

            // Account names and reply text may contain stray Markdown characters.
            warn!("Markdown parse failed, retrying as plain text: {error_text}");
            let plain_body = serde_json::json!({
                "chat_id": self.chat_id,
                "text": chunk,
                "disable_web_page_preview": true,
            });
            let plain: TgResponse = self
                .client
                .post(format!("{}/sendMessage", self.base_url))
                .json(&plain_body)
                .send()
                .await
                .map_err(|e| CheckinError::Notify(format!("telegram send (plain) failed: {e}")))?
                .json()
                .await
                .map_err(|e| {
                    CheckinError::Notify(format!("telegram send (plain) parse failed: {e}"))
                })?;
            if !plain.ok {
                return Err(CheckinError::Notify(format!(
                    "telegram send (plain fallback) failed: {}",
                    plain.description.unwrap_or_default()
                )));
            }
        }

        info!("telegram report delivered");
        Ok(())
    }
}
