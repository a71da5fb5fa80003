//! Telegram Bot API deserialization types.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct TgResponse {
    pub ok: bool,
    pub description: Option<String>,
}
