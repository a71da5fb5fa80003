use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "default_notify_title")]
    pub title: String,
    #[serde(default)]
    pub telegram: Option<TelegramNotifyConfig>,
    #[serde(default)]
    pub wecom: Option<WecomConfig>,
    #[serde(default)]
    pub console: ConsoleConfig,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            title: default_notify_title(),
            telegram: None,
            wecom: None,
            console: ConsoleConfig::default(),
        }
    }
}

/// Telegram bot used to deliver the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramNotifyConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub chat_id: String,
}

/// WeCom (WeChat Work) group robot webhook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WecomConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}
