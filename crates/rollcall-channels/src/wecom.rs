//! WeCom (WeChat Work) group robot webhook notifier.

use async_trait::async_trait;
use rollcall_core::{config::WecomConfig, error::CheckinError, traits::Notifier};
use serde::Deserialize;
use tracing::info;

const WEBHOOK_URL: &str = "https://qyapi.weixin.qq.com/cgi-bin/webhook/send";

#[derive(Debug, Deserialize)]
struct WecomResponse {
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

/// Notifier posting plain text to a WeCom group robot.
pub struct WecomNotifier {
    key: String,
    client: reqwest::Client,
    endpoint: String,
}

impl WecomNotifier {
    pub fn new(config: &WecomConfig) -> Self {
        Self {
            key: config.key.clone(),
            client: reqwest::Client::new(),
            endpoint: WEBHOOK_URL.to_string(),
        }
    }

    fn payload(title: &str, body: &str) -> serde_json::Value {
        serde_json::json!({
            "msgtype": "text",
            "text": { "content": format!("{title}\n\n{body}") },
        })
    }
}

#[async_trait]
impl Notifier for WecomNotifier {
    fn name(&self) -> &str {
        "wecom"
    }

    async fn notify(&self, title: &str, body: &str) -> Result<(), CheckinError> {
        let resp: WecomResponse = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.key.as_str())])
            .json(&Self::payload(title, body))
            .send()
            .await
            .map_err(|e| CheckinError::Notify(format!("wecom send failed: {e}")))?
            .json()
            .await
            .map_err(|e| CheckinError::Notify(format!("wecom response parse failed: {e}")))?;

        if resp.errcode != 0 {
            return Err(CheckinError::Notify(format!(
                "wecom rejected message ({}): {}",
                resp.errcode, resp.errmsg
            )));
        }
        info!("wecom report delivered");
        Ok(())
    }
}
