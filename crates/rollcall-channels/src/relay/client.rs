//! `MessagingTransport` implementation over the relay HTTP API.

use super::types::{RelayConnect, RelayMessage, RelayResponse};
use super::RelayTransport;
use async_trait::async_trait;
use rollcall_core::{
    error::CheckinError,
    message::{AffordanceSelector, ReplyMessage},
    traits::MessagingTransport,
};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

impl RelayTransport {
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, format!("{}{path}", self.base_url))
            .timeout(self.timeout);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        builder
    }

    /// Execute a relay call and unwrap the `{ok, result}` envelope.
    async fn call<T: DeserializeOwned>(
        &self,
        what: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<Option<T>, CheckinError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| CheckinError::Transport(format!("relay {what} failed: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(CheckinError::Unauthorized(format!(
                "relay rejected {what} ({status})"
            )));
        }

        let body: RelayResponse<T> = resp
            .json()
            .await
            .map_err(|e| CheckinError::Transport(format!("relay {what} parse failed: {e}")))?;

        if !body.ok {
            return Err(CheckinError::Transport(format!(
                "relay {what} error: {}",
                body.description.unwrap_or_default()
            )));
        }
        Ok(body.result)
    }
}

#[async_trait]
impl MessagingTransport for RelayTransport {
    fn name(&self) -> &str {
        "relay"
    }

    async fn connect(&self) -> Result<(), CheckinError> {
        let body = serde_json::json!({ "session": self.session });
        let result: Option<RelayConnect> = self
            .call("connect", self.request(reqwest::Method::POST, "/connect").json(&body))
            .await?;

        match result {
            Some(RelayConnect { authorized: true }) => {
                info!("relay session '{}' connected", self.session);
                Ok(())
            }
            _ => Err(CheckinError::Unauthorized(format!(
                "relay session '{}' is not authorized, log in again",
                self.session
            ))),
        }
    }

    async fn send(&self, agent: &str, text: &str) -> Result<(), CheckinError> {
        let body = serde_json::json!({
            "session": self.session,
            "peer": agent,
            "text": text,
        });
        let _: Option<serde_json::Value> = self
            .call("send", self.request(reqwest::Method::POST, "/send").json(&body))
            .await?;
        debug!("relay sent '{text}' to {agent}");
        Ok(())
    }

    async fn fetch_recent(
        &self,
        agent: &str,
        limit: usize,
    ) -> Result<Vec<ReplyMessage>, CheckinError> {
        let limit = limit.to_string();
        let query = [
            ("session", self.session.as_str()),
            ("peer", agent),
            ("limit", limit.as_str()),
        ];
        let messages: Option<Vec<RelayMessage>> = self
            .call(
                "messages",
                self.request(reqwest::Method::GET, "/messages").query(&query),
            )
            .await?;
        Ok(messages
            .unwrap_or_default()
            .into_iter()
            .map(ReplyMessage::from)
            .collect())
    }

    async fn fetch_by_id(
        &self,
        agent: &str,
        message_id: &str,
    ) -> Result<Option<ReplyMessage>, CheckinError> {
        let query = [("session", self.session.as_str()), ("peer", agent)];
        let message: Option<RelayMessage> = self
            .call(
                "message",
                self.request(reqwest::Method::GET, &format!("/messages/{message_id}"))
                    .query(&query),
            )
            .await?;
        Ok(message.map(ReplyMessage::from))
    }

    async fn activate_affordance(
        &self,
        agent: &str,
        message_id: &str,
        selector: &AffordanceSelector,
    ) -> Result<(), CheckinError> {
        let body = serde_json::json!({
            "session": self.session,
            "peer": agent,
            "message_id": message_id,
            "row": selector.row,
            "col": selector.col,
            "data": selector.data,
        });
        let _: Option<serde_json::Value> = self
            .call("click", self.request(reqwest::Method::POST, "/click").json(&body))
            .await?;
        debug!(
            "relay clicked ({}, {}) on message {message_id}",
            selector.row, selector.col
        );
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), CheckinError> {
        let body = serde_json::json!({ "session": self.session });
        let _: Option<serde_json::Value> = self
            .call(
                "disconnect",
                self.request(reqwest::Method::POST, "/disconnect").json(&body),
            )
            .await?;
        info!("relay session '{}' disconnected", self.session);
        Ok(())
    }
}
