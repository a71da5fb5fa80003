//! `MessagingTransport` adapter over a `WebSession`.

use super::render::{extract_csrf_token, render_body};
use crate::utils::join_url;
use async_trait::async_trait;
use rollcall_core::{
    config::{HttpMethod, WebTargetConfig},
    error::CheckinError,
    message::ReplyMessage,
    traits::{MessagingTransport, WebSession},
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Synthetic replies kept per session.
const MAX_BUFFERED: usize = 32;

/// Presents an HTTP endpoint as a conversational agent.
///
/// Each command maps to a configured route; the response body is rendered
/// into a synthetic reply from `sender_id` and buffered so the orchestrator
/// reads it back the same way it reads chat history.
pub struct WebAgent {
    session: Arc<dyn WebSession>,
    target: WebTargetConfig,
    sender_id: String,
    replies: Mutex<VecDeque<ReplyMessage>>,
}

impl WebAgent {
    pub fn new(
        session: Arc<dyn WebSession>,
        target: WebTargetConfig,
        sender_id: impl Into<String>,
    ) -> Self {
        Self {
            session,
            target,
            sender_id: sender_id.into(),
            replies: Mutex::new(VecDeque::new()),
        }
    }

    fn push_reply(&self, text: String) {
        let reply = ReplyMessage::new(uuid::Uuid::new_v4().to_string(), &self.sender_id, text);
        // A poisoned buffer only loses synthetic history.
        let mut replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        replies.push_front(reply);
        replies.truncate(MAX_BUFFERED);
    }
}

#[async_trait]
impl MessagingTransport for WebAgent {
    fn name(&self) -> &str {
        "web"
    }

    async fn connect(&self) -> Result<(), CheckinError> {
        self.session.authenticate().await?;
        info!("web session for {} authenticated", self.target.base_url);
        Ok(())
    }

    async fn send(&self, agent: &str, text: &str) -> Result<(), CheckinError> {
        let command = text.trim();
        let route = self.target.routes.get(command).ok_or_else(|| {
            CheckinError::Config(format!("no web route for command '{command}' on {agent}"))
        })?;
        let url = join_url(&self.target.base_url, &route.path);

        let mut form = route.form.clone();
        if route.csrf {
            let page = self.session.get(&url).await?;
            match extract_csrf_token(&page.body) {
                Some(token) => {
                    form.insert("_token".to_string(), token.clone());
                    form.insert("csrf_token".to_string(), token);
                }
                None => warn!("no csrf token found on {url}"),
            }
        }

        let resp = match route.method {
            HttpMethod::Get => self.session.get(&url).await?,
            HttpMethod::Post => self.session.post(&url, &form).await?,
        };
        debug!("web {command} -> {url}: HTTP {}", resp.status);

        let reply = match resp.status {
            401 | 403 => format!("unauthorized (HTTP {})", resp.status),
            429 => {
                return Err(CheckinError::Transport(format!(
                    "{url} rate limited (HTTP 429)"
                )))
            }
            s if s >= 500 => {
                return Err(CheckinError::Transport(format!("{url} returned HTTP {s}")))
            }
            s if !resp.is_success() => format!("HTTP {s}: {}", render_body(&resp.body)),
            _ => render_body(&resp.body),
        };
        self.push_reply(reply);
        Ok(())
    }

    async fn fetch_recent(
        &self,
        _agent: &str,
        limit: usize,
    ) -> Result<Vec<ReplyMessage>, CheckinError> {
        let replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        Ok(replies.iter().take(limit).cloned().collect())
    }

    async fn fetch_by_id(
        &self,
        _agent: &str,
        message_id: &str,
    ) -> Result<Option<ReplyMessage>, CheckinError> {
        let replies = self.replies.lock().unwrap_or_else(|e| e.into_inner());
        Ok(replies.iter().find(|m| m.id == message_id).cloned())
    }

    async fn disconnect(&self) -> Result<(), CheckinError> {
        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        if let Some(ref logout) = self.target.logout_url {
            let url = join_url(&self.target.base_url, logout);
            self.session.get(&url).await?;
            debug!("web session logged out via {url}");
        }
        Ok(())
    }
}
