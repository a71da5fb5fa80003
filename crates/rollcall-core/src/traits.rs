use crate::{
    config::AccountConfig,
    error::CheckinError,
    message::{AffordanceSelector, ReplyMessage},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Messaging transport: the capability set the orchestrator drives.
///
/// Chat relays implement it natively; HTTP endpoints are adapted to it so the
/// check-in state machine never knows which kind of agent it talks to.
#[async_trait]
pub trait MessagingTransport: Send + Sync {
    /// Human-readable transport name.
    fn name(&self) -> &str;

    /// Open and validate the session. `Unauthorized` means the credential is dead.
    async fn connect(&self) -> Result<(), CheckinError>;

    /// Send one command to the agent. Not retried at this layer.
    async fn send(&self, agent: &str, text: &str) -> Result<(), CheckinError>;

    /// Most recent messages in the conversation with `agent`, newest first.
    async fn fetch_recent(&self, agent: &str, limit: usize)
        -> Result<Vec<ReplyMessage>, CheckinError>;

    /// Re-read a single message by identity. `None` if it no longer exists.
    async fn fetch_by_id(
        &self,
        agent: &str,
        message_id: &str,
    ) -> Result<Option<ReplyMessage>, CheckinError>;

    /// Press an inline affordance on a message.
    async fn activate_affordance(
        &self,
        agent: &str,
        message_id: &str,
        selector: &AffordanceSelector,
    ) -> Result<(), CheckinError> {
        let _ = (agent, selector);
        Err(CheckinError::AffordanceUnavailable(format!(
            "{} cannot activate affordances (message {message_id})",
            self.name()
        )))
    }

    /// Release the session. Called on every exit path.
    async fn disconnect(&self) -> Result<(), CheckinError>;
}

/// Builds a fresh transport for one account.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn open(&self, account: &AccountConfig)
        -> Result<Arc<dyn MessagingTransport>, CheckinError>;
}

/// HTTP response as seen by the web binding.
#[derive(Debug, Clone)]
pub struct WebResponse {
    pub status: u16,
    /// Final URL after redirects.
    pub url: String,
    pub body: String,
}

impl WebResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Authenticated web session, the alternate transport for non-chat agents.
#[async_trait]
pub trait WebSession: Send + Sync {
    /// Establish or validate the session.
    async fn authenticate(&self) -> Result<(), CheckinError>;

    async fn get(&self, url: &str) -> Result<WebResponse, CheckinError>;

    async fn post(
        &self,
        url: &str,
        form: &HashMap<String, String>,
    ) -> Result<WebResponse, CheckinError>;
}

/// Notification backend.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn notify(&self, title: &str, body: &str) -> Result<(), CheckinError>;
}
