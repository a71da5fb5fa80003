//! One account's live conversation with a remote agent.
//!
//! `ConversationContext` owns the transport session for a single
//! orchestration and implements the request/wait/fetch turn on top of it.

use rollcall_core::{
    config::{AccountConfig, PolicyConfig},
    error::CheckinError,
    message::ReplyMessage,
    traits::MessagingTransport,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Message ids already present before a command was sent.
#[derive(Debug, Clone, Default)]
pub struct Baseline {
    seen: HashSet<String>,
}

impl Baseline {
    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }
}

/// Open session plus the identity of the agent being talked to.
///
/// Released with [`ConversationContext::close`]; if dropped without it, the
/// disconnect is spawned on the current runtime.
pub struct ConversationContext {
    transport: Arc<dyn MessagingTransport>,
    account: String,
    agent: String,
    sender: String,
    settle: Duration,
    fetch_limit: usize,
    cancel: CancellationToken,
    closed: bool,
}

impl ConversationContext {
    /// Connect the transport. On failure the session is released before
    /// the error is returned.
    pub async fn open(
        transport: Arc<dyn MessagingTransport>,
        account: &AccountConfig,
        policy: &PolicyConfig,
        cancel: CancellationToken,
    ) -> Result<Self, CheckinError> {
        let mut ctx = Self {
            transport,
            account: account.name.clone(),
            agent: account.agent.clone(),
            sender: account.sender_identity().to_string(),
            settle: account.settle(policy),
            fetch_limit: account.fetch_limit(policy),
            cancel,
            closed: false,
        };
        if let Err(e) = ctx.transport.connect().await {
            ctx.release().await;
            return Err(e);
        }
        debug!(account = %ctx.account, transport = ctx.transport.name(), "session open");
        Ok(ctx)
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }

    pub fn settle(&self) -> Duration {
        self.settle
    }

    pub fn transport(&self) -> &dyn MessagingTransport {
        self.transport.as_ref()
    }

    /// Disconnect. Errors are logged, never returned.
    pub async fn close(mut self) {
        self.release().await;
    }

    async fn release(&mut self) {
        self.closed = true;
        if let Err(e) = self.transport.disconnect().await {
            warn!(account = %self.account, "disconnect failed: {e}");
        }
    }

    /// Ids of the messages currently visible in the conversation.
    pub async fn baseline(&self) -> Result<Baseline, CheckinError> {
        let recent = self
            .transport
            .fetch_recent(&self.agent, self.fetch_limit)
            .await?;
        Ok(Baseline {
            seen: recent.into_iter().map(|m| m.id).collect(),
        })
    }

    /// Transmit one command. Transport errors are surfaced, not retried.
    pub async fn send(&self, command: &str) -> Result<(), CheckinError> {
        debug!(account = %self.account, "sending {command} to {}", self.agent);
        self.transport.send(&self.agent, command).await
    }

    /// Wait the full `timeout`, then return the newest agent message not in
    /// `since`. `Ok(None)` is NoReply.
    pub async fn await_reply(
        &self,
        since: &Baseline,
        timeout: Duration,
    ) -> Result<Option<ReplyMessage>, CheckinError> {
        self.pause(timeout).await?;
        let recent = self
            .transport
            .fetch_recent(&self.agent, self.fetch_limit)
            .await?;
        Ok(recent
            .into_iter()
            .find(|m| m.sender_id == self.sender && !since.contains(&m.id)))
    }

    /// Sleep that gives way to cancellation.
    pub async fn pause(&self, duration: Duration) -> Result<(), CheckinError> {
        tokio::select! {
            _ = self.cancel.cancelled() => {
                Err(CheckinError::Cancelled("interrupted while waiting".into()))
            }
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

impl Drop for ConversationContext {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let transport = self.transport.clone();
        let account = std::mem::take(&mut self.account);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                if let Err(e) = transport.disconnect().await {
                    warn!(account = %account, "disconnect after drop failed: {e}");
                }
            });
        } else {
            warn!(account = %account, "session dropped outside a runtime; not disconnected");
        }
    }
}
