//! Builds transports and notifiers from configuration.

use crate::{
    console::ConsoleNotifier, relay::RelayTransport, telegram::TelegramNotifier,
    web::{HttpSession, WebAgent},
    wecom::WecomNotifier,
};
use async_trait::async_trait;
use rollcall_core::{
    config::{AccountConfig, Config, NotifyConfig, TransportKind},
    error::CheckinError,
    traits::{MessagingTransport, Notifier, TransportFactory},
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Opens a fresh transport per account from the loaded config.
pub struct ChannelFactory {
    config: Arc<Config>,
}

impl ChannelFactory {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransportFactory for ChannelFactory {
    async fn open(
        &self,
        account: &AccountConfig,
    ) -> Result<Arc<dyn MessagingTransport>, CheckinError> {
        match account.transport {
            TransportKind::Relay => {
                let relay = self.config.relay.as_ref().ok_or_else(|| {
                    CheckinError::Config(format!(
                        "account '{}' needs a [relay] section",
                        account.name
                    ))
                })?;
                let session = account.session.as_deref().unwrap_or(&account.name);
                debug!("opening relay transport for session '{session}'");
                Ok(Arc::new(RelayTransport::new(relay, session)))
            }
            TransportKind::Web => {
                let target = account.web.clone().ok_or_else(|| {
                    CheckinError::Config(format!(
                        "account '{}' needs an [account.web] table",
                        account.name
                    ))
                })?;
                let session = Arc::new(HttpSession::new(target.clone())?);
                debug!("opening web transport for {}", target.base_url);
                Ok(Arc::new(WebAgent::new(
                    session,
                    target,
                    account.sender_identity(),
                )))
            }
        }
    }
}

/// Enabled notifier backends, in delivery order.
pub fn build_notifiers(config: &NotifyConfig) -> Vec<Box<dyn Notifier>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = Vec::new();

    if config.console.enabled {
        notifiers.push(Box::new(ConsoleNotifier));
    }

    if let Some(ref tg) = config.telegram {
        if tg.enabled && !tg.bot_token.is_empty() && !tg.chat_id.is_empty() {
            notifiers.push(Box::new(TelegramNotifier::new(tg)));
        } else if tg.enabled {
            warn!("telegram notifier enabled but bot_token or chat_id is empty");
        }
    }

    if let Some(ref wecom) = config.wecom {
        if wecom.enabled && !wecom.key.is_empty() {
            notifiers.push(Box::new(WecomNotifier::new(wecom)));
        } else if wecom.enabled {
            warn!("wecom notifier enabled but key is empty");
        }
    }

    notifiers
}
