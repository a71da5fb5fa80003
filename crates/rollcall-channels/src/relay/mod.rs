//! Chat relay transport.
//!
//! Talks JSON to a user-client relay that holds the messaging session and
//! exposes `connect`, `send`, `messages`, `click` and `disconnect`. Every
//! response uses the `{ok, result, description}` envelope.

mod client;
pub(crate) mod types;

#[cfg(test)]
mod tests;

use rollcall_core::config::RelayConfig;
use std::time::Duration;

/// Messaging transport backed by a relay session.
pub struct RelayTransport {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    /// Session reference held by the relay for this account.
    session: String,
    timeout: Duration,
}

impl RelayTransport {
    /// Create a relay transport for one account session.
    pub fn new(config: &RelayConfig, session: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            session: session.into(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}
