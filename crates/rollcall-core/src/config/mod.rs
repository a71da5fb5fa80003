mod accounts;
mod defaults;
mod notify;


pub use accounts::*;
pub use notify::*;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::CheckinError;
use defaults::*;

/// Top-level rollcall configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rollcall: GeneralConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub relay: Option<RelayConfig>,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default, rename = "account")]
    pub accounts: Vec<AccountConfig>,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Directory for log files. Empty disables file logging.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Retry, wait, and pacing policy shared by all accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_attempt_budget")]
    pub attempt_budget: u32,
    /// Linear backoff unit: attempt `n` waits `n * backoff_secs`.
    #[serde(default = "default_backoff_secs")]
    pub backoff_secs: u64,
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    #[serde(default = "default_staleness_retries")]
    pub staleness_retries: u32,
    #[serde(default = "default_inter_account_delay_secs")]
    pub inter_account_delay_secs: u64,
    /// Overall run deadline. 0 disables it.
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            attempt_budget: default_attempt_budget(),
            backoff_secs: default_backoff_secs(),
            settle_secs: default_settle_secs(),
            fetch_limit: default_fetch_limit(),
            staleness_retries: default_staleness_retries(),
            inter_account_delay_secs: default_inter_account_delay_secs(),
            deadline_secs: default_deadline_secs(),
        }
    }
}

impl PolicyConfig {
    /// Wait before attempt `attempt + 1`, given `attempt` already failed.
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.backoff_secs.saturating_mul(u64::from(attempt)))
    }

    pub fn inter_account_delay(&self) -> Duration {
        Duration::from_secs(self.inter_account_delay_secs)
    }

    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_secs > 0).then(|| Duration::from_secs(self.deadline_secs))
    }
}

/// Chat relay endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_relay_timeout_secs")]
    pub timeout_secs: u64,
}

impl Config {
    /// Accounts that take part in this run.
    pub fn enabled_accounts(&self) -> impl Iterator<Item = &AccountConfig> {
        self.accounts.iter().filter(|a| a.enabled)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), CheckinError> {
        if self.policy.attempt_budget == 0 {
            return Err(CheckinError::Config(
                "policy.attempt_budget must be at least 1".into(),
            ));
        }
        if self.accounts.is_empty() {
            return Err(CheckinError::Config("no [[account]] entries configured".into()));
        }

        let mut seen = HashSet::new();
        for account in &self.accounts {
            if account.name.trim().is_empty() {
                return Err(CheckinError::Config("account with empty name".into()));
            }
            if !seen.insert(account.name.as_str()) {
                return Err(CheckinError::Config(format!(
                    "duplicate account name '{}'",
                    account.name
                )));
            }
            if account.agent.trim().is_empty() {
                return Err(CheckinError::Config(format!(
                    "account '{}' has no agent",
                    account.name
                )));
            }
            match account.transport {
                TransportKind::Web if account.web.is_none() => {
                    return Err(CheckinError::Config(format!(
                        "account '{}' uses the web transport but has no [account.web] table",
                        account.name
                    )));
                }
                TransportKind::Relay if self.relay.is_none() => {
                    return Err(CheckinError::Config(format!(
                        "account '{}' uses the relay transport but no [relay] is configured",
                        account.name
                    )));
                }
                _ => {}
            }
            for pattern in &account.patterns {
                Regex::new(pattern.regex()).map_err(|e| {
                    CheckinError::Config(format!(
                        "account '{}' has an invalid pattern '{}': {e}",
                        account.name,
                        pattern.regex()
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Replace `$NAME` / `${NAME}` references with values from `lookup`.
    pub fn resolve_env(
        &mut self,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<(), CheckinError> {
        if let Some(ref mut relay) = self.relay {
            resolve_in_place(&mut relay.api_key, lookup)?;
        }
        if let Some(ref mut tg) = self.notify.telegram {
            resolve_in_place(&mut tg.bot_token, lookup)?;
            resolve_in_place(&mut tg.chat_id, lookup)?;
        }
        if let Some(ref mut wecom) = self.notify.wecom {
            resolve_in_place(&mut wecom.key, lookup)?;
        }
        for account in &mut self.accounts {
            if let Some(ref mut session) = account.session {
                resolve_in_place(session, lookup)?;
            }
            let Some(ref mut web) = account.web else {
                continue;
            };
            match &mut web.auth {
                WebAuth::None => {}
                WebAuth::Bearer { token, headers } => {
                    resolve_in_place(token, lookup)?;
                    for value in headers.values_mut() {
                        resolve_in_place(value, lookup)?;
                    }
                }
                WebAuth::Cookies { cookies, headers } => {
                    for value in cookies.values_mut().chain(headers.values_mut()) {
                        resolve_in_place(value, lookup)?;
                    }
                }
                WebAuth::Form {
                    username, password, ..
                } => {
                    resolve_in_place(username, lookup)?;
                    resolve_in_place(password, lookup)?;
                }
            }
        }
        Ok(())
    }

    /// Fill notifier settings from the conventional TG_*/QYWX_KEY variables
    /// when the config file leaves them out.
    pub fn apply_env_fallbacks(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if self.notify.telegram.is_none() {
            if let (Some(token), Some(chat)) = (lookup("TG_BOT_TOKEN"), lookup("TG_CHAT_ID")) {
                debug!("telegram notifier configured from environment");
                self.notify.telegram = Some(TelegramNotifyConfig {
                    enabled: true,
                    bot_token: token,
                    chat_id: chat,
                });
            }
        }
        if self.notify.wecom.is_none() {
            if let Some(key) = lookup("QYWX_KEY") {
                debug!("wecom notifier configured from environment");
                self.notify.wecom = Some(WecomConfig { enabled: true, key });
            }
        }
    }
}

/// Name of the variable referenced by `$NAME` or `${NAME}`, if `value` is one.
fn env_reference(value: &str) -> Option<&str> {
    let rest = value.trim().strip_prefix('$')?;
    let name = rest
        .strip_prefix('{')
        .and_then(|r| r.strip_suffix('}'))
        .unwrap_or(rest);
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    valid.then_some(name)
}

fn resolve_in_place(
    value: &mut String,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<(), CheckinError> {
    if let Some(name) = env_reference(value) {
        let resolved = lookup(name).ok_or_else(|| {
            CheckinError::Config(format!("environment variable {name} is not set"))
        })?;
        *value = resolved;
    }
    Ok(())
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Parse configuration text, resolving environment references with `lookup`.
pub fn parse(
    content: &str,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Config, CheckinError> {
    let mut config: Config = toml::from_str(content)
        .map_err(|e| CheckinError::Config(format!("failed to parse config: {e}")))?;
    config.resolve_env(lookup)?;
    config.apply_env_fallbacks(lookup);
    config.validate()?;
    Ok(config)
}

/// Load configuration from a TOML file, resolving references from the
/// process environment.
pub fn load(path: &str) -> Result<Config, CheckinError> {
    let path = Path::new(path);
    let content = std::fs::read_to_string(path)
        .map_err(|e| CheckinError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config = parse(&content, &|name| std::env::var(name).ok())?;
    info!(
        "loaded {} account(s) from {}",
        config.accounts.len(),
        path.display()
    );
    Ok(config)
}
