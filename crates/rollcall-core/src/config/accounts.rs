use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use super::defaults::*;
use super::PolicyConfig;
use crate::outcome::Status;

/// Which transport binding an account uses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Chat bot reached through the user-client relay.
    #[default]
    Relay,
    /// HTTP endpoint reached through a web session.
    Web,
}

/// One account to check in. Immutable for the whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub transport: TransportKind,
    /// Agent handle the commands are sent to (e.g. `@SomeBot`).
    pub agent: String,
    /// Sender identity replies must carry. Defaults to `agent`.
    #[serde(default)]
    pub agent_id: Option<String>,
    #[serde(default = "default_command")]
    pub command: String,
    /// Secondary query issued when the check-in was already done today.
    #[serde(default)]
    pub status_command: Option<String>,
    /// Relay session reference (credential held by the relay).
    #[serde(default)]
    pub session: Option<String>,
    #[serde(default)]
    pub settle_secs: Option<u64>,
    #[serde(default)]
    pub fetch_limit: Option<usize>,
    #[serde(default)]
    pub drill: Vec<DrillStep>,
    #[serde(default)]
    pub patterns: Vec<PatternConfig>,
    #[serde(default)]
    pub web: Option<WebTargetConfig>,
}

impl AccountConfig {
    /// Sender identity expected on the agent's replies.
    pub fn sender_identity(&self) -> &str {
        self.agent_id.as_deref().unwrap_or(&self.agent)
    }

    /// Settle window for this account.
    pub fn settle(&self, policy: &PolicyConfig) -> Duration {
        Duration::from_secs(self.settle_secs.unwrap_or(policy.settle_secs))
    }

    pub fn fetch_limit(&self, policy: &PolicyConfig) -> usize {
        self.fetch_limit.unwrap_or(policy.fetch_limit).max(1)
    }
}

/// One drill-down click on the primary reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrillStep {
    /// Affordance label to activate.
    pub label: String,
    /// Known stable position in the inline layout.
    #[serde(default)]
    pub row: Option<usize>,
    #[serde(default)]
    pub col: Option<usize>,
    /// Text that must appear in the refreshed view before capturing.
    #[serde(default)]
    pub marker: Option<String>,
    /// Field name that receives the captured section.
    #[serde(default)]
    pub capture: Option<String>,
}

impl DrillStep {
    pub fn position(&self) -> Option<(usize, usize)> {
        match (self.row, self.col) {
            (Some(r), Some(c)) => Some((r, c)),
            (Some(r), None) => Some((r, 0)),
            _ => None,
        }
    }
}

/// Extra classifier rule for a single account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatternConfig {
    Status {
        status: Status,
        regex: String,
    },
    Field {
        field: String,
        regex: String,
        /// Keep the capture as text instead of parsing a number.
        #[serde(default)]
        text: bool,
    },
}

impl PatternConfig {
    pub fn regex(&self) -> &str {
        match self {
            Self::Status { regex, .. } | Self::Field { regex, .. } => regex,
        }
    }
}

/// Web endpoint target for `transport = "web"` accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebTargetConfig {
    pub base_url: String,
    #[serde(default)]
    pub auth: WebAuth,
    /// Page fetched to validate the session before checking in.
    #[serde(default)]
    pub probe_url: Option<String>,
    /// URL fragments that mean "bounced to a login page".
    #[serde(default = "default_login_markers")]
    pub login_markers: Vec<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Command text → HTTP route.
    #[serde(default)]
    pub routes: HashMap<String, WebRoute>,
    #[serde(default)]
    pub logout_url: Option<String>,
}

/// How a web session authenticates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WebAuth {
    #[default]
    None,
    Bearer {
        token: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    Cookies {
        cookies: HashMap<String, String>,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    Form {
        login_url: String,
        username: String,
        password: String,
        #[serde(default = "default_username_field")]
        username_field: String,
        #[serde(default = "default_password_field")]
        password_field: String,
        /// Login succeeded when the final URL contains this.
        #[serde(default)]
        success_url_contains: Option<String>,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

/// HTTP request issued for one command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebRoute {
    #[serde(default)]
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub form: HashMap<String, String>,
    /// Fetch the page first and submit its CSRF token.
    #[serde(default)]
    pub csrf: bool,
}
