//! Classified outcomes and per-account results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Extracted reply fields. Absence of a key means "not found".
pub type Fields = BTreeMap<String, String>;

/// Closed set of check-in statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Success,
    AlreadyDone,
    Unauthorized,
    NoReply,
    Ambiguous,
    TransientFailure,
}

impl Status {
    pub const ALL: [Status; 6] = [
        Self::Success,
        Self::AlreadyDone,
        Self::Unauthorized,
        Self::NoReply,
        Self::Ambiguous,
        Self::TransientFailure,
    ];

    /// Success or an idempotent "already done today".
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Success | Self::AlreadyDone)
    }

    /// Whether a classified reply with this status is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NoReply | Self::TransientFailure)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::AlreadyDone => "already_done",
            Self::Unauthorized => "unauthorized",
            Self::NoReply => "no_reply",
            Self::Ambiguous => "ambiguous",
            Self::TransientFailure => "transient_failure",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Success => "✅",
            Self::AlreadyDone => "ℹ️",
            Self::Unauthorized => "🔒",
            Self::NoReply => "⌛",
            Self::Ambiguous => "❓",
            Self::TransientFailure => "❌",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one reply text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedOutcome {
    pub status: Status,
    pub fields: Fields,
    /// Short human-readable explanation; holds the raw text when ambiguous.
    pub detail: String,
}

impl ClassifiedOutcome {
    pub fn new(status: Status, detail: impl Into<String>) -> Self {
        Self {
            status,
            fields: Fields::new(),
            detail: detail.into(),
        }
    }
}

/// Final result for one account in one run. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResult {
    pub account: String,
    pub status: Status,
    pub fields: Fields,
    pub detail: String,
    pub finished_at: DateTime<Utc>,
}

impl AccountResult {
    pub fn new(account: impl Into<String>, outcome: ClassifiedOutcome) -> Self {
        Self {
            account: account.into(),
            status: outcome.status,
            fields: outcome.fields,
            detail: outcome.detail,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(account: impl Into<String>, status: Status, detail: impl Into<String>) -> Self {
        Self::new(account, ClassifiedOutcome::new(status, detail))
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Merge `extra` into `base` without overwriting keys `base` already has.
pub fn merge_missing(base: &mut Fields, extra: Fields) {
    for (key, value) in extra {
        base.entry(key).or_insert(value);
    }
}
