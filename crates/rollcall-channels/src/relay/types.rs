//! Relay API deserialization types.

use chrono::{DateTime, TimeZone, Utc};
use rollcall_core::message::{Affordance, ReplyMessage};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct RelayResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelayConnect {
    #[serde(default)]
    pub authorized: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelayMessage {
    pub id: serde_json::Value,
    #[serde(default)]
    pub sender_id: serde_json::Value,
    #[serde(default)]
    pub text: String,
    /// Inline keyboard rows.
    #[serde(default)]
    pub buttons: Vec<Vec<RelayButton>>,
    /// Unix timestamp (seconds).
    #[serde(default)]
    pub date: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RelayButton {
    pub text: String,
    #[serde(default)]
    pub data: Option<String>,
}

/// Render a JSON id (numeric or string) as an opaque string.
pub(crate) fn id_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl From<RelayMessage> for ReplyMessage {
    fn from(msg: RelayMessage) -> Self {
        let affordances = msg
            .buttons
            .into_iter()
            .enumerate()
            .flat_map(|(row, buttons)| {
                buttons.into_iter().enumerate().map(move |(col, b)| Affordance {
                    label: b.text,
                    row,
                    col,
                    data: b.data,
                })
            })
            .collect();
        let received_at: DateTime<Utc> = msg
            .date
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .unwrap_or_else(Utc::now);
        ReplyMessage {
            id: id_string(&msg.id),
            sender_id: id_string(&msg.sender_id),
            text: msg.text,
            affordances,
            received_at,
        }
    }
}
