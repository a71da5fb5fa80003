use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A reply from the remote agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyMessage {
    /// Opaque message identity, stable across in-place edits.
    pub id: String,
    /// Platform-specific sender identity.
    pub sender_id: String,
    /// Raw message text.
    pub text: String,
    /// Inline affordances offered by this message, in layout order.
    #[serde(default)]
    pub affordances: Vec<Affordance>,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl ReplyMessage {
    pub fn new(
        id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            sender_id: sender_id.into(),
            text: text.into(),
            affordances: Vec::new(),
            received_at: Utc::now(),
        }
    }

    pub fn with_affordances(mut self, affordances: Vec<Affordance>) -> Self {
        self.affordances = affordances;
        self
    }

    /// Whether two snapshots of the same message show the same content.
    ///
    /// Used to detect a refetch that raced the remote edit.
    pub fn same_content(&self, other: &ReplyMessage) -> bool {
        self.text == other.text
            && self.affordances.len() == other.affordances.len()
            && self
                .affordances
                .iter()
                .zip(&other.affordances)
                .all(|(a, b)| a.label == b.label)
    }
}

/// A labeled, activatable sub-view offered by a reply (an inline button).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affordance {
    pub label: String,
    /// Row in the inline keyboard layout.
    pub row: usize,
    /// Column within the row.
    pub col: usize,
    /// Platform callback payload, if the transport exposes one.
    #[serde(default)]
    pub data: Option<String>,
}

impl Affordance {
    pub fn new(label: impl Into<String>, row: usize, col: usize) -> Self {
        Self {
            label: label.into(),
            row,
            col,
            data: None,
        }
    }

    pub fn selector(&self) -> AffordanceSelector {
        AffordanceSelector {
            row: self.row,
            col: self.col,
            data: self.data.clone(),
        }
    }
}

/// What the transport needs to press a specific affordance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffordanceSelector {
    pub row: usize,
    pub col: usize,
    pub data: Option<String>,
}
