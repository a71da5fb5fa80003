//! Response classifier.
//!
//! `classify` is a pure, total function from reply text to a
//! [`ClassifiedOutcome`]. Status is decided by the first matching status
//! group in precedence order; field rules run independently and are merged
//! into the field map, so a reply can be `Success` and still yield `gained`.

mod numbers;
mod rules;


pub use numbers::{parse_amount, Amount};
pub use rules::FieldKind;

use regex::Regex;
use rollcall_core::{
    config::PatternConfig,
    error::CheckinError,
    outcome::{ClassifiedOutcome, Fields, Status},
};
use std::sync::LazyLock;
use tracing::warn;

/// Longest detail kept from a reply's first line.
const DETAIL_MAX_CHARS: usize = 100;

/// Status groups, highest precedence first.
const PRECEDENCE: [Status; 6] = [
    Status::AlreadyDone,
    Status::Success,
    Status::Unauthorized,
    Status::TransientFailure,
    Status::NoReply,
    Status::Ambiguous,
];

#[derive(Debug, Clone)]
struct StatusRule {
    status: Status,
    regex: Regex,
}

#[derive(Debug, Clone)]
struct FieldRule {
    field: String,
    kind: FieldKind,
    regex: Regex,
}

/// Ordered classifier rules.
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    status: Vec<StatusRule>,
    fields: Vec<FieldRule>,
}

static SUCCESS_NEGATION: LazyLock<Option<Regex>> =
    LazyLock::new(|| match Regex::new(rules::SUCCESS_NEGATION) {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!("success negation rule does not compile: {e}");
            None
        }
    });

static DEFAULTS: LazyLock<PatternSet> = LazyLock::new(|| {
    let status = rules::STATUS_RULES
        .iter()
        .filter_map(|(status, pattern)| match Regex::new(pattern) {
            Ok(regex) => Some(StatusRule {
                status: *status,
                regex,
            }),
            Err(e) => {
                warn!("default status rule for {status} does not compile: {e}");
                None
            }
        })
        .collect();
    let fields = rules::field_rules()
        .into_iter()
        .filter_map(|(field, kind, pattern)| match Regex::new(&pattern) {
            Ok(regex) => Some(FieldRule {
                field: field.to_string(),
                kind,
                regex,
            }),
            Err(e) => {
                warn!("default field rule for {field} does not compile: {e}");
                None
            }
        })
        .collect();
    PatternSet { status, fields }
});

impl PatternSet {
    /// The built-in vocabulary.
    pub fn defaults() -> Self {
        DEFAULTS.clone()
    }

    /// Account rules first, then the defaults.
    pub fn for_account(extra: &[PatternConfig]) -> Result<Self, CheckinError> {
        let mut set = Self::default();
        for pattern in extra {
            let regex = Regex::new(pattern.regex()).map_err(|e| {
                CheckinError::Config(format!("invalid pattern '{}': {e}", pattern.regex()))
            })?;
            match pattern {
                PatternConfig::Status { status, .. } => set.status.push(StatusRule {
                    status: *status,
                    regex,
                }),
                PatternConfig::Field { field, text, .. } => set.fields.push(FieldRule {
                    field: field.clone(),
                    kind: if *text {
                        FieldKind::Text
                    } else {
                        FieldKind::Number
                    },
                    regex,
                }),
            }
        }
        let defaults = Self::defaults();
        set.status.extend(defaults.status);
        set.fields.extend(defaults.fields);
        Ok(set)
    }

    pub fn status_rule_count(&self) -> usize {
        self.status.len()
    }

    pub fn field_rule_count(&self) -> usize {
        self.fields.len()
    }

    fn status_of(&self, text: &str) -> Option<Status> {
        let negated = SUCCESS_NEGATION
            .as_ref()
            .is_some_and(|re| re.is_match(text));
        PRECEDENCE.into_iter().find(|status| {
            if *status == Status::Success && negated {
                return false;
            }
            self.status
                .iter()
                .any(|rule| rule.status == *status && rule.regex.is_match(text))
        })
    }

    fn extract_fields(&self, text: &str) -> Fields {
        let mut fields = Fields::new();
        for rule in &self.fields {
            if fields.contains_key(&rule.field) {
                continue;
            }
            let Some(caps) = rule.regex.captures(text) else {
                continue;
            };
            let Some(raw) = caps
                .name("value")
                .or_else(|| caps.get(1))
                .or_else(|| caps.get(0))
            else {
                continue;
            };
            match rule.kind {
                FieldKind::Text => {
                    let value = raw.as_str().trim();
                    if !value.is_empty() {
                        fields.insert(rule.field.clone(), value.to_string());
                    }
                }
                FieldKind::Number => {
                    let unit = caps.name("unit").map(|m| m.as_str());
                    if let Some(amount) = parse_amount(raw.as_str(), unit) {
                        if let Some(unit) = amount.unit {
                            fields.insert(format!("{}_unit", rule.field), unit);
                        }
                        fields.insert(rule.field.clone(), amount.value);
                    }
                }
            }
        }
        fields
    }
}

/// Classify one reply text. Never fails; unmatched text is `Ambiguous`.
pub fn classify(text: &str, patterns: &PatternSet) -> ClassifiedOutcome {
    let mut outcome = match patterns.status_of(text) {
        Some(status) => ClassifiedOutcome::new(status, summary_line(text)),
        None => ClassifiedOutcome::new(
            Status::Ambiguous,
            format!("unrecognized reply: {}", text.trim()),
        ),
    };
    outcome.fields = patterns.extract_fields(text);
    outcome
}

/// First non-empty line, capped for display.
pub fn summary_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .chars()
        .take(DETAIL_MAX_CHARS)
        .collect()
}
