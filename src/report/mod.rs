//! Result reporter.
//!
//! Aggregates the per-account results, renders the masked notification text,
//! derives the process exit code, and fans the report out to the notifiers.


use futures_util::future::join_all;
use rollcall_core::{
    mask::mask_identifier,
    outcome::{AccountResult, Status},
    traits::Notifier,
};
use std::fmt;
use tracing::{info, warn};

/// Fields holding an account identity; masked like the account name.
const IDENTITY_FIELDS: &[&str] = &["user"];

/// Longest detail shown per account.
const DETAIL_MAX_CHARS: usize = 100;

/// Exit code when every account succeeded or was already done.
pub const EXIT_OK: u8 = 0;
/// Exit code when any account failed non-idempotently.
pub const EXIT_ACCOUNT_FAILED: u8 = 1;
/// Exit code for failures before any account ran.
pub const EXIT_HARD_FAILURE: u8 = 2;

/// Overall verdict for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    AllSucceeded,
    SomeAlreadyDone,
    SomeFailed,
    Empty,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AllSucceeded => "all succeeded",
            Self::SomeAlreadyDone => "some already done",
            Self::SomeFailed => "some failed",
            Self::Empty => "no accounts",
        })
    }
}

/// Counts per outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    counts: [(Status, usize); 6],
    pub total: usize,
    pub verdict: Verdict,
}

impl Summary {
    pub fn count(&self, status: Status) -> usize {
        self.counts
            .iter()
            .find(|(s, _)| *s == status)
            .map_or(0, |(_, n)| *n)
    }

    pub fn failed(&self) -> usize {
        self.counts
            .iter()
            .filter(|(s, _)| !s.is_ok())
            .map(|(_, n)| n)
            .sum()
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} account(s), {}", self.total, self.verdict)?;
        let parts: Vec<String> = self
            .counts
            .iter()
            .filter(|(_, n)| *n > 0)
            .map(|(s, n)| format!("{} {n}", s.as_str()))
            .collect();
        if !parts.is_empty() {
            write!(f, " ({})", parts.join(", "))?;
        }
        Ok(())
    }
}

pub fn summarize(results: &[AccountResult]) -> Summary {
    let counts = Status::ALL.map(|status| {
        let n = results.iter().filter(|r| r.status == status).count();
        (status, n)
    });
    let verdict = if results.is_empty() {
        Verdict::Empty
    } else if results.iter().any(|r| !r.status.is_ok()) {
        Verdict::SomeFailed
    } else if results.iter().any(|r| r.status == Status::AlreadyDone) {
        Verdict::SomeAlreadyDone
    } else {
        Verdict::AllSucceeded
    };
    Summary {
        counts,
        total: results.len(),
        verdict,
    }
}

fn short_detail(detail: &str) -> String {
    let line = detail
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    let mut out: String = line.chars().take(DETAIL_MAX_CHARS).collect();
    if line.chars().count() > DETAIL_MAX_CHARS {
        out.push('…');
    }
    out
}

fn redact(text: &str, account: &str, masked: &str) -> String {
    if account.is_empty() {
        text.to_string()
    } else {
        text.replace(account, masked)
    }
}

/// Notification text. Account names are masked; raw identifiers never leave.
pub fn render(results: &[AccountResult]) -> String {
    let summary = summarize(results);
    let mut out = format!("{summary}\n");
    for result in results {
        let masked = mask_identifier(&result.account);
        out.push('\n');
        out.push_str(&format!(
            "{} {masked}: {}",
            result.status.emoji(),
            result.status
        ));
        let detail = redact(&short_detail(&result.detail), &result.account, &masked);
        if !detail.is_empty() {
            out.push_str(&format!(" - {detail}"));
        }
        for (key, value) in &result.fields {
            if key.ends_with("_unit") {
                continue;
            }
            let unit = result
                .fields
                .get(&format!("{key}_unit"))
                .map(|u| format!(" {u}"))
                .unwrap_or_default();
            let value = if IDENTITY_FIELDS.contains(&key.as_str()) {
                mask_identifier(value.trim())
            } else {
                redact(&short_detail(value), &result.account, &masked)
            };
            out.push_str(&format!("\n    {key}: {value}{unit}"));
        }
    }
    out
}

/// 0 when nothing failed non-idempotently, 1 otherwise.
pub fn exit_code(results: &[AccountResult]) -> u8 {
    if results.iter().all(|r| r.status.is_ok()) {
        EXIT_OK
    } else {
        EXIT_ACCOUNT_FAILED
    }
}

/// Deliver to every notifier concurrently. Returns how many succeeded.
pub async fn notify_all(notifiers: &[Box<dyn Notifier>], title: &str, body: &str) -> usize {
    let outcomes = join_all(notifiers.iter().map(|n| async move {
        let outcome = n.notify(title, body).await;
        (n.name(), outcome)
    }))
    .await;

    let mut delivered = 0;
    for (name, outcome) in outcomes {
        match outcome {
            Ok(()) => {
                info!("report delivered via {name}");
                delivered += 1;
            }
            Err(e) => warn!("notifier {name} failed: {e}"),
        }
    }
    delivered
}
