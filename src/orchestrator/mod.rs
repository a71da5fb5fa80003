//! Check-in orchestrator.
//!
//! Drives one account from session acquisition to a final [`AccountResult`]:
//!
//! ```text
//! Start → Authenticated → Issued → Awaiting → Classified → Drilling* → Done
//! ```
//!
//! - A rejected session is fatal (`Unauthorized`, no retry).
//! - Transport errors, NoReply and classified transient failures are retried
//!   with linear backoff up to the attempt budget, then `TransientFailure`.
//! - `AlreadyDone` may trigger a secondary status query whose fields fill in
//!   what the primary reply lacked.
//! - Drill steps are best-effort and only add fields. The primary reply's
//!   status is the final status.

mod state;

#[cfg(test)]
mod tests;

pub use state::CheckinState;

use crate::affordance::AffordanceDriver;
use crate::classifier::{classify, PatternSet};
use crate::conversation::ConversationContext;
use rollcall_core::{
    config::{AccountConfig, DrillStep, PolicyConfig},
    error::CheckinError,
    message::ReplyMessage,
    outcome::{merge_missing, AccountResult, ClassifiedOutcome, Fields, Status},
    traits::MessagingTransport,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Divider bots use between a view's header and its body.
const SECTION_DIVIDER: &str = "━━━";

/// Text after the last divider, or the whole text when there is none.
fn capture_section(text: &str) -> String {
    let section = text
        .rsplit(SECTION_DIVIDER)
        .next()
        .unwrap_or(text)
        .trim_start_matches('━')
        .trim();
    if section.is_empty() {
        text.trim().to_string()
    } else {
        section.to_string()
    }
}

pub struct CheckinOrchestrator<'a> {
    account: &'a AccountConfig,
    policy: &'a PolicyConfig,
    patterns: &'a PatternSet,
    cancel: CancellationToken,
}

impl<'a> CheckinOrchestrator<'a> {
    pub fn new(
        account: &'a AccountConfig,
        policy: &'a PolicyConfig,
        patterns: &'a PatternSet,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            account,
            policy,
            patterns,
            cancel,
        }
    }

    fn enter(&self, state: CheckinState) {
        debug!(account = %self.account.name, state = %state, "checkin state");
    }

    fn fail(&self, status: Status, detail: impl Into<String>) -> AccountResult {
        self.enter(CheckinState::Done);
        AccountResult::failed(&self.account.name, status, detail)
    }

    /// Run one full check-in. Always produces a result and always releases
    /// the session.
    pub async fn run(&self, transport: Arc<dyn MessagingTransport>) -> AccountResult {
        self.enter(CheckinState::Start);
        let ctx = match self.open_session(transport).await {
            Ok(ctx) => ctx,
            Err(done) => return done,
        };
        self.enter(CheckinState::Authenticated);

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                self.fail(Status::TransientFailure, "cancelled: run deadline reached")
            }
            result = self.drive(&ctx) => result,
        };
        ctx.close().await;

        info!(
            account = %self.account.name,
            status = %result.status,
            "checkin finished: {}", result.detail
        );
        result
    }

    /// Connect within the attempt budget. A rejected session is final;
    /// retryable transport errors back off and try again.
    async fn open_session(
        &self,
        transport: Arc<dyn MessagingTransport>,
    ) -> Result<ConversationContext, AccountResult> {
        let budget = self.policy.attempt_budget.max(1);
        for attempt in 1..=budget {
            let opened = ConversationContext::open(
                transport.clone(),
                self.account,
                self.policy,
                self.cancel.clone(),
            )
            .await;
            let e = match opened {
                Ok(ctx) => return Ok(ctx),
                Err(CheckinError::Unauthorized(msg)) => {
                    warn!(account = %self.account.name, "session rejected: {msg}");
                    return Err(self.fail(Status::Unauthorized, msg));
                }
                Err(e) if e.is_retryable() && attempt < budget => e,
                Err(e) if e.is_retryable() => {
                    return Err(self.fail(
                        Status::TransientFailure,
                        format!("gave up after {budget} attempts: {e}"),
                    ));
                }
                Err(e) => return Err(self.fail(Status::TransientFailure, e.to_string())),
            };

            let delay = self.policy.backoff(attempt);
            warn!(
                account = %self.account.name,
                "connect attempt {attempt}/{budget} failed: {e}; retrying in {}s",
                delay.as_secs()
            );
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    let detail = "cancelled: run deadline reached";
                    return Err(self.fail(Status::TransientFailure, detail));
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
        Err(self.fail(Status::TransientFailure, "no connect attempt made"))
    }

    async fn drive(&self, ctx: &ConversationContext) -> AccountResult {
        let (mut outcome, reply) = match self.issue_primary(ctx).await {
            Ok(primary) => primary,
            Err(done) => return done,
        };

        if outcome.status == Status::AlreadyDone {
            self.query_status(ctx, &mut outcome.fields).await;
        }
        if outcome.status.is_ok() && !self.account.drill.is_empty() {
            self.drill(ctx, &reply, &mut outcome.fields).await;
        }

        self.enter(CheckinState::Done);
        AccountResult::new(&self.account.name, outcome)
    }

    /// Send the check-in command until a reply classifies as something other
    /// than a transient failure, or the budget runs out.
    async fn issue_primary(
        &self,
        ctx: &ConversationContext,
    ) -> Result<(ClassifiedOutcome, ReplyMessage), AccountResult> {
        let budget = self.policy.attempt_budget.max(1);
        let mut last_problem = String::new();

        for attempt in 1..=budget {
            match self.turn(ctx, &self.account.command).await {
                Ok(Some(reply)) => {
                    self.enter(CheckinState::Classified);
                    let outcome = classify(&reply.text, self.patterns);
                    debug!(
                        account = %self.account.name,
                        attempt,
                        status = %outcome.status,
                        "primary reply classified"
                    );
                    match outcome.status {
                        Status::TransientFailure | Status::NoReply => {
                            last_problem = outcome.detail;
                        }
                        Status::Ambiguous => {
                            warn!(account = %self.account.name, "{}", outcome.detail);
                            return Ok((outcome, reply));
                        }
                        _ => return Ok((outcome, reply)),
                    }
                }
                Ok(None) => {
                    last_problem = format!(
                        "no reply from {} within {}s",
                        self.account.agent,
                        ctx.settle().as_secs()
                    );
                }
                Err(CheckinError::Unauthorized(msg)) => {
                    return Err(self.fail(Status::Unauthorized, msg));
                }
                Err(e @ CheckinError::Cancelled(_)) => {
                    return Err(self.fail(Status::TransientFailure, e.to_string()));
                }
                Err(e) if e.is_retryable() => last_problem = e.to_string(),
                Err(e) => return Err(self.fail(Status::TransientFailure, e.to_string())),
            }

            if attempt < budget {
                let delay = self.policy.backoff(attempt);
                warn!(
                    account = %self.account.name,
                    "attempt {attempt}/{budget} failed: {last_problem}; retrying in {}s",
                    delay.as_secs()
                );
                if let Err(e) = ctx.pause(delay).await {
                    return Err(self.fail(Status::TransientFailure, e.to_string()));
                }
            }
        }

        Err(self.fail(
            Status::TransientFailure,
            format!("gave up after {budget} attempts: {last_problem}"),
        ))
    }

    async fn turn(
        &self,
        ctx: &ConversationContext,
        command: &str,
    ) -> Result<Option<ReplyMessage>, CheckinError> {
        let baseline = ctx.baseline().await?;
        ctx.send(command).await?;
        self.enter(CheckinState::Issued);
        self.enter(CheckinState::Awaiting);
        ctx.await_reply(&baseline, ctx.settle()).await
    }

    /// Secondary query for totals after an idempotent "already done".
    ///
    /// Skipped when the primary reply already carries a total. Its NoReply
    /// and errors are non-fatal.
    async fn query_status(&self, ctx: &ConversationContext, fields: &mut Fields) {
        let Some(ref command) = self.account.status_command else {
            return;
        };
        if fields.contains_key("total") {
            debug!(account = %self.account.name, "primary reply has a total, skipping {command}");
            return;
        }
        match self.turn(ctx, command).await {
            Ok(Some(reply)) => {
                let extra = classify(&reply.text, self.patterns).fields;
                debug!(account = %self.account.name, "status query yielded {} fields", extra.len());
                merge_missing(fields, extra);
            }
            Ok(None) => info!(account = %self.account.name, "no reply to {command}"),
            Err(e) => warn!(account = %self.account.name, "status query {command} failed: {e}"),
        }
    }

    /// Walk the drill steps over the primary reply's affordances.
    async fn drill(&self, ctx: &ConversationContext, reply: &ReplyMessage, fields: &mut Fields) {
        let driver = AffordanceDriver::new(ctx, self.policy.staleness_retries);
        let mut current = reply.clone();

        for step in &self.account.drill {
            self.enter(CheckinState::Drilling);
            match self.drill_step(ctx, &driver, &current, step).await {
                Ok(Some(view)) => {
                    if let Some(ref field) = step.capture {
                        let marker_seen = step
                            .marker
                            .as_deref()
                            .map_or(true, |m| view.text.contains(m));
                        if marker_seen && !fields.contains_key(field) {
                            fields.insert(field.clone(), capture_section(&view.text));
                        }
                    }
                    merge_missing(fields, classify(&view.text, self.patterns).fields);
                    if !view.affordances.is_empty() {
                        current = view;
                    }
                }
                Ok(None) => {
                    info!(account = %self.account.name, "drill '{}' unavailable", step.label);
                }
                Err(e) => {
                    warn!(account = %self.account.name, "drill '{}' failed: {e}", step.label);
                }
            }
        }
    }

    async fn drill_step(
        &self,
        ctx: &ConversationContext,
        driver: &AffordanceDriver<'_>,
        current: &ReplyMessage,
        step: &DrillStep,
    ) -> Result<Option<ReplyMessage>, CheckinError> {
        let baseline = ctx.baseline().await?;
        if !driver.activate(current, step).await? {
            return Ok(None);
        }
        driver.refresh(current, &baseline).await
    }
}
