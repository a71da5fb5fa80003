//! Inline affordance driver.
//!
//! Presses a labeled sub-view on a reply and reads back the refreshed
//! content. Agents usually edit the clicked message in place, and a read can
//! race that edit; `refresh` treats an unchanged refetch as stale and waits
//! a bounded number of extra settle windows before falling back.

use crate::conversation::{Baseline, ConversationContext};
use rollcall_core::{
    config::DrillStep,
    error::CheckinError,
    message::{Affordance, ReplyMessage},
};
use tracing::debug;

/// Lowercased alphanumerics only; drops whitespace, punctuation and emoji.
fn normalize(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Pick the affordance a drill step refers to.
///
/// Exact label first, then the configured position, then a normalized
/// substring match.
pub fn find_affordance<'m>(reply: &'m ReplyMessage, step: &DrillStep) -> Option<&'m Affordance> {
    if let Some(a) = reply.affordances.iter().find(|a| a.label == step.label) {
        return Some(a);
    }
    if let Some((row, col)) = step.position() {
        if let Some(a) = reply
            .affordances
            .iter()
            .find(|a| a.row == row && a.col == col)
        {
            return Some(a);
        }
    }
    let wanted = normalize(&step.label);
    if wanted.is_empty() {
        return None;
    }
    reply
        .affordances
        .iter()
        .find(|a| normalize(&a.label).contains(&wanted))
}

pub struct AffordanceDriver<'c> {
    ctx: &'c ConversationContext,
    staleness_retries: u32,
}

impl<'c> AffordanceDriver<'c> {
    pub fn new(ctx: &'c ConversationContext, staleness_retries: u32) -> Self {
        Self {
            ctx,
            staleness_retries,
        }
    }

    /// Press the affordance for `step` on `reply`.
    ///
    /// `Ok(false)` means the feature is unavailable: no matching affordance,
    /// or the transport cannot press it.
    pub async fn activate(
        &self,
        reply: &ReplyMessage,
        step: &DrillStep,
    ) -> Result<bool, CheckinError> {
        let Some(affordance) = find_affordance(reply, step) else {
            debug!(account = %self.ctx.account(), "no affordance matches '{}'", step.label);
            return Ok(false);
        };
        match self
            .ctx
            .transport()
            .activate_affordance(self.ctx.agent(), &reply.id, &affordance.selector())
            .await
        {
            Ok(()) => {
                debug!(
                    account = %self.ctx.account(),
                    "pressed '{}' at ({}, {})", affordance.label, affordance.row, affordance.col
                );
                Ok(true)
            }
            Err(CheckinError::AffordanceUnavailable(reason)) => {
                debug!(account = %self.ctx.account(), "affordance unavailable: {reason}");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Re-read the same message identity.
    pub async fn refetch(
        &self,
        reply: &ReplyMessage,
    ) -> Result<Option<ReplyMessage>, CheckinError> {
        self.ctx
            .transport()
            .fetch_by_id(self.ctx.agent(), &reply.id)
            .await
    }

    /// Settle, then refetch until the content differs from `before`.
    ///
    /// After the staleness retries run out, the newest agent message not in
    /// `baseline` wins (the click posted a new message); failing that the
    /// last refetch is returned as-is.
    pub async fn refresh(
        &self,
        before: &ReplyMessage,
        baseline: &Baseline,
    ) -> Result<Option<ReplyMessage>, CheckinError> {
        let mut last = None;
        for attempt in 0..=self.staleness_retries {
            self.ctx.pause(self.ctx.settle()).await?;
            match self.refetch(before).await? {
                Some(current) if !current.same_content(before) => return Ok(Some(current)),
                current => {
                    debug!(
                        account = %self.ctx.account(),
                        "refetch {} of message {} is stale", attempt + 1, before.id
                    );
                    last = current;
                }
            }
        }

        if let Some(fresh) = self.ctx.await_reply(baseline, std::time::Duration::ZERO).await? {
            if fresh.id != before.id {
                debug!(
                    account = %self.ctx.account(),
                    "using new message {} instead of edit", fresh.id
                );
                return Ok(Some(fresh));
            }
        }
        Ok(last)
    }
}
