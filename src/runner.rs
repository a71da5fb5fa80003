//! Account runner.
//!
//! Processes accounts one at a time with a mandatory delay between them.
//! Each orchestration runs in its own task, so an error or panic inside one
//! account becomes a `TransientFailure` result and the batch continues.

use crate::classifier::PatternSet;
use crate::orchestrator::CheckinOrchestrator;
use rollcall_core::{
    config::{AccountConfig, PolicyConfig},
    error::CheckinError,
    outcome::{AccountResult, Status},
    traits::TransportFactory,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct AccountRunner {
    policy: PolicyConfig,
    factory: Arc<dyn TransportFactory>,
    cancel: CancellationToken,
}

impl AccountRunner {
    pub fn new(policy: PolicyConfig, factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            policy,
            factory,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts the run; cancelled automatically at the deadline.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every enabled account in order. One result per enabled account.
    pub async fn run_all(&self, accounts: &[AccountConfig]) -> Vec<AccountResult> {
        let run_id = uuid::Uuid::new_v4();
        let deadline_timer = self.policy.deadline().map(|deadline| {
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(deadline).await;
                warn!("run deadline of {}s reached, cancelling", deadline.as_secs());
                cancel.cancel();
            })
        });

        let mut results = Vec::with_capacity(accounts.len());
        let mut ran_any = false;
        for account in accounts {
            if !account.enabled {
                info!(run = %run_id, account = %account.name, "account disabled, skipping");
                continue;
            }
            if ran_any && !self.cancel.is_cancelled() {
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.policy.inter_account_delay()) => {}
                }
            }
            if self.cancel.is_cancelled() {
                results.push(AccountResult::failed(
                    &account.name,
                    Status::TransientFailure,
                    "deadline reached before this account started",
                ));
                continue;
            }

            info!(run = %run_id, account = %account.name, "checking in");
            results.push(self.run_one(account).await);
            ran_any = true;
        }

        if let Some(timer) = deadline_timer {
            timer.abort();
        }
        results
    }

    async fn run_one(&self, account: &AccountConfig) -> AccountResult {
        let factory = self.factory.clone();
        let policy = self.policy.clone();
        let cancel = self.cancel.clone();
        let owned = account.clone();

        let handle = tokio::spawn(async move {
            let patterns = PatternSet::for_account(&owned.patterns)?;
            let transport = factory.open(&owned).await?;
            let result = CheckinOrchestrator::new(&owned, &policy, &patterns, cancel)
                .run(transport)
                .await;
            Ok::<_, CheckinError>(result)
        });

        match handle.await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                error!(account = %account.name, "orchestration failed: {e}");
                AccountResult::failed(&account.name, Status::TransientFailure, e.to_string())
            }
            Err(e) => {
                error!(account = %account.name, "orchestration aborted: {e}");
                AccountResult::failed(
                    &account.name,
                    Status::TransientFailure,
                    format!("orchestration aborted: {e}"),
                )
            }
        }
    }
}
