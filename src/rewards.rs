//! Reward engine: the transactional entry points of the ledger.
//!
//! Each mutating call is one `BEGIN IMMEDIATE` unit of work. Preconditions are
//! read inside that same transaction, so no other writer can change them
//! between the check and the write. Callers authenticate and authorize the
//! acting user before calling in.

use crate::config::{LeaderboardConfig, RewardsConfig};
use crate::db::accounts::{account_exists, credit_points, fetch_account, link_referrer, referrer_of};
use crate::db::catalog::fetch_task;
use crate::db::completions::{completions_for, insert_completion};
use crate::db::referrals::insert_referral;
use crate::db::{Database, now_ms};
use crate::error::{LedgerError, LedgerResult};
use crate::types::{AccountStatus, CompletionOutcome, LeaderboardEntry, ReferralOutcome, UserId};
use std::sync::Arc;
use tracing::{debug, info};

/// Orchestrates awards over the account, catalog, completion and referral stores.
#[derive(Clone)]
pub struct RewardEngine {
    db: Arc<Database>,
    rewards: RewardsConfig,
    leaderboard: LeaderboardConfig,
}

impl RewardEngine {
    pub fn new(db: Arc<Database>, rewards: RewardsConfig, leaderboard: LeaderboardConfig) -> Self {
        Self {
            db,
            rewards,
            leaderboard,
        }
    }

    /// Get the database reference.
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Award a task's points to a user, at most once per (user, task).
    ///
    /// Repeat calls succeed with `already_completed = true` and award nothing.
    pub fn complete_task(
        &self,
        user_id: UserId,
        task_code: &str,
    ) -> LedgerResult<CompletionOutcome> {
        let now = now_ms();

        let outcome = self.db.write_tx(|tx| {
            let task = fetch_task(tx, task_code)?
                .ok_or_else(|| LedgerError::UnknownTask(task_code.to_string()))?;

            if !account_exists(tx, user_id)? {
                return Err(LedgerError::UnknownUser(user_id));
            }

            if !insert_completion(tx, user_id, &task.code, now)? {
                return Ok(CompletionOutcome {
                    already_completed: true,
                    awarded: 0,
                });
            }

            credit_points(tx, user_id, task.points)?;

            Ok(CompletionOutcome {
                already_completed: false,
                awarded: task.points,
            })
        })?;

        if outcome.already_completed {
            debug!(user_id, task_code, "Task already completed, nothing awarded");
        } else {
            info!(user_id, task_code, awarded = outcome.awarded, "Task completed");
        }

        Ok(outcome)
    }

    /// Set a user's referrer once and pay both referral bonuses.
    ///
    /// The referrer link, both credits and the referral record commit together.
    pub fn set_referrer(
        &self,
        user_id: UserId,
        referrer_id: UserId,
    ) -> LedgerResult<ReferralOutcome> {
        if user_id == referrer_id {
            return Err(LedgerError::SelfReferral(user_id));
        }

        let RewardsConfig {
            bonus_to_referrer,
            bonus_to_referred,
        } = self.rewards;
        let now = now_ms();

        self.db.write_tx(|tx| {
            match referrer_of(tx, user_id)? {
                None => return Err(LedgerError::UnknownUser(user_id)),
                Some(Some(_)) => return Err(LedgerError::ReferrerAlreadySet(user_id)),
                Some(None) => {}
            }

            if !account_exists(tx, referrer_id)? {
                return Err(LedgerError::UnknownReferrer(referrer_id));
            }

            // The update is itself conditional on `referrer_id IS NULL`.
            if !link_referrer(tx, user_id, referrer_id)? {
                return Err(LedgerError::ReferrerAlreadySet(user_id));
            }

            credit_points(tx, user_id, bonus_to_referred)?;
            credit_points(tx, referrer_id, bonus_to_referrer)?;
            insert_referral(tx, referrer_id, user_id, bonus_to_referrer, bonus_to_referred, now)?;

            Ok(())
        })?;

        info!(
            user_id,
            referrer_id, bonus_to_referred, bonus_to_referrer, "Referrer set"
        );

        Ok(ReferralOutcome {
            bonus_to_referred,
            bonus_to_referrer,
        })
    }

    /// Leaderboard with the requested limit clamped into the configured range.
    pub fn leaderboard(&self, limit: Option<i64>) -> LedgerResult<Vec<LeaderboardEntry>> {
        self.db.leaderboard(self.leaderboard.clamp(limit))
    }

    /// An account with its completed tasks, most recent first.
    pub fn status(&self, user_id: UserId) -> LedgerResult<AccountStatus> {
        self.db.with_conn(|conn| {
            let account = fetch_account(conn, user_id)?.ok_or(LedgerError::UnknownUser(user_id))?;
            let completions = completions_for(conn, user_id)?;
            Ok(AccountStatus {
                account,
                completions,
            })
        })
    }
}
