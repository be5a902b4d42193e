//! Core types for the points ledger.

use serde::{Deserialize, Serialize};

/// Account identity.
pub type UserId = i64;

/// A user's identity and point balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub username: String,
    pub points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer_id: Option<UserId>,
    /// Milliseconds since the Unix epoch.
    pub created_at: i64,
}

/// A catalog task that can be completed once per user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub code: String,
    pub title: String,
    pub points: i64,
}

/// A task the user has completed, joined with its catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedTask {
    pub code: String,
    pub title: String,
    pub points: i64,
    pub completed_at: i64,
}

/// A referral relationship together with the bonuses paid for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub id: i64,
    pub referrer_id: UserId,
    pub referred_id: UserId,
    pub bonus_to_referrer: i64,
    pub bonus_to_referred: i64,
    pub created_at: i64,
}

/// Result of completing a task.
///
/// `already_completed = true` is the idempotent outcome of a repeat call and
/// always carries `awarded = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionOutcome {
    pub already_completed: bool,
    pub awarded: i64,
}

/// Bonuses paid by a successful referral assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralOutcome {
    pub bonus_to_referred: i64,
    pub bonus_to_referrer: i64,
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: UserId,
    pub username: String,
    pub points: i64,
    /// 1-based position; ties still get distinct ranks.
    pub rank: u32,
}

/// An account together with its completion history, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountStatus {
    #[serde(rename = "user")]
    pub account: Account,
    #[serde(rename = "completed_tasks")]
    pub completions: Vec<CompletedTask>,
}
