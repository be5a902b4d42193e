//! Integration tests for the ledger core.
//!
//! These tests drive the reward engine and the database layer against an
//! in-memory SQLite database.

use points_ledger::config::{LeaderboardConfig, RewardsConfig};
use points_ledger::db::Database;
use points_ledger::error::LedgerError;
use points_ledger::rewards::RewardEngine;
use points_ledger::types::{CompletionOutcome, ReferralOutcome};
use std::sync::Arc;

/// Helper to create a fresh in-memory database for testing.
fn setup_db() -> Arc<Database> {
    Arc::new(Database::open_in_memory().expect("Failed to create in-memory database"))
}

/// Engine with referral bonuses of 10 to the referred user and 50 to the referrer.
fn setup_engine() -> RewardEngine {
    RewardEngine::new(
        setup_db(),
        RewardsConfig {
            bonus_to_referrer: 50,
            bonus_to_referred: 10,
        },
        LeaderboardConfig::default(),
    )
}

fn points_of(engine: &RewardEngine, user_id: i64) -> i64 {
    engine.db().get_account(user_id).unwrap().unwrap().points
}

mod account_tests {
    use super::*;

    #[test]
    fn create_account_starts_at_zero_without_referrer() {
        let db = setup_db();

        let account = db.create_account("alice").unwrap();

        assert_eq!(account.username, "alice");
        assert_eq!(account.points, 0);
        assert!(account.referrer_id.is_none());
        assert!(account.created_at > 0);
        assert_eq!(db.get_account(account.id).unwrap(), Some(account));
    }

    #[test]
    fn duplicate_username_is_rejected() {
        let db = setup_db();
        db.create_account("alice").unwrap();

        let result = db.create_account("alice");

        assert!(matches!(result, Err(LedgerError::UsernameTaken(name)) if name == "alice"));
    }

    #[test]
    fn blank_username_is_rejected() {
        let db = setup_db();

        let result = db.create_account("   ");

        assert!(matches!(result, Err(LedgerError::InvalidInput { field: "username", .. })));
    }

    #[test]
    fn find_by_username() {
        let db = setup_db();
        let bob = db.create_account("bob").unwrap();

        assert_eq!(db.find_account_by_username("bob").unwrap().map(|a| a.id), Some(bob.id));
        assert!(db.find_account_by_username("nobody").unwrap().is_none());
    }

    #[test]
    fn get_unknown_account_returns_none() {
        let db = setup_db();
        assert!(db.get_account(999).unwrap().is_none());
    }
}

mod catalog_tests {
    use super::*;

    #[test]
    fn upsert_then_get() {
        let db = setup_db();

        db.upsert_task("daily_checkin", "Daily check-in", 5).unwrap();

        let task = db.get_task("daily_checkin").unwrap().unwrap();
        assert_eq!(task.title, "Daily check-in");
        assert_eq!(task.points, 5);
    }

    #[test]
    fn upsert_replaces_title_and_points() {
        let db = setup_db();
        db.upsert_task("quiz", "Quiz", 5).unwrap();

        db.upsert_task("quiz", "Weekly quiz", 20).unwrap();

        let tasks = db.list_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Weekly quiz");
        assert_eq!(tasks[0].points, 20);
    }

    #[test]
    fn negative_points_are_rejected() {
        let db = setup_db();
        let result = db.upsert_task("bad", "Bad", -1);
        assert!(matches!(result, Err(LedgerError::InvalidInput { field: "points", .. })));
    }

    #[test]
    fn list_is_ordered_by_code() {
        let db = setup_db();
        db.upsert_task("zeta", "Z", 1).unwrap();
        db.upsert_task("alpha", "A", 1).unwrap();

        let codes: Vec<String> = db.list_tasks().unwrap().into_iter().map(|t| t.code).collect();
        assert_eq!(codes, vec!["alpha", "zeta"]);
    }
}

mod completion_tests {
    use super::*;

    #[test]
    fn first_completion_awards_then_repeat_is_idempotent() {
        let engine = setup_engine();
        let user = engine.db().create_account("alice").unwrap();
        engine.db().upsert_task("daily_checkin", "Daily check-in", 5).unwrap();

        let first = engine.complete_task(user.id, "daily_checkin").unwrap();
        assert_eq!(
            first,
            CompletionOutcome {
                already_completed: false,
                awarded: 5
            }
        );
        assert_eq!(points_of(&engine, user.id), 5);

        let second = engine.complete_task(user.id, "daily_checkin").unwrap();
        assert_eq!(
            second,
            CompletionOutcome {
                already_completed: true,
                awarded: 0
            }
        );
        assert_eq!(points_of(&engine, user.id), 5);
    }

    #[test]
    fn many_sequential_calls_award_exactly_once() {
        let engine = setup_engine();
        let user = engine.db().create_account("alice").unwrap();
        engine.db().upsert_task("quiz", "Quiz", 7).unwrap();

        let outcomes: Vec<CompletionOutcome> = (0..10)
            .map(|_| engine.complete_task(user.id, "quiz").unwrap())
            .collect();

        assert!(!outcomes[0].already_completed);
        assert!(outcomes[1..].iter().all(|o| o.already_completed && o.awarded == 0));
        assert_eq!(points_of(&engine, user.id), 7);
        assert_eq!(engine.db().completion_count(user.id, "quiz").unwrap(), 1);
    }

    #[test]
    fn different_tasks_each_award_once() {
        let engine = setup_engine();
        let user = engine.db().create_account("alice").unwrap();
        engine.db().upsert_task("a", "A", 5).unwrap();
        engine.db().upsert_task("b", "B", 3).unwrap();

        engine.complete_task(user.id, "a").unwrap();
        engine.complete_task(user.id, "b").unwrap();

        assert_eq!(points_of(&engine, user.id), 8);
    }

    #[test]
    fn same_task_awards_each_user_separately() {
        let engine = setup_engine();
        let alice = engine.db().create_account("alice").unwrap();
        let bob = engine.db().create_account("bob").unwrap();
        engine.db().upsert_task("quiz", "Quiz", 4).unwrap();

        assert!(!engine.complete_task(alice.id, "quiz").unwrap().already_completed);
        assert!(!engine.complete_task(bob.id, "quiz").unwrap().already_completed);

        assert_eq!(points_of(&engine, alice.id), 4);
        assert_eq!(points_of(&engine, bob.id), 4);
    }

    #[test]
    fn unknown_task_fails_without_mutation() {
        let engine = setup_engine();
        let user = engine.db().create_account("alice").unwrap();

        let result = engine.complete_task(user.id, "missing");

        assert!(matches!(result, Err(LedgerError::UnknownTask(code)) if code == "missing"));
        assert_eq!(points_of(&engine, user.id), 0);
        assert_eq!(engine.db().completion_count(user.id, "missing").unwrap(), 0);
    }

    #[test]
    fn unknown_user_fails() {
        let engine = setup_engine();
        engine.db().upsert_task("quiz", "Quiz", 4).unwrap();

        let result = engine.complete_task(42, "quiz");

        assert!(matches!(result, Err(LedgerError::UnknownUser(42))));
        assert_eq!(engine.db().completion_count(42, "quiz").unwrap(), 0);
    }

    #[test]
    fn zero_point_task_still_records_completion() {
        let engine = setup_engine();
        let user = engine.db().create_account("alice").unwrap();
        engine.db().upsert_task("free", "Free", 0).unwrap();

        let outcome = engine.complete_task(user.id, "free").unwrap();

        assert!(!outcome.already_completed);
        assert_eq!(outcome.awarded, 0);
        assert!(engine.complete_task(user.id, "free").unwrap().already_completed);
    }

    #[test]
    fn overflowing_award_fails_and_keeps_store_readable() {
        let engine = setup_engine();
        let user = engine.db().create_account("alice").unwrap();
        engine.db().upsert_task("jackpot", "Jackpot", i64::MAX).unwrap();
        engine.db().upsert_task("extra", "Extra", 10).unwrap();
        engine.complete_task(user.id, "jackpot").unwrap();

        let result = engine.complete_task(user.id, "extra");

        assert!(matches!(result, Err(LedgerError::BalanceOverflow(id)) if id == user.id));
        assert_eq!(points_of(&engine, user.id), i64::MAX);
        assert_eq!(engine.db().completion_count(user.id, "extra").unwrap(), 0);
        assert_eq!(engine.status(user.id).unwrap().completions.len(), 1);
        assert_eq!(engine.leaderboard(None).unwrap()[0].points, i64::MAX);
    }
}

mod referral_tests {
    use super::*;

    #[test]
    fn set_referrer_pays_both_bonuses_and_records_referral() {
        let engine = setup_engine();
        let user = engine.db().create_account("alice").unwrap();
        let referrer = engine.db().create_account("bob").unwrap();

        let outcome = engine.set_referrer(user.id, referrer.id).unwrap();

        assert_eq!(
            outcome,
            ReferralOutcome {
                bonus_to_referred: 10,
                bonus_to_referrer: 50
            }
        );
        assert_eq!(points_of(&engine, user.id), 10);
        assert_eq!(points_of(&engine, referrer.id), 50);

        let account = engine.db().get_account(user.id).unwrap().unwrap();
        assert_eq!(account.referrer_id, Some(referrer.id));

        let referral = engine.db().get_referral_for(user.id).unwrap().unwrap();
        assert_eq!(referral.referrer_id, referrer.id);
        assert_eq!(referral.referred_id, user.id);
        assert_eq!(referral.bonus_to_referrer, 50);
        assert_eq!(referral.bonus_to_referred, 10);
    }

    #[test]
    fn second_assignment_fails_even_with_other_referrer() {
        let engine = setup_engine();
        let user = engine.db().create_account("u1").unwrap();
        let first = engine.db().create_account("u2").unwrap();
        let second = engine.db().create_account("u3").unwrap();
        engine.set_referrer(user.id, first.id).unwrap();

        let result = engine.set_referrer(user.id, second.id);

        assert!(matches!(result, Err(LedgerError::ReferrerAlreadySet(id)) if id == user.id));
        assert_eq!(points_of(&engine, user.id), 10);
        assert_eq!(points_of(&engine, first.id), 50);
        assert_eq!(points_of(&engine, second.id), 0);
        assert_eq!(engine.db().referral_count_for(user.id).unwrap(), 1);
    }

    #[test]
    fn repeating_the_same_assignment_fails() {
        let engine = setup_engine();
        let user = engine.db().create_account("u1").unwrap();
        let referrer = engine.db().create_account("u2").unwrap();
        engine.set_referrer(user.id, referrer.id).unwrap();

        let result = engine.set_referrer(user.id, referrer.id);

        assert!(matches!(result, Err(LedgerError::ReferrerAlreadySet(_))));
        assert_eq!(points_of(&engine, referrer.id), 50);
    }

    #[test]
    fn self_referral_is_rejected_without_point_change() {
        let engine = setup_engine();
        let user = engine.db().create_account("alice").unwrap();

        let result = engine.set_referrer(user.id, user.id);

        assert!(matches!(result, Err(LedgerError::SelfReferral(id)) if id == user.id));
        assert_eq!(points_of(&engine, user.id), 0);
        assert!(engine.db().get_referral_for(user.id).unwrap().is_none());
    }

    #[test]
    fn unknown_user_is_distinct_from_already_set() {
        let engine = setup_engine();
        let referrer = engine.db().create_account("bob").unwrap();

        let result = engine.set_referrer(999, referrer.id);

        assert!(matches!(result, Err(LedgerError::UnknownUser(999))));
        assert_eq!(points_of(&engine, referrer.id), 0);
    }

    #[test]
    fn unknown_referrer_leaves_user_unlinked() {
        let engine = setup_engine();
        let user = engine.db().create_account("alice").unwrap();

        let result = engine.set_referrer(user.id, 999);

        assert!(matches!(result, Err(LedgerError::UnknownReferrer(999))));
        let account = engine.db().get_account(user.id).unwrap().unwrap();
        assert!(account.referrer_id.is_none());
        assert_eq!(account.points, 0);

        // A later valid assignment still works
        let referrer = engine.db().create_account("bob").unwrap();
        assert!(engine.set_referrer(user.id, referrer.id).is_ok());
    }

    #[test]
    fn referrer_can_refer_many_users() {
        let engine = setup_engine();
        let referrer = engine.db().create_account("hub").unwrap();
        let a = engine.db().create_account("a").unwrap();
        let b = engine.db().create_account("b").unwrap();

        engine.set_referrer(a.id, referrer.id).unwrap();
        engine.set_referrer(b.id, referrer.id).unwrap();

        assert_eq!(points_of(&engine, referrer.id), 100);
        let referred: Vec<i64> = engine
            .db()
            .referrals_by(referrer.id)
            .unwrap()
            .into_iter()
            .map(|r| r.referred_id)
            .collect();
        assert_eq!(referred, vec![a.id, b.id]);
    }

    #[test]
    fn configured_bonuses_are_paid() {
        let engine = RewardEngine::new(
            setup_db(),
            RewardsConfig {
                bonus_to_referrer: 7,
                bonus_to_referred: 3,
            },
            LeaderboardConfig::default(),
        );
        let user = engine.db().create_account("a").unwrap();
        let referrer = engine.db().create_account("b").unwrap();

        let outcome = engine.set_referrer(user.id, referrer.id).unwrap();

        assert_eq!(outcome.bonus_to_referred, 3);
        assert_eq!(outcome.bonus_to_referrer, 7);
        assert_eq!(points_of(&engine, user.id), 3);
        assert_eq!(points_of(&engine, referrer.id), 7);
    }
}

mod balance_guard_tests {
    use super::*;

    #[test]
    fn referral_overflow_rolls_back_link_and_both_credits() {
        let engine = setup_engine();
        let user = engine.db().create_account("newcomer").unwrap();
        let referrer = engine.db().create_account("whale").unwrap();
        engine.db().upsert_task("jackpot", "Jackpot", i64::MAX).unwrap();
        engine.complete_task(referrer.id, "jackpot").unwrap();

        let result = engine.set_referrer(user.id, referrer.id);

        assert!(matches!(result, Err(LedgerError::BalanceOverflow(id)) if id == referrer.id));
        assert_eq!(points_of(&engine, user.id), 0);
        assert_eq!(points_of(&engine, referrer.id), i64::MAX);
        assert!(engine.db().get_account(user.id).unwrap().unwrap().referrer_id.is_none());
        assert_eq!(engine.db().referral_count_for(user.id).unwrap(), 0);
    }

    #[test]
    fn negative_bonus_never_lowers_a_balance() {
        let engine = RewardEngine::new(
            setup_db(),
            RewardsConfig {
                bonus_to_referrer: -20,
                bonus_to_referred: 10,
            },
            LeaderboardConfig::default(),
        );
        let user = engine.db().create_account("a").unwrap();
        let referrer = engine.db().create_account("b").unwrap();
        engine.db().upsert_task("quiz", "Quiz", 30).unwrap();
        engine.complete_task(referrer.id, "quiz").unwrap();

        let result = engine.set_referrer(user.id, referrer.id);

        assert!(matches!(
            result,
            Err(LedgerError::InvalidInput { field: "amount", .. })
        ));
        assert_eq!(points_of(&engine, referrer.id), 30);
        assert_eq!(points_of(&engine, user.id), 0);
        assert_eq!(engine.db().referral_count_for(user.id).unwrap(), 0);
    }
}

mod leaderboard_tests {
    use super::*;

    /// Give `user_id` exactly `points` via a dedicated task.
    fn award(engine: &RewardEngine, user_id: i64, points: i64) {
        let code = format!("grant_{}", user_id);
        engine.db().upsert_task(&code, "Grant", points).unwrap();
        engine.complete_task(user_id, &code).unwrap();
    }

    #[test]
    fn ties_are_broken_by_id_with_distinct_ranks() {
        let engine = setup_engine();
        let a = engine.db().create_account("A").unwrap();
        let b = engine.db().create_account("B").unwrap();
        let c = engine.db().create_account("C").unwrap();
        award(&engine, a.id, 100);
        award(&engine, b.id, 100);
        award(&engine, c.id, 90);

        let board = engine.leaderboard(Some(2)).unwrap();

        assert_eq!(board.len(), 2);
        assert_eq!((board[0].id, board[0].points, board[0].rank), (a.id, 100, 1));
        assert_eq!((board[1].id, board[1].points, board[1].rank), (b.id, 100, 2));
        assert_eq!(board[0].username, "A");
    }

    #[test]
    fn ordering_is_total_and_ranks_are_dense() {
        let engine = setup_engine();
        let scores = [30, 50, 30, 0, 80, 50];
        for (i, score) in scores.iter().enumerate() {
            let user = engine.db().create_account(&format!("user{}", i)).unwrap();
            if *score > 0 {
                award(&engine, user.id, *score);
            }
        }

        let board = engine.leaderboard(Some(100)).unwrap();

        assert_eq!(board.len(), scores.len());
        for (i, pair) in board.windows(2).enumerate() {
            assert!(pair[0].points >= pair[1].points);
            if pair[0].points == pair[1].points {
                assert!(pair[0].id < pair[1].id);
            }
            assert_eq!(pair[0].rank as usize, i + 1);
            assert_eq!(pair[1].rank, pair[0].rank + 1);
        }
    }

    #[test]
    fn invalid_limits_fall_back_or_clamp() {
        let engine = setup_engine();
        for i in 0..12 {
            engine.db().create_account(&format!("user{}", i)).unwrap();
        }

        assert_eq!(engine.leaderboard(None).unwrap().len(), 10);
        assert_eq!(engine.leaderboard(Some(0)).unwrap().len(), 10);
        assert_eq!(engine.leaderboard(Some(-3)).unwrap().len(), 10);
        assert_eq!(engine.leaderboard(Some(1000)).unwrap().len(), 12);
        assert_eq!(engine.leaderboard(Some(3)).unwrap().len(), 3);
    }

    #[test]
    fn empty_store_yields_empty_board() {
        let engine = setup_engine();
        assert!(engine.leaderboard(None).unwrap().is_empty());
    }
}

mod status_tests {
    use super::*;

    #[test]
    fn status_lists_completions_most_recent_first() {
        let engine = setup_engine();
        let user = engine.db().create_account("alice").unwrap();
        engine.db().upsert_task("first", "First", 1).unwrap();
        engine.db().upsert_task("second", "Second", 2).unwrap();
        engine.db().upsert_task("third", "Third", 3).unwrap();
        engine.complete_task(user.id, "first").unwrap();
        engine.complete_task(user.id, "second").unwrap();
        engine.complete_task(user.id, "third").unwrap();

        let status = engine.status(user.id).unwrap();

        assert_eq!(status.account.points, 6);
        let codes: Vec<&str> = status.completions.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["third", "second", "first"]);
        assert_eq!(status.completions[0].title, "Third");
        assert_eq!(status.completions[0].points, 3);
    }

    #[test]
    fn status_of_new_user_has_no_completions() {
        let engine = setup_engine();
        let user = engine.db().create_account("alice").unwrap();

        let status = engine.status(user.id).unwrap();

        assert_eq!(status.account.username, "alice");
        assert!(status.completions.is_empty());
    }

    #[test]
    fn status_of_unknown_user_fails() {
        let engine = setup_engine();
        assert!(matches!(engine.status(5), Err(LedgerError::UnknownUser(5))));
    }

    #[test]
    fn status_serializes_with_wire_names() {
        let engine = setup_engine();
        let user = engine.db().create_account("alice").unwrap();

        let value = serde_json::to_value(engine.status(user.id).unwrap()).unwrap();

        assert_eq!(value["user"]["username"], "alice");
        assert!(value["completed_tasks"].as_array().unwrap().is_empty());
        assert!(value["user"].get("referrer_id").is_none());
    }
}
