use cc_api::gamification::{GamificationError, ProgressStore, ProgressTx};
use cc_gamify::Clock;
use chrono::Duration;

use crate::common::{TestHarness, quiz};

fn names<'a>(badges: impl IntoIterator<Item = &'a cc_db::models::Badge>) -> Vec<&'a str> {
    badges.into_iter().map(|badge| badge.name.as_str()).collect()
}

#[tokio::test]
async fn test_new_user_reaching_level_five_earns_level_badge() {
    let harness = TestHarness::new();
    harness.new_user(1).await;

    let outcome = harness.engine.award_points(1, 2500).await.unwrap();

    assert_eq!(outcome.points_awarded, 2500);
    assert_eq!(outcome.new_xp, 2500);
    assert_eq!(outcome.new_level, 5);
    assert!(outcome.leveled_up);
    assert_eq!(names(&outcome.new_badges), vec!["Level 5"]);

    let progress = harness.engine.get_progress(1).await.unwrap();
    assert_eq!(progress.xp, 2500);
    assert_eq!(progress.level, 5);
    assert_eq!(progress.badge_count, 1);
}

#[tokio::test]
async fn test_award_without_level_up_grants_nothing() {
    let harness = TestHarness::new();
    harness.new_user(1).await;

    let outcome = harness.engine.award_points(1, 150).await.unwrap();

    assert_eq!(outcome.new_xp, 150);
    assert_eq!(outcome.new_level, 1);
    assert!(!outcome.leveled_up);
    assert!(outcome.new_badges.is_empty());
}

#[tokio::test]
async fn test_jumping_levels_grants_every_passed_badge_in_order() {
    let harness = TestHarness::new();
    harness.new_user(1).await;

    harness.engine.award_points(1, 150).await.unwrap();
    let outcome = harness.engine.award_points(1, 9850).await.unwrap();

    assert_eq!(outcome.new_xp, 10_000);
    assert_eq!(outcome.new_level, 10);
    assert!(outcome.leveled_up);
    assert_eq!(names(&outcome.new_badges), vec!["Level 5", "Level 10"]);
}

#[tokio::test]
async fn test_level_badge_is_not_granted_twice() {
    let harness = TestHarness::new();
    harness.new_user(1).await;

    harness.engine.award_points(1, 2500).await.unwrap();
    // 3600 XP is level 6: a level up, but Level 5 is already held
    let outcome = harness.engine.award_points(1, 1100).await.unwrap();

    assert_eq!(outcome.new_level, 6);
    assert!(outcome.leveled_up);
    assert!(outcome.new_badges.is_empty());
    assert_eq!(harness.engine.get_progress(1).await.unwrap().badge_count, 1);
}

#[tokio::test]
async fn test_non_positive_points_are_rejected_without_side_effects() {
    let harness = TestHarness::new();
    harness.new_user(1).await;

    for points in [0, -5] {
        let err = harness.engine.award_points(1, points).await.unwrap_err();
        assert!(matches!(err, GamificationError::InvalidPoints(p) if p == points));
    }

    let progress = harness.engine.get_progress(1).await.unwrap();
    assert_eq!(progress.xp, 0);
    assert_eq!(progress.level, 1);
}

#[tokio::test]
async fn test_missing_progress_is_not_found() {
    let harness = TestHarness::new();

    assert!(matches!(
        harness.engine.award_points(99, 10).await,
        Err(GamificationError::ProgressNotFound(99))
    ));
    assert!(matches!(
        harness.engine.update_streak(99).await,
        Err(GamificationError::ProgressNotFound(99))
    ));
    assert!(matches!(
        harness.engine.get_progress(99).await,
        Err(GamificationError::ProgressNotFound(99))
    ));
    assert!(matches!(
        harness.engine.on_login(99).await,
        Err(GamificationError::ProgressNotFound(99))
    ));

    // Never auto-created
    let progress = harness.store.load_user_progress(99).await.unwrap();
    assert!(progress.is_none());
}

#[tokio::test]
async fn test_first_streak_update_starts_streak() {
    let harness = TestHarness::new();
    harness.new_user(1).await;

    let update = harness.engine.update_streak(1).await.unwrap();

    assert_eq!(update.old_streak, 0);
    assert_eq!(update.new_streak, 1);
    assert!(update.streak_continued);
    assert!(update.new_badges.is_empty());

    let progress = harness.store.load_user_progress(1).await.unwrap().unwrap();
    assert_eq!(progress.last_login_date, Some(harness.clock.today()));
}

#[tokio::test]
async fn test_streak_update_is_idempotent_within_a_day() {
    let harness = TestHarness::new();
    harness.new_user(1).await;

    let first = harness.engine.update_streak(1).await.unwrap();
    let second = harness.engine.update_streak(1).await.unwrap();

    assert_eq!(first.new_streak, 1);
    assert_eq!(second.old_streak, 1);
    assert_eq!(second.new_streak, 1);
    assert!(!second.streak_continued);
}

#[tokio::test]
async fn test_consecutive_day_extends_streak() {
    let harness = TestHarness::new();
    harness.user_with_streak(1, 3, 1).await;

    let update = harness.engine.update_streak(1).await.unwrap();

    assert_eq!(update.old_streak, 3);
    assert_eq!(update.new_streak, 4);
    assert!(update.streak_continued);
}

#[tokio::test]
async fn test_gap_resets_streak() {
    let harness = TestHarness::new();
    harness.user_with_streak(1, 4, 5).await;

    let update = harness.engine.update_streak(1).await.unwrap();

    assert_eq!(update.old_streak, 4);
    assert_eq!(update.new_streak, 1);
    assert!(!update.streak_continued);
}

#[tokio::test]
async fn test_seventh_day_grants_streak_badge_once() {
    let harness = TestHarness::new();
    harness.user_with_streak(1, 6, 1).await;

    let update = harness.engine.update_streak(1).await.unwrap();
    assert_eq!(update.new_streak, 7);
    assert_eq!(names(&update.new_badges), vec!["7-Day Streak"]);

    let again = harness.engine.update_streak(1).await.unwrap();
    assert_eq!(again.new_streak, 7);
    assert!(again.new_badges.is_empty());

    let badges = harness.store.earned_badges(1).await.unwrap();
    assert_eq!(badges.len(), 1);
    assert_eq!(badges[0].name, "7-Day Streak");
}

#[tokio::test]
async fn test_update_streak_catches_up_missing_badges_without_a_date_change() {
    let harness = TestHarness::new();
    // Already counted today, but the badge was never granted
    harness.user_with_streak(1, 8, 0).await;

    let update = harness.engine.update_streak(1).await.unwrap();

    assert_eq!(update.new_streak, 8);
    assert!(!update.streak_continued);
    assert_eq!(names(&update.new_badges), vec!["7-Day Streak"]);
}

#[tokio::test]
async fn test_login_counts_each_day_once() {
    let harness = TestHarness::new();
    harness.new_user(1).await;

    let first = harness.engine.on_login(1).await.unwrap();
    assert_eq!(first.daily_streak, 1);
    assert!(first.streak_continued);
    assert_eq!(first.last_active_date, Some(harness.clock.today()));

    let same_day = harness.engine.on_login(1).await.unwrap();
    assert_eq!(same_day.daily_streak, 1);
    assert!(!same_day.streak_continued);

    harness.clock.advance_days(1);
    let next_day = harness.engine.on_login(1).await.unwrap();
    assert_eq!(next_day.daily_streak, 2);
    assert!(next_day.streak_continued);

    harness.clock.advance_days(3);
    let after_gap = harness.engine.on_login(1).await.unwrap();
    assert_eq!(after_gap.daily_streak, 1);
    assert!(!after_gap.streak_continued);
}

#[tokio::test]
async fn test_login_grants_streak_badges() {
    let harness = TestHarness::new();
    harness.user_with_streak(1, 29, 1).await;

    let snapshot = harness.engine.on_login(1).await.unwrap();

    assert_eq!(snapshot.daily_streak, 30);
    assert_eq!(
        names(&snapshot.new_badges),
        vec!["7-Day Streak", "30-Day Streak"]
    );
    assert_eq!(snapshot.badges.len(), 2);
}

#[tokio::test]
async fn test_login_snapshot_includes_learning_records() {
    let harness = TestHarness::new();
    harness.new_user(1).await;
    harness.store.record_material_completion(1, 2).await;
    harness.store.record_material_completion(1, 1).await;
    for (id, minute) in (1..=7).zip(0..) {
        harness
            .store
            .record_quiz_result(1, quiz(id, 60 + minute as i32, minute))
            .await;
    }

    let snapshot = harness.engine.on_login(1).await.unwrap();

    assert_eq!(snapshot.completed_materials, vec![1, 2]);
    let recent: Vec<i64> = snapshot
        .quiz_scores
        .iter()
        .map(|score| score.quiz_id)
        .collect();
    assert_eq!(recent, vec![7, 6, 5, 4, 3]);
}

#[tokio::test]
async fn test_session_snapshot_does_not_write() {
    let harness = TestHarness::new();
    harness.new_user(1).await;

    let snapshot = harness.engine.session_snapshot(1).await.unwrap();

    assert_eq!(snapshot.daily_streak, 0);
    assert_eq!(snapshot.last_active_date, None);
    assert!(snapshot.new_badges.is_empty());

    let progress = harness.store.load_user_progress(1).await.unwrap().unwrap();
    assert_eq!(progress.daily_streak, 0);
    assert_eq!(progress.last_login_date, None);
}

#[tokio::test]
async fn test_progress_without_quizzes_has_zero_average() {
    let harness = TestHarness::new();
    harness.new_user(1).await;

    let progress = harness.engine.get_progress(1).await.unwrap();

    assert_eq!(progress.quiz_attempts, 0);
    assert_eq!(progress.avg_quiz_score, 0.0);
    assert_eq!(progress.completed_materials, 0);
    assert!(progress.badges.is_empty());
}

#[tokio::test]
async fn test_progress_average_is_rounded() {
    let harness = TestHarness::new();
    harness.new_user(1).await;
    harness.store.record_quiz_result(1, quiz(1, 70, 0)).await;
    harness.store.record_quiz_result(1, quiz(2, 85, 1)).await;
    harness.store.record_quiz_result(1, quiz(3, 96, 2)).await;

    let progress = harness.engine.get_progress(1).await.unwrap();

    assert_eq!(progress.quiz_attempts, 3);
    assert_eq!(progress.avg_quiz_score, 83.67);
}

#[tokio::test]
async fn test_progress_lists_newest_badges_first() {
    let harness = TestHarness::new();
    harness.new_user(1).await;

    harness.engine.award_points(1, 2500).await.unwrap();
    harness.clock.advance_days(1);
    harness.engine.update_streak(1).await.unwrap();
    harness.clock.advance_days(1);
    harness.engine.award_points(1, 7500).await.unwrap();

    let progress = harness.engine.get_progress(1).await.unwrap();
    let names: Vec<&str> = progress
        .badges
        .iter()
        .map(|badge| badge.name.as_str())
        .collect();

    assert_eq!(names, vec!["Level 10", "Level 5"]);
    assert!(progress.badges[0].earned_at > progress.badges[1].earned_at);
}

#[tokio::test]
async fn test_sync_learning_badges() {
    let harness = TestHarness::new();
    harness.new_user(1).await;
    harness.store.record_material_completion(1, 1).await;
    harness.store.record_quiz_result(1, quiz(1, 100, 0)).await;

    let outcome = harness.engine.sync_learning_badges(1).await.unwrap();

    assert_eq!(outcome.completed_materials, 1);
    assert_eq!(outcome.quiz_attempts, 1);
    assert_eq!(outcome.best_quiz_score, Some(100));
    assert_eq!(
        names(&outcome.new_badges),
        vec!["First Material", "First Quiz", "Perfect Score"]
    );

    let again = harness.engine.sync_learning_badges(1).await.unwrap();
    assert!(again.new_badges.is_empty());

    for material in 2..=5 {
        harness.store.record_material_completion(1, material).await;
    }
    let graduated = harness.engine.sync_learning_badges(1).await.unwrap();
    assert_eq!(names(&graduated.new_badges), vec!["Security Graduate"]);
}

#[tokio::test]
async fn test_sync_without_quizzes_skips_score_badges() {
    let harness = TestHarness::new();
    harness.new_user(1).await;

    let outcome = harness.engine.sync_learning_badges(1).await.unwrap();

    assert_eq!(outcome.best_quiz_score, None);
    assert!(outcome.new_badges.is_empty());
}

#[tokio::test]
async fn test_duplicate_grant_leaves_one_row() {
    let harness = TestHarness::new();
    harness.new_user(1).await;
    let earned_at = harness.clock.now();

    let mut tx = harness.store.begin().await.unwrap();
    assert!(tx.create_grant(1, 6, earned_at).await.unwrap());
    let later = earned_at + Duration::hours(1);
    assert!(!tx.create_grant(1, 6, later).await.unwrap());
    tx.commit().await.unwrap();

    let badges = harness.store.earned_badges(1).await.unwrap();
    assert_eq!(badges.len(), 1);
    assert_eq!(badges[0].earned_at, earned_at);
}

#[tokio::test]
async fn test_concurrent_awards_are_not_lost() {
    let harness = TestHarness::new();
    harness.new_user(1).await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let engine = harness.engine.clone();
            tokio::spawn(async move { engine.award_points(1, 125).await })
        })
        .collect();

    let mut level_ups = 0;
    let mut badges = Vec::new();
    for handle in handles {
        let outcome = handle.await.unwrap().unwrap();
        if outcome.leveled_up {
            level_ups += 1;
        }
        badges.extend(outcome.new_badges);
    }

    let progress = harness.engine.get_progress(1).await.unwrap();
    assert_eq!(progress.xp, 2500);
    assert_eq!(progress.level, 5);
    // 1 -> 2 -> 3 -> 4 -> 5, each observed by exactly one award
    assert_eq!(level_ups, 4);
    assert_eq!(names(&badges), vec!["Level 5"]);
}

#[tokio::test]
async fn test_single_write_conflict_is_retried() {
    let harness = TestHarness::new();
    harness.new_user(1).await;
    let engine = harness.conflicting_engine(1);

    let outcome = engine.award_points(1, 2500).await.unwrap();

    assert_eq!(outcome.new_xp, 2500);
    assert_eq!(names(&outcome.new_badges), vec!["Level 5"]);
    assert_eq!(engine.store().attempts(), 2);

    // Only the replayed attempt was applied
    let progress = harness.engine.get_progress(1).await.unwrap();
    assert_eq!(progress.xp, 2500);
    assert_eq!(progress.badge_count, 1);
}

#[tokio::test]
async fn test_second_write_conflict_is_reported() {
    let harness = TestHarness::new();
    harness.new_user(1).await;
    let engine = harness.conflicting_engine(2);

    let err = engine.award_points(1, 2500).await.unwrap_err();
    assert!(matches!(err, GamificationError::Conflict(1)));
    assert_eq!(engine.store().attempts(), 2);

    // Both attempts rolled back: no XP and no grant
    let progress = harness.engine.get_progress(1).await.unwrap();
    assert_eq!(progress.xp, 0);
    assert_eq!(progress.level, 1);
    assert!(progress.badges.is_empty());
}

#[tokio::test]
async fn test_conflicted_streak_update_leaves_no_partial_state() {
    let harness = TestHarness::new();
    harness.user_with_streak(1, 6, 1).await;
    let engine = harness.conflicting_engine(2);

    let err = engine.update_streak(1).await.unwrap_err();
    assert!(matches!(err, GamificationError::Conflict(1)));

    let progress = harness.store.load_user_progress(1).await.unwrap().unwrap();
    assert_eq!(progress.daily_streak, 6);
    assert!(harness.store.earned_badges(1).await.unwrap().is_empty());

    // Conflicts are used up, so the next call goes through
    assert_eq!(engine.store().conflicts_left(), 0);
    let update = engine.update_streak(1).await.unwrap();
    assert_eq!(update.new_streak, 7);
    assert_eq!(names(&update.new_badges), vec!["7-Day Streak"]);
}
