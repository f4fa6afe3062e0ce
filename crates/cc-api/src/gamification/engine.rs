use std::{collections::HashSet, future::Future};

use cc_db::models::{Badge, UserProgress};
use cc_gamify::{Clock, RequirementType, SystemClock, compute_streak, compute_xp, evaluate_badges};
use thiserror::Error;

use super::{
    model::{AwardOutcome, BadgeSyncOutcome, LoginSnapshot, ProgressSummary, StreakUpdate},
    store::{ProgressStore, ProgressTx, StoreError},
};
use crate::metrics;

/// Number of quiz attempts included in a login snapshot
pub const RECENT_QUIZ_SCORES: i64 = 5;

#[derive(Error, Debug)]
pub enum GamificationError {
    #[error("Points must be a positive number, got {0}")]
    InvalidPoints(i64),
    #[error("User progress not found for user {0}")]
    ProgressNotFound(i64),
    #[error("Progress of user {0} is being updated concurrently, please retry")]
    Conflict(i64),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Turns learning events into XP, level, streak and badge changes.
///
/// Every mutating operation runs in a single store transaction with the
/// user's progress row locked, so concurrent calls for the same user
/// serialize and a failed operation leaves no partial writes behind.
#[derive(Clone, Debug)]
pub struct GamificationEngine<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: ProgressStore> GamificationEngine<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock::default())
    }
}

impl<S, C> GamificationEngine<S, C>
where
    S: ProgressStore,
    C: Clock,
{
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Count today's login towards the streak and return the user's dashboard.
    pub async fn on_login(&self, user_id: i64) -> Result<LoginSnapshot, GamificationError> {
        let result = self
            .with_retry(user_id, move || self.try_login(user_id))
            .await;
        metrics::record_gamification_event("login", result.is_ok());

        let (progress, streak_continued, new_badges) = result?;
        if !new_badges.is_empty() {
            metrics::record_badges_granted(RequirementType::Streak, new_badges.len());
        }

        tracing::info!(
            user_id,
            streak = progress.daily_streak,
            new_badges = new_badges.len(),
            "Login recorded"
        );

        self.snapshot(progress, streak_continued, new_badges).await
    }

    /// Dashboard of an already logged-in user. Never writes.
    pub async fn session_snapshot(&self, user_id: i64) -> Result<LoginSnapshot, GamificationError> {
        let progress = self
            .store
            .load_user_progress(user_id)
            .await?
            .ok_or(GamificationError::ProgressNotFound(user_id))?;

        self.snapshot(progress, false, Vec::new()).await
    }

    pub async fn award_points(
        &self,
        user_id: i64,
        points: i64,
    ) -> Result<AwardOutcome, GamificationError> {
        if points <= 0 {
            metrics::record_gamification_event("award_points", false);
            return Err(GamificationError::InvalidPoints(points));
        }

        let result = self
            .with_retry(user_id, move || self.try_award_points(user_id, points))
            .await;
        metrics::record_gamification_event("award_points", result.is_ok());
        let outcome = result?;

        metrics::record_xp_awarded(points);
        if !outcome.new_badges.is_empty() {
            metrics::record_badges_granted(RequirementType::Level, outcome.new_badges.len());
        }

        tracing::info!(
            user_id,
            points,
            new_xp = outcome.new_xp,
            new_level = outcome.new_level,
            leveled_up = outcome.leveled_up,
            "Points awarded"
        );

        Ok(outcome)
    }

    pub async fn update_streak(&self, user_id: i64) -> Result<StreakUpdate, GamificationError> {
        let result = self
            .with_retry(user_id, move || self.try_update_streak(user_id))
            .await;
        metrics::record_gamification_event("update_streak", result.is_ok());
        let update = result?;

        if !update.new_badges.is_empty() {
            metrics::record_badges_granted(RequirementType::Streak, update.new_badges.len());
        }

        tracing::info!(
            user_id,
            old_streak = update.old_streak,
            new_streak = update.new_streak,
            "Streak updated"
        );

        Ok(update)
    }

    pub async fn get_progress(&self, user_id: i64) -> Result<ProgressSummary, GamificationError> {
        let progress = self
            .store
            .load_user_progress(user_id)
            .await?
            .ok_or(GamificationError::ProgressNotFound(user_id))?;

        let badges = self.store.earned_badges(user_id).await?;
        let completed_materials = self.store.count_completed_materials(user_id).await?;
        let quiz_attempts = self.store.count_quiz_attempts(user_id).await?;
        let avg_quiz_score = round_to_cents(self.store.average_quiz_score(user_id).await?);

        Ok(ProgressSummary {
            xp: progress.total_xp,
            level: progress.level,
            streak: progress.daily_streak,
            badge_count: badges.len(),
            completed_materials,
            quiz_attempts,
            avg_quiz_score,
            badges,
        })
    }

    /// Grant every material, quiz and score badge the user's learning record qualifies for.
    pub async fn sync_learning_badges(
        &self,
        user_id: i64,
    ) -> Result<BadgeSyncOutcome, GamificationError> {
        let completed_materials = self.store.count_completed_materials(user_id).await?;
        let quiz_attempts = self.store.count_quiz_attempts(user_id).await?;
        let best_quiz_score = self.store.best_quiz_score(user_id).await?;

        let result = self
            .with_retry(user_id, move || {
                self.try_sync_learning_badges(
                    user_id,
                    completed_materials,
                    quiz_attempts,
                    best_quiz_score,
                )
            })
            .await;
        metrics::record_gamification_event("sync_badges", result.is_ok());
        let new_badges = result?;

        for kind in [
            RequirementType::Material,
            RequirementType::Quiz,
            RequirementType::Score,
        ] {
            let granted = new_badges
                .iter()
                .filter(|badge| badge.requirement_type == kind)
                .count();
            if granted > 0 {
                metrics::record_badges_granted(kind, granted);
            }
        }

        Ok(BadgeSyncOutcome {
            completed_materials,
            quiz_attempts,
            best_quiz_score,
            new_badges,
        })
    }

    async fn try_login(
        &self,
        user_id: i64,
    ) -> Result<(UserProgress, bool, Vec<Badge>), GamificationError> {
        let mut tx = self.store.begin().await?;
        let mut progress = lock_progress(&mut tx, user_id).await?;

        let today = self.clock.today();
        let streak = compute_streak(progress.last_login_date, today, progress.daily_streak);

        let mut new_badges = Vec::new();
        if streak.date_changed {
            progress.daily_streak = streak.new_streak;
            progress.last_login_date = Some(today);
            tx.save_user_progress(&progress).await?;

            new_badges = self
                .grant_qualifying(
                    &mut tx,
                    user_id,
                    RequirementType::Streak,
                    i64::from(streak.new_streak),
                )
                .await?;
        }

        tx.commit().await?;
        Ok((progress, streak.continued, new_badges))
    }

    async fn try_award_points(
        &self,
        user_id: i64,
        points: i64,
    ) -> Result<AwardOutcome, GamificationError> {
        let mut tx = self.store.begin().await?;
        let mut progress = lock_progress(&mut tx, user_id).await?;

        let xp = compute_xp(progress.total_xp, points);
        progress.total_xp = xp.new_xp;
        progress.level = xp.new_level;
        tx.save_user_progress(&progress).await?;

        let new_badges = if xp.leveled_up {
            self.grant_qualifying(
                &mut tx,
                user_id,
                RequirementType::Level,
                i64::from(xp.new_level),
            )
            .await?
        } else {
            Vec::new()
        };

        tx.commit().await?;

        Ok(AwardOutcome {
            points_awarded: points,
            new_xp: xp.new_xp,
            new_level: xp.new_level,
            leveled_up: xp.leveled_up,
            new_badges,
        })
    }

    async fn try_update_streak(&self, user_id: i64) -> Result<StreakUpdate, GamificationError> {
        let mut tx = self.store.begin().await?;
        let mut progress = lock_progress(&mut tx, user_id).await?;

        let old_streak = progress.daily_streak;
        let today = self.clock.today();
        let streak = compute_streak(progress.last_login_date, today, old_streak);

        if streak.date_changed {
            progress.daily_streak = streak.new_streak;
            progress.last_login_date = Some(today);
            tx.save_user_progress(&progress).await?;
        }

        // Evaluated even without a change so badges missed earlier are caught up
        let new_badges = self
            .grant_qualifying(
                &mut tx,
                user_id,
                RequirementType::Streak,
                i64::from(streak.new_streak),
            )
            .await?;

        tx.commit().await?;

        Ok(StreakUpdate {
            old_streak,
            new_streak: streak.new_streak,
            streak_continued: streak.continued,
            new_badges,
        })
    }

    async fn try_sync_learning_badges(
        &self,
        user_id: i64,
        completed_materials: i64,
        quiz_attempts: i64,
        best_quiz_score: Option<i32>,
    ) -> Result<Vec<Badge>, GamificationError> {
        let mut tx = self.store.begin().await?;
        // Locks the row so a concurrent sync waits instead of racing on grants
        lock_progress(&mut tx, user_id).await?;

        let mut new_badges = self
            .grant_qualifying(
                &mut tx,
                user_id,
                RequirementType::Material,
                completed_materials,
            )
            .await?;
        new_badges.extend(
            self.grant_qualifying(&mut tx, user_id, RequirementType::Quiz, quiz_attempts)
                .await?,
        );
        if let Some(score) = best_quiz_score {
            new_badges.extend(
                self.grant_qualifying(&mut tx, user_id, RequirementType::Score, i64::from(score))
                    .await?,
            );
        }

        tx.commit().await?;
        Ok(new_badges)
    }

    /// Create the missing grants of one requirement type and return the
    /// badges that were actually inserted.
    async fn grant_qualifying(
        &self,
        tx: &mut S::Tx,
        user_id: i64,
        requirement_type: RequirementType,
        achieved: i64,
    ) -> Result<Vec<Badge>, GamificationError> {
        let candidates = tx.load_badge_catalog(requirement_type, achieved).await?;

        let mut already_granted = HashSet::new();
        for badge in &candidates {
            if tx.has_grant(user_id, badge.id).await? {
                already_granted.insert(badge.id);
            }
        }

        let qualifying = evaluate_badges(requirement_type, achieved, &already_granted, &candidates);

        let earned_at = self.clock.now();
        let mut granted = Vec::with_capacity(qualifying.len());
        for badge in qualifying {
            // A concurrent grant makes this a no-op; only report rows we created
            if tx.create_grant(user_id, badge.id, earned_at).await? {
                tracing::debug!(user_id, badge = %badge.name, "Badge granted");
                granted.push(badge);
            }
        }

        Ok(granted)
    }

    /// Run one transactional attempt, replaying it once after a write conflict.
    async fn with_retry<T, F, Fut>(&self, user_id: i64, attempt: F) -> Result<T, GamificationError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, GamificationError>>,
    {
        match attempt().await {
            Err(GamificationError::Store(StoreError::Conflict)) => {
                tracing::warn!(user_id, "Write conflict, retrying once");
                match attempt().await {
                    Err(GamificationError::Store(StoreError::Conflict)) => {
                        Err(GamificationError::Conflict(user_id))
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn snapshot(
        &self,
        progress: UserProgress,
        streak_continued: bool,
        new_badges: Vec<Badge>,
    ) -> Result<LoginSnapshot, GamificationError> {
        let user_id = progress.user_id;
        let badges = self.store.earned_badges(user_id).await?;
        let completed_materials = self.store.completed_material_ids(user_id).await?;
        let quiz_scores = self
            .store
            .recent_quiz_scores(user_id, RECENT_QUIZ_SCORES)
            .await?;

        Ok(LoginSnapshot {
            xp: progress.total_xp,
            level: progress.level,
            daily_streak: progress.daily_streak,
            streak_continued,
            badges,
            completed_materials,
            quiz_scores,
            last_active_date: progress.last_login_date,
            new_badges,
        })
    }
}

async fn lock_progress<T: ProgressTx>(
    tx: &mut T,
    user_id: i64,
) -> Result<UserProgress, GamificationError> {
    tx.lock_user_progress(user_id)
        .await?
        .ok_or(GamificationError::ProgressNotFound(user_id))
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
