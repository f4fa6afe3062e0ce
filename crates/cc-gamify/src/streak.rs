use chrono::NaiveDate;
use serde::Serialize;

/// Result of applying a login on `today` to a user's streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StreakOutcome {
    /// Streak value after the login
    pub new_streak: i32,
    /// True on a consecutive-day login and on the very first login
    pub continued: bool,
    /// False when the login falls on a day already counted
    pub date_changed: bool,
}

/// Compute the daily streak for a login happening on `today`.
///
/// # Arguments
///
/// * `last_login_date` - Calendar day of the previous counted login, if any
/// * `today` - Calendar day of this login, in the server's fixed time zone
/// * `current_streak` - Streak value currently stored for the user
///
/// # Rules
///
/// * Same day as the last login: nothing changes
/// * Day after the last login: streak + 1, continued
/// * First ever login: streak 1, continued
/// * Gap of more than one day: streak resets to 1, not continued
///
/// A last login dated after `today` (the clock moved backwards) is handled like
/// a same-day login so a stored streak never regresses because of clock skew.
///
/// The caller persists `new_streak` and moves the last login date to `today`
/// only when `date_changed` is true.
pub fn compute_streak(
    last_login_date: Option<NaiveDate>,
    today: NaiveDate,
    current_streak: i32,
) -> StreakOutcome {
    let Some(last) = last_login_date else {
        return StreakOutcome {
            new_streak: 1,
            continued: true,
            date_changed: true,
        };
    };

    match today.signed_duration_since(last).num_days() {
        days if days <= 0 => StreakOutcome {
            new_streak: current_streak,
            continued: false,
            date_changed: false,
        },
        1 => StreakOutcome {
            new_streak: current_streak.saturating_add(1),
            continued: true,
            date_changed: true,
        },
        _ => StreakOutcome {
            new_streak: 1,
            continued: false,
            date_changed: true,
        },
    }
}
