use serde::Serialize;

/// XP needed per "unit" of the level curve: level = floor(sqrt(xp / 100)).
const XP_PER_LEVEL_UNIT: f64 = 100.0;

/// Result of awarding XP to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct XpOutcome {
    pub new_xp: i64,
    pub new_level: i32,
    pub leveled_up: bool,
}

/// Level reached with `total_xp` experience points.
///
/// The curve is `max(1, floor(sqrt(total_xp / 100)))`, so level `n` starts at
/// `100 * n^2` XP:
///
/// * 0 - 399 XP: level 1
/// * 400 XP: level 2
/// * 2500 XP: level 5
/// * 10000 XP: level 10
pub fn level_for_xp(total_xp: i64) -> i32 {
    let xp = total_xp.max(0) as f64;
    let level = (xp / XP_PER_LEVEL_UNIT).sqrt().floor() as i32;
    level.max(1)
}

/// Add `delta` XP to `current_xp` and derive the new level.
///
/// The previous level is recomputed from `current_xp` instead of being read
/// from storage, so a drifted stored level cannot produce a false level-up.
/// Rejecting non-positive deltas is up to the caller.
pub fn compute_xp(current_xp: i64, delta: i64) -> XpOutcome {
    let current_level = level_for_xp(current_xp);
    let new_xp = current_xp.saturating_add(delta);
    let new_level = level_for_xp(new_xp);

    XpOutcome {
        new_xp,
        new_level,
        leveled_up: new_level > current_level,
    }
}
