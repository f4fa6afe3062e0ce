//! Gamification rules for CyberCare
//!
//! This crate holds the pure, storage-free rules that turn learning events into
//! progress: daily login streaks, the XP to level curve, and badge
//! qualification. Nothing here performs I/O; callers load state, run these
//! functions and persist the results.

pub mod badge;
pub mod clock;
pub mod level;
pub mod streak;

pub use badge::{BadgeCriteria, RequirementType, UnknownRequirementType, evaluate_badges};
pub use clock::{Clock, SystemClock};
pub use level::{XpOutcome, compute_xp, level_for_xp};
pub use streak::{StreakOutcome, compute_streak};
