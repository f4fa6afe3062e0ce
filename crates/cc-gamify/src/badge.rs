use std::{collections::HashSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The measurable quantity a badge is unlocked by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementType {
    /// Number of completed learning materials
    Material,
    /// Number of quiz attempts
    Quiz,
    /// Best score obtained on a single quiz
    Score,
    /// Current daily login streak
    Streak,
    /// Current level
    Level,
}

impl RequirementType {
    pub const ALL: [Self; 5] = [
        Self::Material,
        Self::Quiz,
        Self::Score,
        Self::Streak,
        Self::Level,
    ];

    /// Name used in storage and on the wire
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Material => "material",
            Self::Quiz => "quiz",
            Self::Score => "score",
            Self::Streak => "streak",
            Self::Level => "level",
        }
    }
}

impl fmt::Display for RequirementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown badge requirement type: '{0}'")]
pub struct UnknownRequirementType(pub String);

impl FromStr for RequirementType {
    type Err = UnknownRequirementType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownRequirementType(s.to_string()))
    }
}

impl TryFrom<String> for RequirementType {
    type Error = UnknownRequirementType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// What the evaluator needs to know about a catalog entry.
pub trait BadgeCriteria {
    fn badge_id(&self) -> i64;
    fn requirement_type(&self) -> RequirementType;
    fn requirement_value(&self) -> i64;
}

/// Select the catalog badges a user newly qualifies for.
///
/// Returns every entry of `requirement_type` whose threshold is at most
/// `achieved_value` and whose id is not in `already_granted`, ordered by
/// ascending threshold and then id.
///
/// Evaluation is idempotent with respect to grants: once the returned badges
/// are added to `already_granted`, the same call yields nothing.
pub fn evaluate_badges<B>(
    requirement_type: RequirementType,
    achieved_value: i64,
    already_granted: &HashSet<i64>,
    catalog: &[B],
) -> Vec<B>
where
    B: BadgeCriteria + Clone,
{
    let mut qualifying: Vec<B> = catalog
        .iter()
        .filter(|badge| badge.requirement_type() == requirement_type)
        .filter(|badge| badge.requirement_value() <= achieved_value)
        .filter(|badge| !already_granted.contains(&badge.badge_id()))
        .cloned()
        .collect();

    qualifying.sort_by_key(|badge| (badge.requirement_value(), badge.badge_id()));
    qualifying
}
