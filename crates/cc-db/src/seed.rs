//! The fixed badge catalog and its seeding.

use cc_gamify::RequirementType;
use sqlx::PgPool;

use crate::{models::Badge, repositories::badge};

/// Static definition of a catalog badge
#[derive(Debug, Clone, Copy)]
pub struct BadgeSeed {
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub requirement_type: RequirementType,
    pub requirement_value: i32,
}

impl BadgeSeed {
    /// Materialize the seed as a catalog row with the given id
    pub fn to_badge(&self, id: i64) -> Badge {
        Badge {
            id,
            name: self.name.to_string(),
            description: self.description.to_string(),
            icon: self.icon.to_string(),
            requirement_type: self.requirement_type,
            requirement_value: self.requirement_value,
        }
    }
}

pub const BADGE_CATALOG: &[BadgeSeed] = &[
    BadgeSeed {
        name: "First Material",
        description: "Completed your first learning material",
        icon: "📚",
        requirement_type: RequirementType::Material,
        requirement_value: 1,
    },
    BadgeSeed {
        name: "Security Graduate",
        description: "Completed every learning material",
        icon: "🎓",
        requirement_type: RequirementType::Material,
        requirement_value: 5,
    },
    BadgeSeed {
        name: "First Quiz",
        description: "Completed your first quiz",
        icon: "✅",
        requirement_type: RequirementType::Quiz,
        requirement_value: 1,
    },
    BadgeSeed {
        name: "Quiz Master",
        description: "Completed every quiz",
        icon: "🏅",
        requirement_type: RequirementType::Quiz,
        requirement_value: 5,
    },
    BadgeSeed {
        name: "Perfect Score",
        description: "Scored 100 on a quiz",
        icon: "💯",
        requirement_type: RequirementType::Score,
        requirement_value: 100,
    },
    BadgeSeed {
        name: "7-Day Streak",
        description: "Logged in 7 days in a row",
        icon: "🔥",
        requirement_type: RequirementType::Streak,
        requirement_value: 7,
    },
    BadgeSeed {
        name: "30-Day Streak",
        description: "Logged in 30 days in a row",
        icon: "⭐",
        requirement_type: RequirementType::Streak,
        requirement_value: 30,
    },
    BadgeSeed {
        name: "Level 5",
        description: "Reached level 5",
        icon: "🏆",
        requirement_type: RequirementType::Level,
        requirement_value: 5,
    },
    BadgeSeed {
        name: "Level 10",
        description: "Reached level 10",
        icon: "👑",
        requirement_type: RequirementType::Level,
        requirement_value: 10,
    },
];

/// The catalog with ids assigned in declaration order, starting at 1.
pub fn default_catalog() -> Vec<Badge> {
    BADGE_CATALOG
        .iter()
        .zip(1..)
        .map(|(seed, id)| seed.to_badge(id))
        .collect()
}

/// Upsert the badge catalog. Safe to run on every start.
pub async fn seed_badge_catalog(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for seed in BADGE_CATALOG {
        badge::upsert_badge(
            &mut *tx,
            seed.name,
            seed.description,
            seed.icon,
            seed.requirement_type,
            seed.requirement_value,
        )
        .await?;
    }

    tx.commit().await?;

    tracing::info!("Seeded {} achievement badges", BADGE_CATALOG.len());
    Ok(())
}
