//! Gamification engine and its HTTP surface.

mod engine;
mod memory_store;
mod model;
mod pg_store;
mod routes;
mod store;

pub use engine::{GamificationEngine, GamificationError, RECENT_QUIZ_SCORES};
pub use memory_store::{MemoryProgressStore, MemoryProgressTx};
pub use model::{
    AwardOutcome, AwardPointsRequest, BadgeSyncOutcome, LoginSnapshot, ProgressSummary,
    StreakUpdate,
};
pub use pg_store::{PgProgressStore, PgProgressTx};
pub use routes::{SessionStatus, routes};
pub use store::{ProgressStore, ProgressTx, StoreError};
