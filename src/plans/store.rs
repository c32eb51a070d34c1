use async_trait::async_trait;
use uuid::Uuid;

use super::model::{RosterEntry, WeekDays, WeekPlan};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Another writer created the `(owner, week_start)` row first.
    #[error("plan already exists for this owner and week")]
    Conflict,
    #[error("storage failure: {0:#}")]
    Backend(#[source] anyhow::Error),
}

pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if is_unique_violation(&e) {
            return StoreError::Conflict;
        }
        StoreError::Backend(e.into())
    }
}

/// Persistence for week plans, keyed uniquely by `(owner, week_start)`.
#[async_trait]
pub trait PlanStore: Send + Sync {
    async fn find(&self, owner: Uuid, week_start: &str) -> Result<Option<WeekPlan>, StoreError>;

    /// Creates the plan. Fails with [`StoreError::Conflict`] if the key is taken.
    async fn insert(
        &self,
        owner: Uuid,
        week_start: &str,
        days: &WeekDays,
    ) -> Result<WeekPlan, StoreError>;

    /// Overwrites `days` of an existing plan. `Ok(None)` when there is none.
    async fn replace_days(
        &self,
        owner: Uuid,
        week_start: &str,
        days: &WeekDays,
    ) -> Result<Option<WeekPlan>, StoreError>;

    /// Every member, with their plan for `week_start` if one exists, in one read.
    async fn week_roster(&self, week_start: &str) -> Result<Vec<RosterEntry>, StoreError>;
}
