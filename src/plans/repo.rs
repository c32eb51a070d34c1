use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::{
    model::{RosterEntry, WeekDays, WeekPlan},
    repo_types::{RosterRow, WeekPlanRow},
    store::{PlanStore, StoreError},
};

/// PostgreSQL-backed plan storage. `UNIQUE (owner_id, week_start)` on
/// `week_plans` is what turns a racing insert into [`StoreError::Conflict`].
#[derive(Clone)]
pub struct PgPlanStore {
    db: PgPool,
}

impl PgPlanStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn find(&self, owner: Uuid, week_start: &str) -> Result<Option<WeekPlan>, StoreError> {
        let row = sqlx::query_as::<_, WeekPlanRow>(
            r#"
            SELECT id, owner_id, week_start, days, created_at, updated_at
              FROM week_plans
             WHERE owner_id = $1 AND week_start = $2
            "#,
        )
        .bind(owner)
        .bind(week_start)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn insert(
        &self,
        owner: Uuid,
        week_start: &str,
        days: &WeekDays,
    ) -> Result<WeekPlan, StoreError> {
        let row = sqlx::query_as::<_, WeekPlanRow>(
            r#"
            INSERT INTO week_plans (owner_id, week_start, days)
            VALUES ($1, $2, $3)
            RETURNING id, owner_id, week_start, days, created_at, updated_at
            "#,
        )
        .bind(owner)
        .bind(week_start)
        .bind(Json(*days))
        .fetch_one(&self.db)
        .await?;
        Ok(row.into())
    }

    async fn replace_days(
        &self,
        owner: Uuid,
        week_start: &str,
        days: &WeekDays,
    ) -> Result<Option<WeekPlan>, StoreError> {
        let row = sqlx::query_as::<_, WeekPlanRow>(
            r#"
            UPDATE week_plans
               SET days = $3, updated_at = now()
             WHERE owner_id = $1 AND week_start = $2
            RETURNING id, owner_id, week_start, days, created_at, updated_at
            "#,
        )
        .bind(owner)
        .bind(week_start)
        .bind(Json(*days))
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn week_roster(&self, week_start: &str) -> Result<Vec<RosterEntry>, StoreError> {
        let rows = sqlx::query_as::<_, RosterRow>(
            r#"
            SELECT u.id, u.name, u.email, p.days
              FROM users u
              LEFT JOIN week_plans p
                ON p.owner_id = u.id AND p.week_start = $1
             ORDER BY u.name ASC, u.id ASC
            "#,
        )
        .bind(week_start)
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
