use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{Member, RosterEntry, WeekDays, WeekPlan};

/// Row of `week_plans`.
#[derive(Debug, FromRow)]
pub struct WeekPlanRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub week_start: String,
    pub days: Json<WeekDays>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl From<WeekPlanRow> for WeekPlan {
    fn from(r: WeekPlanRow) -> Self {
        Self {
            id: r.id,
            owner: r.owner_id,
            week_start: r.week_start,
            days: r.days.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// `users` left-joined to one week's plans.
#[derive(Debug, FromRow)]
pub struct RosterRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub days: Option<Json<WeekDays>>,
}

impl From<RosterRow> for RosterEntry {
    fn from(r: RosterRow) -> Self {
        Self {
            member: Member {
                id: r.id,
                name: r.name,
                email: r.email,
            },
            days: r.days.map(|d| d.0),
        }
    }
}
