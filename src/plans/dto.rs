use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    model::{Member, WeekDays, WeekPlan},
    services::{GroupWeek, MemberWeek, MyWeek, PricedPlan},
};

/// Body of `POST /plans`. `days` is left untyped; `normalize_days` validates it.
#[derive(Debug, Deserialize)]
pub struct SavePlanRequest {
    #[serde(default, alias = "weekStart")]
    pub week_start: Option<String>,
    #[serde(default)]
    pub days: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct WeekQuery {
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct WeekStartResponse {
    pub week_start: String,
}

#[derive(Debug, Serialize)]
pub struct SavedPlanResponse {
    pub plan: WeekPlan,
    pub total: u64,
}

impl From<PricedPlan> for SavedPlanResponse {
    fn from(p: PricedPlan) -> Self {
        Self {
            plan: p.plan,
            total: p.total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MyPlanResponse {
    pub week_start: String,
    pub plan: Option<WeekPlan>,
    pub days: WeekDays,
    pub total: u64,
}

impl From<MyWeek> for MyPlanResponse {
    fn from(w: MyWeek) -> Self {
        Self {
            week_start: w.week_start,
            plan: w.plan,
            days: w.days,
            total: w.total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MemberPlan {
    pub user: Member,
    pub days: WeekDays,
    pub total: u64,
    pub planned: bool,
}

impl From<MemberWeek> for MemberPlan {
    fn from(m: MemberWeek) -> Self {
        Self {
            user: m.member,
            days: m.days,
            total: m.total,
            planned: m.planned,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GroupWeekResponse {
    pub week_start: String,
    pub members: Vec<MemberPlan>,
    pub group_total: u64,
}

impl From<GroupWeek> for GroupWeekResponse {
    fn from(g: GroupWeek) -> Self {
        Self {
            week_start: g.week_start,
            members: g.members.into_iter().map(Into::into).collect(),
            group_total: g.group_total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryRow {
    pub user_id: Uuid,
    pub user: String,
    pub days: WeekDays,
    pub total: u64,
}

/// Bill summary: who owes what for the week.
#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub week_start: String,
    pub rows: Vec<SummaryRow>,
    pub group_total: u64,
}

impl From<GroupWeek> for SummaryResponse {
    fn from(g: GroupWeek) -> Self {
        Self {
            week_start: g.week_start,
            rows: g
                .members
                .into_iter()
                .map(|m| SummaryRow {
                    user_id: m.member.id,
                    user: m.member.name,
                    days: m.days,
                    total: m.total,
                })
                .collect(),
            group_total: g.group_total,
        }
    }
}
