use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    model::{MealSelection, MealSlot, Member, RosterEntry, WeekDays, WeekPlan, Weekday},
    pricing::PriceTable,
    store::{PlanStore, StoreError},
};

const MAX_UPSERT_ATTEMPTS: usize = 3;

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("week_start is required")]
    MissingWeekStart,
    #[error("days is required")]
    MissingDays,
    #[error("days must be an object keyed by weekday")]
    MalformedDays,
    #[error("invalid value for {0}")]
    MalformedDay(Weekday),
    #[error("invalid {slot} value for {day}")]
    InvalidMeal {
        day: Weekday,
        slot: MealSlot,
        value: String,
    },
    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct PricedPlan {
    pub plan: WeekPlan,
    pub total: u64,
}

/// A member's view of one week. `plan` is `None` until they first save.
#[derive(Debug, Clone)]
pub struct MyWeek {
    pub week_start: String,
    pub plan: Option<WeekPlan>,
    pub days: WeekDays,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct MemberWeek {
    pub member: Member,
    pub days: WeekDays,
    pub total: u64,
    pub planned: bool,
}

#[derive(Debug, Clone)]
pub struct GroupWeek {
    pub week_start: String,
    pub members: Vec<MemberWeek>,
    pub group_total: u64,
}

pub fn require_week_start(raw: Option<&str>) -> Result<&str, PlanError> {
    match raw {
        Some(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(PlanError::MissingWeekStart),
    }
}

/// Builds the full six-day week from submitted JSON.
///
/// Absent days, absent slots, `null` and `""` all mean `none`. Any other value
/// must name a known selection or the whole submission is rejected. Keys other
/// than `mon`..`sat` are ignored.
pub fn normalize_days(raw: &Value) -> Result<WeekDays, PlanError> {
    let map = raw.as_object().ok_or(PlanError::MalformedDays)?;

    for key in map.keys() {
        if !Weekday::ALL.iter().any(|d| d.key() == key) {
            debug!(key = %key, "ignoring unknown weekday key");
        }
    }

    let mut days = WeekDays::default();
    for day in Weekday::ALL {
        let entry = match map.get(day.key()) {
            None | Some(Value::Null) => continue,
            Some(Value::Object(entry)) => entry,
            Some(_) => return Err(PlanError::MalformedDay(day)),
        };
        for slot in MealSlot::ALL {
            *days.day_mut(day).slot_mut(slot) = parse_slot(entry.get(slot.key()), day, slot)?;
        }
    }
    Ok(days)
}

fn parse_slot(raw: Option<&Value>, day: Weekday, slot: MealSlot) -> Result<MealSelection, PlanError> {
    match raw {
        None | Some(Value::Null) => Ok(MealSelection::None),
        Some(Value::String(s)) if s.is_empty() => Ok(MealSelection::None),
        Some(Value::String(s)) => s.parse().map_err(|_| PlanError::InvalidMeal {
            day,
            slot,
            value: s.clone(),
        }),
        Some(other) => Err(PlanError::InvalidMeal {
            day,
            slot,
            value: other.to_string(),
        }),
    }
}

/// Validates, then creates or fully replaces the owner's plan for the week.
///
/// Existing rows are updated in place. When no row exists the insert may race
/// another save for the same key; the loser sees `Conflict` and goes round
/// again, this time finding the row to update.
pub async fn save_week_plan(
    store: &dyn PlanStore,
    pricing: &PriceTable,
    owner: Uuid,
    week_start: Option<&str>,
    raw_days: Option<&Value>,
) -> Result<PricedPlan, PlanError> {
    let week_start = require_week_start(week_start)?;
    let days = normalize_days(raw_days.ok_or(PlanError::MissingDays)?)?;

    for attempt in 1..=MAX_UPSERT_ATTEMPTS {
        if let Some(plan) = store.replace_days(owner, week_start, &days).await? {
            return Ok(priced(plan, pricing, "updated"));
        }
        match store.insert(owner, week_start, &days).await {
            Ok(plan) => return Ok(priced(plan, pricing, "created")),
            Err(StoreError::Conflict) => {
                warn!(user_id = %owner, %week_start, attempt, "plan insert conflicted, retrying as update");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(StoreError::Backend(anyhow::anyhow!(
        "plan upsert for {owner}/{week_start} did not settle after {MAX_UPSERT_ATTEMPTS} attempts"
    ))
    .into())
}

fn priced(plan: WeekPlan, pricing: &PriceTable, action: &str) -> PricedPlan {
    let total = pricing.total(&plan.days);
    info!(user_id = %plan.owner, week_start = %plan.week_start, total, action, "plan saved");
    PricedPlan { plan, total }
}

/// The owner's plan for a week, or an all-`none` week with a zero total.
pub async fn my_week(
    store: &dyn PlanStore,
    pricing: &PriceTable,
    owner: Uuid,
    week_start: &str,
) -> Result<MyWeek, PlanError> {
    let plan = store.find(owner, week_start).await?;
    let days = plan.as_ref().map(|p| p.days).unwrap_or_default();
    Ok(MyWeek {
        week_start: week_start.to_string(),
        total: pricing.total(&days),
        days,
        plan,
    })
}

/// Prices every roster line. Members without a plan count as all-`none`.
pub fn aggregate_week(week_start: &str, roster: Vec<RosterEntry>, pricing: &PriceTable) -> GroupWeek {
    let members: Vec<MemberWeek> = roster
        .into_iter()
        .map(|entry| {
            let planned = entry.days.is_some();
            let days = entry.days.unwrap_or_default();
            MemberWeek {
                total: pricing.total(&days),
                member: entry.member,
                days,
                planned,
            }
        })
        .collect();
    let group_total = members.iter().map(|m| m.total).sum();
    GroupWeek {
        week_start: week_start.to_string(),
        members,
        group_total,
    }
}

pub async fn group_week(
    store: &dyn PlanStore,
    pricing: &PriceTable,
    week_start: &str,
) -> Result<GroupWeek, PlanError> {
    let roster = store.week_roster(week_start).await?;
    Ok(aggregate_week(week_start, roster, pricing))
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    };

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::plans::store::memory::MemoryPlanStore;

    const WEEK: &str = "2024-01-15";

    fn member(name: &str) -> Member {
        Member {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{name}@example.com"),
        }
    }

    async fn save(store: &dyn PlanStore, owner: Uuid, days: Value) -> Result<PricedPlan, PlanError> {
        save_week_plan(store, &PriceTable::default(), owner, Some(WEEK), Some(&days)).await
    }

    #[test]
    fn normalize_fills_missing_days_and_slots() {
        let days = normalize_days(&json!({ "mon": { "lunch": "full" }, "fri": {} })).unwrap();
        assert_eq!(days.mon.lunch, MealSelection::Full);
        assert_eq!(days.mon.dinner, MealSelection::None);
        assert_eq!(days.fri, Default::default());
        assert_eq!(days.sat, Default::default());
    }

    #[test]
    fn normalize_treats_null_and_empty_as_none() {
        let days =
            normalize_days(&json!({ "tue": { "lunch": null, "dinner": "" }, "wed": null })).unwrap();
        assert_eq!(days, WeekDays::default());
    }

    #[test]
    fn normalize_ignores_sunday() {
        let days = normalize_days(&json!({ "sun": { "lunch": "full" } })).unwrap();
        assert_eq!(PriceTable::default().total(&days), 0);
    }

    #[test]
    fn normalize_names_offending_day_and_slot() {
        let err = normalize_days(&json!({ "thu": { "dinner": "large" } })).unwrap_err();
        assert_eq!(err.to_string(), "invalid dinner value for thu");

        let err = normalize_days(&json!({ "mon": { "lunch": 2 } })).unwrap_err();
        assert_eq!(err.to_string(), "invalid lunch value for mon");
    }

    #[test]
    fn normalize_rejects_malformed_shapes() {
        assert!(matches!(normalize_days(&json!([])), Err(PlanError::MalformedDays)));
        assert!(matches!(
            normalize_days(&json!({ "sat": "full" })),
            Err(PlanError::MalformedDay(Weekday::Sat))
        ));
    }

    #[test]
    fn blank_week_start_is_rejected() {
        assert!(matches!(require_week_start(None), Err(PlanError::MissingWeekStart)));
        assert!(matches!(require_week_start(Some("  ")), Err(PlanError::MissingWeekStart)));
        assert_eq!(require_week_start(Some(WEEK)).unwrap(), WEEK);
    }

    #[tokio::test]
    async fn saving_twice_keeps_one_record_and_same_total() {
        let store = MemoryPlanStore::default();
        let owner = Uuid::new_v4();
        let days = json!({ "mon": { "lunch": "full", "dinner": "half" } });

        let first = save(&store, owner, days.clone()).await.unwrap();
        let second = save(&store, owner, days).await.unwrap();

        assert_eq!(store.plan_count(), 1);
        assert_eq!(first.total, 115);
        assert_eq!(second.total, first.total);
        assert_eq!(second.plan.id, first.plan.id);
    }

    #[tokio::test]
    async fn save_replaces_instead_of_merging() {
        let store = MemoryPlanStore::default();
        let owner = Uuid::new_v4();

        save(&store, owner, json!({ "mon": { "lunch": "full" } })).await.unwrap();
        let second = save(&store, owner, json!({ "tue": { "dinner": "half" } })).await.unwrap();

        assert_eq!(second.plan.days.mon.lunch, MealSelection::None);
        assert_eq!(second.plan.days.tue.dinner, MealSelection::Half);
        assert_eq!(second.total, 50);
    }

    #[tokio::test]
    async fn rejected_save_leaves_prior_plan_untouched() {
        let store = MemoryPlanStore::default();
        let owner = Uuid::new_v4();
        save(&store, owner, json!({ "wed": { "lunch": "half" } })).await.unwrap();

        let err = save(&store, owner, json!({ "wed": { "lunch": "large" } })).await.unwrap_err();
        assert!(matches!(err, PlanError::InvalidMeal { day: Weekday::Wed, slot: MealSlot::Lunch, .. }));

        let stored = store.find(owner, WEEK).await.unwrap().unwrap();
        assert_eq!(stored.days.wed.lunch, MealSelection::Half);
    }

    #[tokio::test]
    async fn missing_days_is_rejected_without_writing() {
        let store = MemoryPlanStore::default();
        let err = save_week_plan(&store, &PriceTable::default(), Uuid::new_v4(), Some(WEEK), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::MissingDays));
        assert_eq!(store.plan_count(), 0);
    }

    /// Lets a competing writer create the row between our update miss and insert.
    struct RacingStore {
        inner: MemoryPlanStore,
        raced: AtomicBool,
    }

    #[async_trait]
    impl PlanStore for RacingStore {
        async fn find(&self, owner: Uuid, week_start: &str) -> Result<Option<WeekPlan>, StoreError> {
            self.inner.find(owner, week_start).await
        }

        async fn insert(
            &self,
            owner: Uuid,
            week_start: &str,
            days: &WeekDays,
        ) -> Result<WeekPlan, StoreError> {
            if !self.raced.swap(true, Ordering::SeqCst) {
                self.inner
                    .insert(owner, week_start, &WeekDays::default())
                    .await?;
            }
            self.inner.insert(owner, week_start, days).await
        }

        async fn replace_days(
            &self,
            owner: Uuid,
            week_start: &str,
            days: &WeekDays,
        ) -> Result<Option<WeekPlan>, StoreError> {
            self.inner.replace_days(owner, week_start, days).await
        }

        async fn week_roster(&self, week_start: &str) -> Result<Vec<RosterEntry>, StoreError> {
            self.inner.week_roster(week_start).await
        }
    }

    #[tokio::test]
    async fn conflicting_insert_is_retried_as_update() {
        let store = RacingStore {
            inner: MemoryPlanStore::default(),
            raced: AtomicBool::new(false),
        };
        let owner = Uuid::new_v4();

        let saved = save(&store, owner, json!({ "sat": { "dinner": "full" } })).await.unwrap();

        assert_eq!(store.inner.plan_count(), 1);
        assert_eq!(saved.plan.days.sat.dinner, MealSelection::Full);
        assert_eq!(saved.total, 65);
    }

    #[tokio::test]
    async fn concurrent_first_saves_create_one_record() {
        let store = Arc::new(MemoryPlanStore::default());
        let owner = Uuid::new_v4();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    save(store.as_ref(), owner, json!({ "mon": { "lunch": "half" } })).await
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.await.unwrap().unwrap().total, 50);
        }
        assert_eq!(store.plan_count(), 1);
    }

    #[tokio::test]
    async fn my_week_without_plan_is_zero_default() {
        let store = MemoryPlanStore::default();
        let week = my_week(&store, &PriceTable::default(), Uuid::new_v4(), WEEK)
            .await
            .unwrap();
        assert!(week.plan.is_none());
        assert_eq!(week.days, WeekDays::default());
        assert_eq!(week.total, 0);
    }

    #[test]
    fn aggregate_keeps_unplanned_members() {
        let (asha, bilal, chen) = (member("asha"), member("bilal"), member("chen"));
        let mut full_monday = WeekDays::default();
        full_monday.mon.lunch = MealSelection::Full;
        full_monday.mon.dinner = MealSelection::Full;
        let mut half_friday = WeekDays::default();
        half_friday.fri.dinner = MealSelection::Half;

        let roster = vec![
            RosterEntry { member: asha, days: Some(full_monday) },
            RosterEntry { member: bilal.clone(), days: None },
            RosterEntry { member: chen, days: Some(half_friday) },
        ];
        let group = aggregate_week(WEEK, roster, &PriceTable::default());

        assert_eq!(group.members.len(), 3);
        let idle = &group.members[1];
        assert_eq!(idle.member, bilal);
        assert!(!idle.planned);
        assert_eq!(idle.total, 0);
        assert_eq!(idle.days, WeekDays::default());
        assert_eq!(group.members[0].total, 130);
        assert_eq!(group.members[2].total, 50);
        assert_eq!(group.group_total, 180);
    }

    #[tokio::test]
    async fn group_week_reads_roster_from_store() {
        let store = MemoryPlanStore::with_members(vec![member("asha"), member("bilal"), member("chen")]);
        let roster = store.week_roster(WEEK).await.unwrap();
        let (asha, chen) = (roster[0].member.id, roster[2].member.id);

        save(&store, asha, json!({ "mon": { "lunch": "full" } })).await.unwrap();
        save(&store, chen, json!({ "tue": { "lunch": "half" } })).await.unwrap();

        let group = group_week(&store, &PriceTable::default(), WEEK).await.unwrap();
        let totals: Vec<_> = group.members.iter().map(|m| (m.member.name.as_str(), m.total)).collect();
        assert_eq!(totals, [("asha", 65), ("bilal", 0), ("chen", 50)]);
        assert_eq!(group.group_total, 115);

        let other = group_week(&store, &PriceTable::default(), "2024-01-22").await.unwrap();
        assert_eq!(other.members.len(), 3);
        assert_eq!(other.group_total, 0);
    }
}
