use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Portion chosen for a single meal slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealSelection {
    #[default]
    None,
    Half,
    Full,
}

impl MealSelection {
    pub const ALL: [MealSelection; 3] = [Self::None, Self::Half, Self::Full];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Half => "half",
            Self::Full => "full",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown meal selection {0:?}")]
pub struct UnknownSelection(pub String);

impl FromStr for MealSelection {
    type Err = UnknownSelection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownSelection(s.to_string()))
    }
}

impl fmt::Display for MealSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service days. Sunday is not offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl Weekday {
    pub const ALL: [Weekday; 6] = [
        Self::Mon,
        Self::Tue,
        Self::Wed,
        Self::Thu,
        Self::Fri,
        Self::Sat,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Mon => "mon",
            Self::Tue => "tue",
            Self::Wed => "wed",
            Self::Thu => "thu",
            Self::Fri => "fri",
            Self::Sat => "sat",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MealSlot {
    Lunch,
    Dinner,
}

impl MealSlot {
    pub const ALL: [MealSlot; 2] = [Self::Lunch, Self::Dinner];

    pub fn key(self) -> &'static str {
        match self {
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
        }
    }
}

impl fmt::Display for MealSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DayPlan {
    pub lunch: MealSelection,
    pub dinner: MealSelection,
}

impl DayPlan {
    pub fn slot_mut(&mut self, slot: MealSlot) -> &mut MealSelection {
        match slot {
            MealSlot::Lunch => &mut self.lunch,
            MealSlot::Dinner => &mut self.dinner,
        }
    }
}

/// The six service days of one week. A day missing from stored or submitted
/// JSON decodes as `{none, none}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeekDays {
    pub mon: DayPlan,
    pub tue: DayPlan,
    pub wed: DayPlan,
    pub thu: DayPlan,
    pub fri: DayPlan,
    pub sat: DayPlan,
}

impl WeekDays {
    pub fn day(&self, day: Weekday) -> &DayPlan {
        match day {
            Weekday::Mon => &self.mon,
            Weekday::Tue => &self.tue,
            Weekday::Wed => &self.wed,
            Weekday::Thu => &self.thu,
            Weekday::Fri => &self.fri,
            Weekday::Sat => &self.sat,
        }
    }

    pub fn day_mut(&mut self, day: Weekday) -> &mut DayPlan {
        match day {
            Weekday::Mon => &mut self.mon,
            Weekday::Tue => &mut self.tue,
            Weekday::Wed => &mut self.wed,
            Weekday::Thu => &mut self.thu,
            Weekday::Fri => &mut self.fri,
            Weekday::Sat => &mut self.sat,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Weekday, &DayPlan)> + '_ {
        Weekday::ALL.into_iter().map(move |d| (d, self.day(d)))
    }
}

/// A member's stored plan for one week, unique per `(owner, week_start)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekPlan {
    pub id: Uuid,
    pub owner: Uuid,
    pub week_start: String,
    pub days: WeekDays,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Public view of a registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

/// One roster line for a week: every member, with their days if they planned.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    pub member: Member,
    pub days: Option<WeekDays>,
}
