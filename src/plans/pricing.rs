use serde::{Deserialize, Serialize};

use super::model::{DayPlan, MealSelection, WeekDays};

/// Price per meal portion, in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceTable {
    pub half: u32,
    pub full: u32,
}

impl Default for PriceTable {
    fn default() -> Self {
        Self { half: 50, full: 65 }
    }
}

impl PriceTable {
    pub fn price(&self, meal: MealSelection) -> u32 {
        match meal {
            MealSelection::None => 0,
            MealSelection::Half => self.half,
            MealSelection::Full => self.full,
        }
    }

    pub fn day_cost(&self, day: &DayPlan) -> u64 {
        u64::from(self.price(day.lunch)) + u64::from(self.price(day.dinner))
    }

    /// Sum of lunch and dinner over Monday to Saturday. Widened to `u64` so
    /// twelve maximal prices still fit.
    pub fn total(&self, days: &WeekDays) -> u64 {
        days.iter().map(|(_, day)| self.day_cost(day)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plans::model::{MealSlot, Weekday};

    fn every_meal(meal: MealSelection) -> WeekDays {
        let mut days = WeekDays::default();
        for d in Weekday::ALL {
            for s in MealSlot::ALL {
                *days.day_mut(d).slot_mut(s) = meal;
            }
        }
        days
    }

    #[test]
    fn default_prices() {
        let p = PriceTable::default();
        assert_eq!(p.price(MealSelection::None), 0);
        assert_eq!(p.price(MealSelection::Half), 50);
        assert_eq!(p.price(MealSelection::Full), 65);
    }

    #[test]
    fn empty_week_costs_nothing() {
        assert_eq!(PriceTable::default().total(&WeekDays::default()), 0);
    }

    #[test]
    fn full_week_costs_780() {
        let total = PriceTable::default().total(&every_meal(MealSelection::Full));
        assert_eq!(total, 6 * 2 * 65);
        assert_eq!(total, 780);
    }

    #[test]
    fn mixed_week_sums_each_slot() {
        let mut days = WeekDays::default();
        days.mon.lunch = MealSelection::Full;
        days.wed.dinner = MealSelection::Half;
        days.sat.lunch = MealSelection::Half;
        days.sat.dinner = MealSelection::Full;
        assert_eq!(PriceTable::default().total(&days), 65 + 50 + 50 + 65);
    }

    #[test]
    fn custom_table_changes_totals() {
        let table = PriceTable { half: 40, full: 70 };
        assert_eq!(table.total(&every_meal(MealSelection::Half)), 12 * 40);
        assert_eq!(table.total(&every_meal(MealSelection::Full)), 12 * 70);
    }

    #[test]
    fn large_prices_do_not_overflow() {
        let table = PriceTable {
            half: 50,
            full: 400_000_000,
        };
        assert_eq!(table.total(&every_meal(MealSelection::Full)), 4_800_000_000);

        let max = PriceTable {
            half: u32::MAX,
            full: u32::MAX,
        };
        assert_eq!(max.total(&every_meal(MealSelection::Half)), 12 * u64::from(u32::MAX));
    }
}
