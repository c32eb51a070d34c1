use time::{macros::format_description, Date, OffsetDateTime, UtcOffset};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("week offset {0} is out of range")]
pub struct WeekOutOfRange(pub i64);

/// Monday of the week containing `today`, shifted by `offset` weeks.
/// Sunday closes the week that started six days earlier.
pub fn monday_of(today: Date, offset: i64) -> Result<Date, WeekOutOfRange> {
    let since_monday = i64::from(today.weekday().number_days_from_monday());
    offset
        .checked_mul(7)
        .and_then(|shift| shift.checked_sub(since_monday))
        .and_then(|days| i64::from(today.to_julian_day()).checked_add(days))
        .and_then(|julian| i32::try_from(julian).ok())
        .and_then(|julian| Date::from_julian_day(julian).ok())
        .ok_or(WeekOutOfRange(offset))
}

/// `YYYY-MM-DD` key of the week `offset` weeks away from `now` as seen in `tz`.
pub fn week_start_at(now: OffsetDateTime, tz: UtcOffset, offset: i64) -> Result<String, WeekOutOfRange> {
    let today = now.to_offset(tz).date();
    let monday = monday_of(today, offset)?;
    monday
        .format(format_description!("[year]-[month]-[day]"))
        .map_err(|_| WeekOutOfRange(offset))
}

pub fn current_week_start(tz: UtcOffset, offset: i64) -> Result<String, WeekOutOfRange> {
    week_start_at(OffsetDateTime::now_utc(), tz, offset)
}
