//! Hourly calendar arithmetic for a single target year.

use chrono::{Datelike, NaiveDate, Weekday};

use gct_core::{GctError, GctResult};

pub const HOURS_COMMON: usize = 8760;
pub const HOURS_LEAP: usize = 8784;

pub fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

pub fn hours_in_year(year: i32) -> usize {
    if is_leap_year(year) {
        HOURS_LEAP
    } else {
        HOURS_COMMON
    }
}

pub fn days_in_month(year: i32, month: u32) -> GctResult<u32> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| GctError::Validation(format!("invalid month {month}")))?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .ok_or_else(|| GctError::Validation(format!("invalid month {month}")))?;
    Ok((next - first).num_days() as u32)
}

/// Calendar position of one hour slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourStamp {
    pub month: u32,
    pub day: u32,
    /// Hour of day, 1-based (1..=24) to match source period columns.
    pub hour: u32,
    /// ISO weekday, 1 = Monday.
    pub weekday: u32,
}

/// Stamps for every hour of `year`, in order. Index 0 is January 1, hour 1.
pub fn year_stamps(year: i32) -> GctResult<Vec<HourStamp>> {
    let first = NaiveDate::from_ymd_opt(year, 1, 1)
        .ok_or_else(|| GctError::Validation(format!("invalid year {year}")))?;
    let mut stamps = Vec::with_capacity(hours_in_year(year));
    let mut date = first;
    while date.year() == year {
        let weekday = match date.weekday() {
            Weekday::Mon => 1,
            Weekday::Tue => 2,
            Weekday::Wed => 3,
            Weekday::Thu => 4,
            Weekday::Fri => 5,
            Weekday::Sat => 6,
            Weekday::Sun => 7,
        };
        for hour in 1..=24 {
            stamps.push(HourStamp {
                month: date.month(),
                day: date.day(),
                hour,
                weekday,
            });
        }
        date = date
            .succ_opt()
            .ok_or_else(|| GctError::Validation(format!("calendar overflow after {date}")))?;
    }
    Ok(stamps)
}

/// Zero-based slot of (month, day, hour-of-day 1..=24) within `year`.
pub fn hour_slot(year: i32, month: u32, day: u32, hour: u32) -> GctResult<usize> {
    if !(1..=24).contains(&hour) {
        return Err(GctError::Validation(format!("hour {hour} outside 1..=24")));
    }
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        GctError::Validation(format!("invalid date {year}-{month:02}-{day:02}"))
    })?;
    let day_of_year = date.ordinal0() as usize;
    Ok(day_of_year * 24 + (hour as usize - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_lengths() {
        assert_eq!(hours_in_year(2030), HOURS_COMMON);
        assert_eq!(hours_in_year(2032), HOURS_LEAP);
    }

    #[test]
    fn test_hour_slot() {
        assert_eq!(hour_slot(2030, 1, 1, 1).unwrap(), 0);
        assert_eq!(hour_slot(2030, 1, 2, 1).unwrap(), 24);
        // Feb 28 starts at hour 1392 regardless of leap status.
        assert_eq!(hour_slot(2032, 2, 28, 1).unwrap(), 1392);
        assert_eq!(hour_slot(2032, 2, 29, 1).unwrap(), 1416);
        assert!(hour_slot(2030, 2, 29, 1).is_err());
        assert!(hour_slot(2030, 1, 1, 25).is_err());
    }

    #[test]
    fn test_year_stamps_cover_year() {
        let stamps = year_stamps(2032).unwrap();
        assert_eq!(stamps.len(), HOURS_LEAP);
        assert_eq!(stamps[0].month, 1);
        assert_eq!(stamps[0].hour, 1);
        let last = stamps[stamps.len() - 1];
        assert_eq!((last.month, last.day, last.hour), (12, 31, 24));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2032, 2).unwrap(), 29);
        assert_eq!(days_in_month(2030, 2).unwrap(), 28);
        assert!(days_in_month(2030, 13).is_err());
    }
}
