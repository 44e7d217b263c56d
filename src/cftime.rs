//! Conversion between numeric CF time values and calendar dates.
//!
//! Model output stores time as "<unit> since <epoch>" offsets, usually in a
//! 365-day ("noleap") calendar. Dates are represented here as
//! [`chrono::NaiveDateTime`]; every no-leap date is also a valid Gregorian
//! date, so the same type works for both calendars as long as the arithmetic
//! is done in the right one.
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

use crate::{dataset::Variable, error::TimeError};

const SECONDS_PER_DAY: i64 = 86_400;

/// Cumulative day of year at the start of each month in a 365-day year.
const NOLEAP_MONTH_START: [i64; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Calendar {
    /// 365 days every year ("noleap" or "365_day")
    NoLeap,
    /// Gregorian calendar extended backwards ("standard", "gregorian", "proleptic_gregorian").
    /// Dates before 1582-10-15 are treated as proleptic Gregorian rather than Julian.
    ProlepticGregorian,
}

impl Calendar {
    pub fn parse(s: &str) -> Result<Self, TimeError> {
        match s.to_ascii_lowercase().as_str() {
            "noleap" | "365_day" => Ok(Self::NoLeap),
            "standard" | "gregorian" | "proleptic_gregorian" => Ok(Self::ProlepticGregorian),
            _ => Err(TimeError::UnsupportedCalendar(s.to_string())),
        }
    }

    /// The value to write in a CF `calendar` attribute.
    pub fn cf_name(&self) -> &'static str {
        match self {
            Calendar::NoLeap => "noleap",
            Calendar::ProlepticGregorian => "proleptic_gregorian",
        }
    }
}

/// A parsed CF time units string plus the calendar it applies to.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeUnits {
    seconds_per_unit: f64,
    epoch: NaiveDateTime,
    calendar: Calendar,
}

impl TimeUnits {
    /// Parse a units string such as "days since 0001-01-01 00:00:00".
    /// A missing calendar means the CF default, "standard".
    pub fn parse(units: &str, calendar: Option<&str>) -> Result<Self, TimeError> {
        let bad_units = || TimeError::BadUnits(units.to_string());
        let calendar = calendar
            .map(Calendar::parse)
            .transpose()?
            .unwrap_or(Calendar::ProlepticGregorian);

        let (step, reference) = units.split_once(" since ").ok_or_else(bad_units)?;
        let seconds_per_unit = match step.trim().to_ascii_lowercase().as_str() {
            "days" | "day" | "d" => 86_400.0,
            "hours" | "hour" | "h" => 3_600.0,
            "minutes" | "minute" | "min" => 60.0,
            "seconds" | "second" | "s" => 1.0,
            _ => return Err(bad_units()),
        };

        let epoch = parse_reference_time(reference.trim()).ok_or_else(bad_units)?;
        if calendar == Calendar::NoLeap && epoch.month() == 2 && epoch.day() == 29 {
            return Err(TimeError::InvalidNoLeapDate(epoch.year(), 2, 29));
        }

        Ok(Self { seconds_per_unit, epoch, calendar })
    }

    /// Read the `units` and `calendar` attributes of a time variable.
    pub fn from_variable(var: &Variable) -> Result<Self, TimeError> {
        let units = var.units().ok_or(TimeError::MissingAttribute("units"))?;
        Self::parse(units, var.attr_str("calendar"))
    }

    /// The same units interpreted in a different calendar.
    pub fn with_calendar(&self, calendar: Calendar) -> Self {
        Self { calendar, ..self.clone() }
    }

    pub fn calendar(&self) -> Calendar {
        self.calendar
    }

    /// Convert a numeric offset to a date, to the nearest millisecond.
    pub fn decode(&self, value: f64) -> Result<NaiveDateTime, TimeError> {
        let offset_ms = value * self.seconds_per_unit * 1000.0;
        if !offset_ms.is_finite() || offset_ms.abs() > i64::MAX as f64 {
            return Err(TimeError::OutOfRange(value));
        }
        let offset_ms = offset_ms.round() as i64;

        match self.calendar {
            Calendar::ProlepticGregorian => TimeDelta::try_milliseconds(offset_ms)
                .and_then(|delta| self.epoch.checked_add_signed(delta))
                .ok_or(TimeError::OutOfRange(value)),
            Calendar::NoLeap => {
                let total_ms = noleap_ms(&self.epoch)
                    .checked_add(offset_ms)
                    .ok_or(TimeError::OutOfRange(value))?;
                noleap_from_ms(total_ms).ok_or(TimeError::OutOfRange(value))
            }
        }
    }

    /// Convert a date to a numeric offset in these units.
    pub fn encode(&self, datetime: NaiveDateTime) -> Result<f64, TimeError> {
        let offset_ms = match self.calendar {
            Calendar::ProlepticGregorian => (datetime - self.epoch).num_milliseconds(),
            Calendar::NoLeap => {
                if datetime.month() == 2 && datetime.day() == 29 {
                    return Err(TimeError::InvalidNoLeapDate(datetime.year(), 2, 29));
                }
                noleap_ms(&datetime) - noleap_ms(&self.epoch)
            }
        };
        Ok(offset_ms as f64 / 1000.0 / self.seconds_per_unit)
    }
}

/// Parse the part of a CF units string after "since": a date, optionally
/// followed by a time of day and a "UTC"/"Z" suffix.
fn parse_reference_time(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim_end_matches(" UTC").trim_end_matches('Z');
    let (date_part, time_part) = match s.split_once(|c| c == ' ' || c == 'T') {
        Some((d, t)) => (d, Some(t.trim())),
        None => (s, None),
    };

    let mut ymd = date_part.splitn(3, '-');
    let year: i32 = ymd.next()?.parse().ok()?;
    let month: u32 = ymd.next()?.parse().ok()?;
    let day: u32 = ymd.next()?.parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let (hour, minute, second) = match time_part {
        Some(t) if !t.is_empty() => {
            let mut hms = t.splitn(3, ':');
            let hour: u32 = hms.next()?.parse().ok()?;
            let minute: u32 = hms.next().map(|m| m.parse::<u32>()).transpose().ok()?.unwrap_or(0);
            let second: f64 = hms.next().map(|s| s.parse::<f64>()).transpose().ok()?.unwrap_or(0.0);
            (hour, minute, second as u32)
        }
        _ => (0, 0, 0),
    };

    date.and_hms_opt(hour, minute, second)
}

/// Milliseconds since 0000-01-01 in a 365-day calendar.
fn noleap_ms(dt: &NaiveDateTime) -> i64 {
    let days = i64::from(dt.year()) * 365
        + NOLEAP_MONTH_START[dt.month0() as usize]
        + i64::from(dt.day0());
    let seconds = days * SECONDS_PER_DAY + i64::from(dt.num_seconds_from_midnight());
    seconds * 1000 + i64::from(dt.nanosecond() / 1_000_000)
}

fn noleap_from_ms(total_ms: i64) -> Option<NaiveDateTime> {
    let ms_per_day = SECONDS_PER_DAY * 1000;
    let days = total_ms.div_euclid(ms_per_day);
    let ms_of_day = total_ms.rem_euclid(ms_per_day);

    let year = i32::try_from(days.div_euclid(365)).ok()?;
    let day_of_year = days.rem_euclid(365);
    let month0 = NOLEAP_MONTH_START
        .iter()
        .rposition(|&start| start <= day_of_year)?;
    let day0 = day_of_year - NOLEAP_MONTH_START[month0];

    let date = NaiveDate::from_ymd_opt(year, month0 as u32 + 1, day0 as u32 + 1)?;
    let seconds = (ms_of_day / 1000) as u32;
    let millis = (ms_of_day % 1000) as u32;
    date.and_hms_milli_opt(seconds / 3600, (seconds % 3600) / 60, seconds % 60, millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[rstest]
    #[case("days since 0001-01-01 00:00:00", 86_400.0, ymd(1, 1, 1))]
    #[case("hours since 1850-01-01", 3_600.0, ymd(1850, 1, 1))]
    #[case("seconds since 2000-01-01T00:00:00Z", 1.0, ymd(2000, 1, 1))]
    fn test_parse_units(#[case] units: &str, #[case] seconds: f64, #[case] epoch: NaiveDateTime) {
        let parsed = TimeUnits::parse(units, Some("noleap")).unwrap();
        assert_eq!(parsed.seconds_per_unit, seconds);
        assert_eq!(parsed.epoch, epoch);
        assert_eq!(parsed.calendar, Calendar::NoLeap);
    }

    #[rstest]
    #[case("days after 1850-01-01")]
    #[case("fortnights since 1850-01-01")]
    #[case("days since yesterday")]
    fn test_bad_units(#[case] units: &str) {
        assert!(matches!(TimeUnits::parse(units, None), Err(TimeError::BadUnits(_))));
    }

    #[test]
    fn test_unsupported_calendar() {
        let res = TimeUnits::parse("days since 1850-01-01", Some("360_day"));
        assert!(matches!(res, Err(TimeError::UnsupportedCalendar(_))));
    }

    #[test]
    fn test_noleap_skips_feb_29() {
        let units = TimeUnits::parse("days since 2000-02-28", Some("noleap")).unwrap();
        assert_eq!(units.decode(1.0).unwrap(), ymd(2000, 3, 1));

        let units = units.with_calendar(Calendar::ProlepticGregorian);
        assert_eq!(units.decode(1.0).unwrap(), ymd(2000, 2, 29));
    }

    #[test]
    fn test_noleap_year_length() {
        let units = TimeUnits::parse("days since 0001-01-01 00:00:00", Some("noleap")).unwrap();
        // 2000 years of 365 days
        assert_eq!(units.decode(730_000.0).unwrap(), ymd(2001, 1, 1));
        assert_eq!(units.encode(ymd(2001, 1, 1)).unwrap(), 730_000.0);
        assert_eq!(units.decode(730_014.5).unwrap(), ymd(2001, 1, 15) + TimeDelta::hours(12));
    }

    #[test]
    fn test_noleap_rejects_feb_29() {
        let units = TimeUnits::parse("days since 1850-01-01", Some("noleap")).unwrap();
        assert!(matches!(
            units.encode(ymd(2000, 2, 29)),
            Err(TimeError::InvalidNoLeapDate(2000, 2, 29))
        ));
    }

    #[test]
    fn test_negative_offsets() {
        let units = TimeUnits::parse("days since 1850-01-01", Some("noleap")).unwrap();
        assert_eq!(units.decode(-365.0).unwrap(), ymd(1849, 1, 1));
        approx::assert_abs_diff_eq!(units.encode(ymd(1849, 12, 31)).unwrap(), -1.0);
    }
}
