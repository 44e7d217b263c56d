//! Correction of the time coordinate in raw monthly history files.
//!
//! Raw monthly (h0) files stamp each average at the end of its averaging
//! interval, which puts January's mean on February 1st. The interval bounds
//! are correct, so the representative time is recomputed from the start
//! boundary: the 15th of the month the interval starts in.
use std::{fmt::Display, str::FromStr};

use chrono::{Datelike, NaiveDate, TimeDelta};
use ndarray::{Array1, Array2, Axis};

use crate::{
    cftime::{Calendar, TimeUnits},
    dataset::{Dataset, Variable, TIME_DIM},
    error::{DatasetError, TimeError},
    nc_utils::NcArray,
};

/// Names of the time bounds variable in CAM (`time_bnds`) and CLM (`time_bounds`) output.
pub const BOUNDS_NAMES: [&str; 2] = ["time_bnds", "time_bounds"];

/// How the corrected time values are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeType {
    /// Dates in the 365-day calendar: day 15 of the start month.
    DatetimeNoLeap,
    /// Standard timestamps: start boundary plus 14 days, stored in a
    /// proleptic Gregorian calendar.
    Datetime64,
}

impl FromStr for TimeType {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DatetimeNoLeap" => Ok(Self::DatetimeNoLeap),
            "datetime64" => Ok(Self::Datetime64),
            _ => Err(TimeError::UnsupportedTimeType(s.to_string())),
        }
    }
}

impl Display for TimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeType::DatetimeNoLeap => write!(f, "DatetimeNoLeap"),
            TimeType::Datetime64 => write!(f, "datetime64"),
        }
    }
}

/// Return a copy of `ds` whose `time` coordinate is recomputed from the
/// start of each time bounds interval. The time variable keeps its
/// attributes, except `calendar`, which is set to match `time_type`.
/// The bounds keep their name and attributes but are re-encoded in the
/// new calendar, so both decode consistently with the coordinate's units.
pub fn fix_time(ds: &Dataset, time_type: TimeType) -> Result<Dataset, TimeError> {
    let time = ds.get(TIME_DIM)?;
    let bounds_name = find_bounds(ds, time)?;
    let bounds = ds.get(bounds_name)?;

    let time_units = TimeUnits::from_variable(time)?;
    // CF lets bounds inherit units and calendar from their coordinate
    let bounds_units = match bounds.units() {
        Some(units) => TimeUnits::parse(
            units,
            bounds.attr_str("calendar").or_else(|| time.attr_str("calendar")),
        )?,
        None => time_units.clone(),
    };

    if bounds.dims.len() != 2 || bounds.axis_of(TIME_DIM) != Some(0) || bounds.data.len_of(1) < 2 {
        return Err(TimeError::BadBounds(bounds_name.to_string()));
    }
    let bounds_values = bounds
        .data
        .to_f64()
        .ok_or_else(|| DatasetError::NotNumeric(bounds_name.to_string()))?;
    let starts = bounds_values.index_axis(Axis(1), 0);
    let ends = bounds_values.index_axis(Axis(1), 1);

    let out_units = match time_type {
        TimeType::DatetimeNoLeap => time_units.with_calendar(Calendar::NoLeap),
        TimeType::Datetime64 => time_units.with_calendar(Calendar::ProlepticGregorian),
    };

    let mut new_times = Vec::with_capacity(starts.len());
    let mut new_bounds = Array2::<f64>::zeros((starts.len(), bounds_values.len_of(Axis(1))));
    for (i, row) in bounds_values.axis_iter(Axis(0)).enumerate() {
        for (j, &value) in row.iter().enumerate() {
            new_bounds[[i, j]] = out_units.encode(bounds_units.decode(value)?)?;
        }
    }

    for (&start, &end) in starts.iter().zip(ends.iter()) {
        let start = bounds_units.decode(start)?;
        let end = bounds_units.decode(end)?;
        let mid = match time_type {
            TimeType::DatetimeNoLeap => NaiveDate::from_ymd_opt(start.year(), start.month(), 15)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .ok_or(TimeError::InvalidNoLeapDate(start.year(), start.month(), 15))?,
            TimeType::Datetime64 => start + TimeDelta::days(14),
        };

        if mid <= start || mid >= end {
            log::warn!("Corrected time {mid} is outside its bounds interval ({start}, {end})");
        }
        new_times.push(out_units.encode(mid)?);
    }

    let mut new_time = Variable {
        dims: time.dims.clone(),
        data: NcArray::F64(Array1::from(new_times).into_dyn()),
        attrs: time.attrs.clone(),
    };
    new_time.set_attr("calendar", out_units.calendar().cf_name());

    // Bounds without their own units follow the coordinate, so they have to
    // move to the new calendar with it.
    let mut new_bounds_var = Variable {
        dims: bounds.dims.clone(),
        data: NcArray::F64(new_bounds.into_dyn()),
        attrs: bounds.attrs.clone(),
    };
    if let Some(units) = time.units() {
        if bounds.attrs.contains_key("units") {
            new_bounds_var.set_attr("units", units);
        }
    }
    if bounds.attrs.contains_key("calendar") {
        new_bounds_var.set_attr("calendar", out_units.calendar().cf_name());
    }

    let mut out = ds.clone();
    out.insert_variable(TIME_DIM, new_time)?;
    out.insert_variable(bounds_name, new_bounds_var)?;
    Ok(out)
}

/// Find the bounds variable: the one named by the time coordinate's `bounds`
/// attribute if present, otherwise the first of [`BOUNDS_NAMES`] in the dataset.
fn find_bounds<'a>(ds: &'a Dataset, time: &'a Variable) -> Result<&'a str, TimeError> {
    if let Some(name) = time.attr_str("bounds") {
        if ds.contains(name) {
            return Ok(name);
        }
    }

    BOUNDS_NAMES
        .into_iter()
        .find(|name| ds.contains(name))
        .ok_or_else(|| TimeError::MissingBounds(BOUNDS_NAMES.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::monthly_dataset;
    use chrono::NaiveDateTime;
    use rstest::rstest;

    fn decoded_times(ds: &Dataset) -> Vec<NaiveDateTime> {
        let time = ds.get(TIME_DIM).unwrap();
        let units = TimeUnits::from_variable(time).unwrap();
        time.data
            .to_f64()
            .unwrap()
            .iter()
            .map(|&v| units.decode(v).unwrap())
            .collect()
    }

    #[rstest]
    fn test_mid_month(
        #[values(TimeType::DatetimeNoLeap, TimeType::Datetime64)] time_type: TimeType,
        #[values(1850, 1999, 2012)] start_year: i32,
    ) {
        let ds = monthly_dataset(start_year, 24);
        let fixed = fix_time(&ds, time_type).unwrap();
        let times = decoded_times(&fixed);
        assert_eq!(times.len(), 24);
        for (i, t) in times.iter().enumerate() {
            assert_eq!(t.year(), start_year + (i / 12) as i32, "wrong year at step {i}");
            assert_eq!(t.month(), (i % 12) as u32 + 1, "wrong month at step {i}");
            assert_eq!(t.day(), 15, "wrong day at step {i}");
        }
    }

    #[test]
    fn test_raw_times_are_shifted() {
        // Sanity check of the synthetic input: the raw stamps fall in the next month
        let ds = monthly_dataset(1850, 2);
        let times = decoded_times(&ds);
        assert_eq!(times[0].month(), 2);
        assert_eq!(times[1].month(), 3);
    }

    #[test]
    fn test_attributes_preserved() {
        let ds = monthly_dataset(1850, 3);
        let fixed = fix_time(&ds, TimeType::Datetime64).unwrap();
        let time = fixed.get(TIME_DIM).unwrap();
        assert_eq!(time.long_name(), Some("time"));
        assert_eq!(time.attr_str("bounds"), Some("time_bnds"));
        assert_eq!(time.attr_str("calendar"), Some("proleptic_gregorian"));
        // the input is not modified
        assert_eq!(ds.get(TIME_DIM).unwrap().attr_str("calendar"), Some("noleap"));
        let bounds = fixed.get("time_bnds").unwrap();
        assert_eq!(bounds.attrs, ds.get("time_bnds").unwrap().attrs);
        assert_eq!(bounds.dims, ds.get("time_bnds").unwrap().dims);
    }

    #[rstest]
    fn test_bounds_follow_new_calendar(
        #[values(TimeType::DatetimeNoLeap, TimeType::Datetime64)] time_type: TimeType,
        #[values(1850, 2000, 2012)] start_year: i32,
    ) {
        let ds = monthly_dataset(start_year, 14);
        let fixed = fix_time(&ds, time_type).unwrap();

        // Bounds carry no units of their own, so they decode with the coordinate's
        let units = TimeUnits::from_variable(fixed.get(TIME_DIM).unwrap()).unwrap();
        let bounds = fixed.get("time_bnds").unwrap().data.to_f64().unwrap();
        let times = decoded_times(&fixed);
        for (i, t) in times.iter().enumerate() {
            let start = units.decode(bounds[[i, 0]]).unwrap();
            let end = units.decode(bounds[[i, 1]]).unwrap();
            assert!(start < *t && *t < end, "time {t} not in ({start}, {end})");
            assert_eq!((start.year(), start.month(), start.day()), (t.year(), t.month(), 1));
        }
    }

    #[test]
    fn test_noleap_bounds_unchanged() {
        let ds = monthly_dataset(2000, 6);
        let fixed = fix_time(&ds, TimeType::DatetimeNoLeap).unwrap();
        assert_eq!(fixed.get("time_bnds").unwrap(), ds.get("time_bnds").unwrap());
    }

    #[test]
    fn test_bounds_own_attributes_updated() {
        let mut ds = monthly_dataset(2000, 2);
        let bounds = ds.variable_mut("time_bnds").unwrap();
        bounds.set_attr("units", "hours since 1850-01-01");
        bounds.set_attr("calendar", "noleap");
        // same instants as the coordinate's day-based values
        let hours = bounds.data.to_f64().unwrap().mapv(|d| d * 24.0);
        bounds.data = NcArray::F64(hours);

        let fixed = fix_time(&ds, TimeType::Datetime64).unwrap();
        let bounds = fixed.get("time_bnds").unwrap();
        assert_eq!(bounds.units(), Some(crate::test_utils::TIME_UNITS));
        assert_eq!(bounds.attr_str("calendar"), Some("proleptic_gregorian"));
        let units = TimeUnits::from_variable(bounds).unwrap();
        let start = units.decode(bounds.data.to_f64().unwrap()[[1, 0]]).unwrap();
        assert_eq!((start.year(), start.month(), start.day()), (2000, 2, 1));
    }

    #[test]
    fn test_land_bounds_name() {
        let ds = monthly_dataset(1850, 3);
        let mut bounds = ds.get("time_bnds").unwrap().clone();
        bounds.dims = vec!["time".to_string(), "hist_interval".to_string()];
        let mut time = ds.get(TIME_DIM).unwrap().clone();
        time.attrs.shift_remove("bounds");

        let mut lnd = Dataset::new();
        lnd.insert_variable("time", time).unwrap();
        lnd.insert_variable("time_bounds", bounds).unwrap();

        let fixed = fix_time(&lnd, TimeType::DatetimeNoLeap).unwrap();
        assert!(fixed.contains("time_bounds"));
        assert!(!fixed.contains("time_bnds"));
        assert_eq!(decoded_times(&fixed)[2].month(), 3);
    }

    #[test]
    fn test_missing_bounds() {
        let ds = monthly_dataset(1850, 3);
        let only_time = ds.select(&["time"]).unwrap();
        let res = fix_time(&only_time, TimeType::Datetime64);
        assert!(matches!(res, Err(TimeError::MissingBounds(_))));
    }

    #[rstest]
    #[case("DatetimeNoLeap", Some(TimeType::DatetimeNoLeap))]
    #[case("datetime64", Some(TimeType::Datetime64))]
    #[case("cftime", None)]
    #[case("", None)]
    fn test_parse_time_type(#[case] s: &str, #[case] expected: Option<TimeType>) {
        let parsed = s.parse::<TimeType>();
        match expected {
            Some(tt) => assert_eq!(parsed.unwrap(), tt),
            None => assert!(matches!(parsed, Err(TimeError::UnsupportedTimeType(_)))),
        }
    }
}
