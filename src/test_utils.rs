//! Synthetic datasets shaped like raw monthly model history output.
use ndarray::{Array1, Array2, ArrayD, IxDyn};

use crate::{
    dataset::{Dataset, Variable},
    nc_utils::NcArray,
};

const MONTH_START: [f64; 13] = [0., 31., 59., 90., 120., 151., 181., 212., 243., 273., 304., 334., 365.];

pub(crate) const TIME_UNITS: &str = "days since 1850-01-01 00:00:00";

/// Days since 1850-01-01 (no-leap) of the first instant of `month0` (0-based) in `year`.
pub(crate) fn noleap_days(year: i32, month0: usize) -> f64 {
    f64::from(year - 1850) * 365.0 + MONTH_START[month0]
}

/// A dataset with `ntime` consecutive months starting in January of `start_year`.
///
/// Like raw CAM history files, `time` is stamped at the *end* of each averaging
/// interval (so it falls in the following month) while `time_bnds` holds the
/// correct interval.
pub(crate) fn monthly_dataset(start_year: i32, ntime: usize) -> Dataset {
    let mut bounds = Array2::<f64>::zeros((ntime, 2));
    for i in 0..ntime {
        let year = start_year + (i / 12) as i32;
        let month0 = i % 12;
        bounds[[i, 0]] = noleap_days(year, month0);
        bounds[[i, 1]] = f64::from(year - 1850) * 365.0 + MONTH_START[month0 + 1];
    }
    let times: Array1<f64> = bounds.column(1).to_owned();

    let time = Variable::new(&["time"], NcArray::F64(times.into_dyn()))
        .with_attr("long_name", "time")
        .with_attr("units", TIME_UNITS)
        .with_attr("calendar", "noleap")
        .with_attr("bounds", "time_bnds");
    let time_bnds = Variable::new(&["time", "nbnd"], NcArray::F64(bounds.into_dyn()))
        .with_attr("long_name", "time interval endpoints");

    let mut ds = Dataset::new();
    ds.insert_variable("time", time).unwrap();
    ds.insert_variable("time_bnds", time_bnds).unwrap();
    ds
}

/// A single-precision variable on the time dimension, every element equal to `value`.
pub(crate) fn scalar_field(ntime: usize, value: f32, units: &str) -> Variable {
    let data = ArrayD::from_elem(IxDyn(&[ntime]), value);
    Variable::new(&["time"], NcArray::F32(data))
        .with_attr("units", units)
        .with_attr("long_name", "synthetic field")
}

/// Add `names` to `ds` as [`scalar_field`]s with value 1.
pub(crate) fn with_fields(mut ds: Dataset, names: &[&str]) -> Dataset {
    let ntime = ds.dim_len("time").unwrap_or(1);
    for name in names {
        ds.insert_variable(*name, scalar_field(ntime, 1.0, "1")).unwrap();
    }
    ds
}
