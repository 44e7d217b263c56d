//! Build one time series dataset from a case's raw history files.
use std::path::{Path, PathBuf};

use error_stack::ResultExt;

use crate::{
    catalog::{bvoc_enabled, variables_by_component, Component},
    dataset::{Dataset, TIME_DIM},
    error::{BuildError, DatasetError},
    time_fix::{fix_time, TimeType},
};

/// The monthly mean history stream, the only one the time correction applies to.
pub const MONTHLY_HISTORY: &str = "h0";

/// Options controlling how [`create_dataset`] post-processes the merged files.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// History stream tag in the file names, e.g. "h0".
    pub history_field: String,
    /// Return every variable instead of the catalog selection.
    pub full_dataset: bool,
    /// How to correct the time coordinate of monthly files, `None` to leave it as is.
    pub fix_timestamp: Option<TimeType>,
    /// Number of leading time steps to drop.
    pub spinup_months: usize,
    /// Keep the hybrid pressure coordinate variables (atmosphere only).
    pub pressure_vars: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            history_field: MONTHLY_HISTORY.to_string(),
            full_dataset: false,
            fix_timestamp: Some(TimeType::Datetime64),
            spinup_months: 12,
            pressure_vars: false,
        }
    }
}

/// The glob pattern matching a case's history files:
/// `<raw_path>/<case>/<comp>/hist/<case>.<model>.<history_field>.*.nc`
pub fn input_file_pattern(raw_path: &Path, case: &str, comp: Component, history_field: &str) -> String {
    raw_path
        .join(case)
        .join(comp.dir_name())
        .join("hist")
        .join(format!("{case}.{}.{history_field}.*.nc", comp.model_name()))
        .to_string_lossy()
        .into_owned()
}

/// List the history files of a case, sorted by name. With the model's
/// `YYYY-MM` date stamps in the file names this is chronological order.
pub fn discover_files(
    raw_path: &Path,
    case: &str,
    comp: Component,
    history_field: &str,
) -> error_stack::Result<Vec<PathBuf>, BuildError> {
    let pattern = input_file_pattern(raw_path, case, comp, history_field);
    let matches = glob::glob(&pattern)
        .change_context_lazy(|| BuildError::BadPattern(pattern.clone()))?;

    let mut files = vec![];
    for entry in matches {
        let entry = entry.change_context(BuildError::Listing)?;
        files.push(entry);
    }

    if files.is_empty() {
        return Err(BuildError::NoInputFiles(pattern).into());
    }
    files.sort();
    log::info!("Files found: {} matching {pattern}", files.len());
    Ok(files)
}

/// The variables kept for `comp` when not returning the full dataset:
/// the always-included ones, the pressure variables if requested, then
/// every catalog variable. Land cases with "OFF" in the name leave out the
/// biogenic emission variables.
pub fn selected_variables(case: &str, comp: Component, pressure_vars: bool) -> Vec<String> {
    let bvoc = match comp {
        Component::Atm => true,
        Component::Lnd => bvoc_enabled(case),
    };
    let mut variables: Vec<String> = comp
        .always_include(pressure_vars)
        .into_iter()
        .map(String::from)
        .collect();
    variables.extend(variables_by_component(comp, bvoc).flattened());
    variables
}

/// Apply the steps that follow merging: time correction (monthly stream only),
/// spin-up removal and variable selection.
pub fn postprocess_merged(
    ds: Dataset,
    case: &str,
    comp: Component,
    opts: &BuildOptions,
) -> error_stack::Result<Dataset, BuildError> {
    let ds = match opts.fix_timestamp {
        Some(time_type) if opts.history_field == MONTHLY_HISTORY => {
            log::info!("Correcting the time coordinate as {time_type}");
            fix_time(&ds, time_type).change_context(BuildError::TimeFix)?
        }
        _ => ds,
    };

    let ds = drop_spinup(&ds, opts.spinup_months)?;
    log::info!("Postprocessing completed");

    if opts.full_dataset {
        return Ok(ds);
    }

    let variables = selected_variables(case, comp, opts.pressure_vars);
    ds.select(&variables).change_context(BuildError::Selection)
}

/// Remove the first `spinup_months` time steps.
pub fn drop_spinup(ds: &Dataset, spinup_months: usize) -> error_stack::Result<Dataset, BuildError> {
    let ntime = ds
        .dim_len(TIME_DIM)
        .ok_or_else(|| DatasetError::MissingDimension(TIME_DIM.to_string()))
        .change_context(BuildError::Selection)?;
    if spinup_months >= ntime {
        return Err(BuildError::SpinupTooLong { spinup: spinup_months, ntime }.into());
    }
    ds.isel_time(spinup_months..ntime)
        .change_context(BuildError::Selection)
}

/// Find, merge and post-process the history files of `case` for component `comp`.
#[cfg(feature = "netcdf")]
pub fn create_dataset(
    raw_path: &Path,
    case: &str,
    comp: Component,
    opts: &BuildOptions,
) -> error_stack::Result<Dataset, BuildError> {
    let files = discover_files(raw_path, case, comp, &opts.history_field)?;
    let ds = crate::nc_io::open_mfdataset(&files).change_context(BuildError::Reading)?;
    log::info!("Dataset created");
    postprocess_merged(ds, case, comp, opts)
}
