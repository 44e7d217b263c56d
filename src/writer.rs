//! Split a post-processed dataset into one output file per catalog category.
#[cfg(feature = "netcdf")]
use std::path::{Path, PathBuf};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, RADIATIVE, TURBFLUXES};
#[cfg(feature = "netcdf")]
use crate::{
    catalog::{bvoc_enabled, variables_by_component, Component, GHAN_VARIABLES},
    dataset::Dataset,
    error::WriteError,
};
#[cfg(feature = "netcdf")]
use error_stack::ResultExt;

/// How the variables of successive categories are distributed over the files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Each file holds the always-included variables plus the variables of its
    /// category *and every category before it*, so later files repeat the
    /// content of earlier ones.
    #[default]
    Cumulative,
    /// Each file holds the always-included variables plus only its own category.
    Exclusive,
}

/// One planned output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub category: String,
    pub file_name: String,
    pub variables: Vec<String>,
}

/// Output file name, e.g. "IDEAL-ON_BVOC_20082012.nc".
pub fn output_file_name(case_alias: &str, category: &str, start_year: i32, end_year: i32) -> String {
    format!("{case_alias}_{category}_{start_year}{end_year}.nc")
}

/// Work out which variables go in which file, in catalog order.
///
/// The [`RADIATIVE`] file also receives `extra_radiative` (the forcing
/// decomposition variables) and the [`TURBFLUXES`] category, which gets no
/// file of its own.
pub fn plan_output_files<S: AsRef<str>, S2: AsRef<str>>(
    catalog: &Catalog,
    always_include: &[S],
    extra_radiative: &[S2],
    case_alias: &str,
    years: (i32, i32),
    mode: WriteMode,
) -> Vec<OutputFile> {
    let always: IndexSet<String> = always_include.iter().map(|v| v.as_ref().to_string()).collect();
    let mut running = always.clone();
    let mut files = vec![];

    for (category, variables) in catalog.iter() {
        let mut this_file = match mode {
            WriteMode::Cumulative => {
                running.extend(variables.iter().cloned());
                running.clone()
            }
            WriteMode::Exclusive => {
                let mut set = always.clone();
                set.extend(variables.iter().cloned());
                set
            }
        };

        if category == TURBFLUXES {
            continue;
        }

        if category == RADIATIVE {
            let folded = extra_radiative
                .iter()
                .map(|v| v.as_ref().to_string())
                .chain(catalog.get(TURBFLUXES).unwrap_or_default().iter().cloned());
            let folded: Vec<String> = folded.collect();
            this_file.extend(folded.iter().cloned());
            if mode == WriteMode::Cumulative {
                running.extend(folded);
            }
        }

        files.push(OutputFile {
            category: category.to_string(),
            file_name: output_file_name(case_alias, category, years.0, years.1),
            variables: this_file.into_iter().collect(),
        });
    }

    files
}

/// Write the category files for `ds` into `processed_path` and return their paths.
///
/// The year range in the names comes from the first and last time steps. The
/// land catalog includes the biogenic emission variables unless `case_alias`
/// contains "OFF". A file that fails to write stops the process; files
/// written before it are left in place.
#[cfg(feature = "netcdf")]
pub fn save_postprocessed(
    ds: &Dataset,
    component: Component,
    processed_path: &Path,
    case_alias: &str,
    pressure_vars: bool,
    mode: WriteMode,
) -> error_stack::Result<Vec<PathBuf>, WriteError> {
    let years = ds.time_years().change_context(WriteError::YearRange)?;
    let (Some(&start_year), Some(&end_year)) = (years.first(), years.last()) else {
        return Err(error_stack::Report::new(WriteError::YearRange)
            .attach_printable("the dataset has no time steps"));
    };

    let catalog = variables_by_component(component, bvoc_enabled(case_alias));
    let always = component.always_include(pressure_vars);
    let (ghan, missing_ghan): (Vec<&str>, Vec<&str>) =
        GHAN_VARIABLES.iter().copied().partition(|v| ds.contains(v));
    if catalog.get(RADIATIVE).is_some() && !missing_ghan.is_empty() {
        log::warn!(
            "The {RADIATIVE} file will not include the forcing decomposition variable(s) {}",
            missing_ghan.join(", ")
        );
    }

    let plan = plan_output_files(&catalog, &always, &ghan, case_alias, (start_year, end_year), mode);
    let mut written = vec![];
    for file in plan {
        let subset = ds
            .select(&file.variables)
            .change_context_lazy(|| WriteError::Selection(file.category.clone()))?;
        let path = processed_path.join(&file.file_name);
        crate::nc_io::write_dataset(&subset, &path)
            .change_context_lazy(|| WriteError::File(path.clone()))?;
        log::info!("{}", file.file_name);
        written.push(path);
    }

    log::info!("Saving completed");
    Ok(written)
}
