//! Ghan's decomposition of the aerosol-cloud radiative forcing.
//!
//! Separates the top-of-model radiative effect into aerosol direct, cloud
//! and remaining (clear, clean sky) terms using the diagnostic calls of the
//! radiation code with aerosols and/or clouds removed. See Ghan (2013),
//! <https://acp.copernicus.org/articles/13/9971/2013/acp-13-9971-2013.pdf>.
use ndarray::ArrayD;

use crate::{
    dataset::{AttrValue, Dataset, Variable},
    error::DatasetError,
    nc_utils::NcArray,
};

/// Variables needed for the decomposition.
pub static PREREQUISITES: [&str; 6] = ["FLNT", "FSNT", "FLNT_DRF", "FLNTCDRF", "FSNTCDRF", "FSNT_DRF"];

/// One derived variable, defined as a linear combination of prerequisites.
#[derive(Debug)]
pub struct GhanTerm {
    pub name: &'static str,
    /// (coefficient, variable) pairs to sum
    pub terms: &'static [(f64, &'static str)],
    /// Prerequisite whose units the result takes
    pub units_from: &'static str,
    pub long_name: &'static str,
    pub formula: &'static str,
}

pub static GHAN_TERMS: &[GhanTerm] = &[
    GhanTerm {
        name: "SWDIR",
        terms: &[(1.0, "FSNT"), (-1.0, "FSNT_DRF")],
        units_from: "FSNT_DRF",
        long_name: "Shortwave aerosol direct radiative forcing - Ghan's decomposition",
        formula: "FSNT - FSNT_DRF",
    },
    GhanTerm {
        name: "LWDIR",
        terms: &[(-1.0, "FLNT"), (1.0, "FLNT_DRF")],
        units_from: "FLNT_DRF",
        long_name: "Longwave aerosol direct radiative forcing - Ghan's decomposition",
        formula: "-(FLNT - FLNT_DRF)",
    },
    GhanTerm {
        name: "DIR",
        terms: &[(1.0, "FSNT"), (-1.0, "FSNT_DRF"), (-1.0, "FLNT"), (1.0, "FLNT_DRF")],
        units_from: "FLNT_DRF",
        long_name: "Net aerosol direct radiative forcing - Ghan's decomposition",
        formula: "SWDIR + LWDIR",
    },
    GhanTerm {
        name: "SWCF",
        terms: &[(1.0, "FSNT_DRF"), (-1.0, "FSNTCDRF")],
        units_from: "FSNT_DRF",
        long_name: "Shortwave cloud radiative forcing - Ghan's decomposition",
        formula: "FSNT_DRF - FSNTCDRF",
    },
    GhanTerm {
        name: "LWCF",
        terms: &[(-1.0, "FLNT_DRF"), (1.0, "FLNTCDRF")],
        units_from: "FLNT_DRF",
        long_name: "Longwave cloud radiative forcing - Ghan's decomposition",
        formula: "-(FLNT_DRF - FLNTCDRF)",
    },
    GhanTerm {
        name: "NCFT",
        terms: &[(1.0, "FSNT_DRF"), (-1.0, "FSNTCDRF"), (-1.0, "FLNT_DRF"), (1.0, "FLNTCDRF")],
        units_from: "FLNT_DRF",
        long_name: "Net cloud radiative forcing - Ghan's decomposition",
        formula: "FSNT_DRF - FSNTCDRF - (FLNT_DRF - FLNTCDRF)",
    },
    GhanTerm {
        name: "SW_rest",
        terms: &[(1.0, "FSNTCDRF")],
        units_from: "FSNTCDRF",
        long_name: "Shortwave surface albedo radiative forcing - Ghan's decomposition",
        formula: "FSNTCDRF",
    },
    GhanTerm {
        name: "LW_rest",
        terms: &[(1.0, "FLNTCDRF")],
        units_from: "FLNTCDRF",
        long_name: "Clear sky total column longwave flux - Ghan's decomposition",
        formula: "FLNTCDRF",
    },
];

/// Names and descriptions of the prerequisites in the decomposition's terms.
pub static PREREQUISITE_NAMES: &[(&str, &str, &str)] = &[
    ("FSNT", "SWTOT", "Shortwave total forcing at TOA"),
    ("FLNT", "LWTOT", "Longwave total forcing at TOA"),
    ("FSNT_DRF", "SW_clean", "Shortwave without direct aerosol forcing (scattering, absorbing)"),
    ("FSNTCDRF", "SW_clean_clear", "Shortwave without direct aerosol and cloud forcing"),
    ("FLNT_DRF", "LW_clean", "Longwave without direct aerosol forcing (scattering, absorbing)"),
    ("FLNTCDRF", "LW_clean_clear", "Longwave without direct aerosol and cloud forcing"),
];

/// Result of [`ghan_decomposition`]: either the dataset with the derived
/// variables added, or an unchanged copy plus the prerequisites that were missing.
#[derive(Debug, Clone, PartialEq)]
pub enum GhanOutcome {
    Applied(Dataset),
    Skipped { dataset: Dataset, missing: Vec<String> },
}

impl GhanOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, GhanOutcome::Applied(_))
    }

    pub fn dataset(&self) -> &Dataset {
        match self {
            GhanOutcome::Applied(ds) => ds,
            GhanOutcome::Skipped { dataset, .. } => dataset,
        }
    }

    pub fn into_dataset(self) -> Dataset {
        match self {
            GhanOutcome::Applied(ds) => ds,
            GhanOutcome::Skipped { dataset, .. } => dataset,
        }
    }
}

/// Add the [`GHAN_TERMS`] to a copy of `ds` and annotate the prerequisites
/// with their names in the decomposition. Existing `SWCF` and `LWCF`
/// variables are replaced.
///
/// If any of the [`PREREQUISITES`] is missing, nothing is computed: a warning
/// is logged and [`GhanOutcome::Skipped`] is returned.
pub fn ghan_decomposition(ds: &Dataset) -> Result<GhanOutcome, DatasetError> {
    let missing: Vec<String> = PREREQUISITES
        .iter()
        .filter(|name| !ds.contains(name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        log::warn!(
            "Ghan's decomposition skipped, missing prerequisite variable(s): {}",
            missing.join(", ")
        );
        return Ok(GhanOutcome::Skipped { dataset: ds.clone(), missing });
    }

    let reference = ds.get(PREREQUISITES[0])?;
    for name in &PREREQUISITES[1..] {
        if ds.get(name)?.dims != reference.dims {
            return Err(DatasetError::IncompatibleShapes(
                PREREQUISITES[0].to_string(),
                name.to_string(),
            ));
        }
    }

    let mut out = ds.clone();
    for term in GHAN_TERMS {
        let var = derive_term(ds, term)?;
        log::debug!("{} - {}", term.name, term.long_name);
        out.insert_variable(term.name, var)?;
    }

    for (varname, ghan_name, ghan_long_name) in PREREQUISITE_NAMES {
        if let Some(var) = out.variable_mut(varname) {
            var.set_attr("Ghan_name", *ghan_name);
            var.set_attr("Ghan_long_name", *ghan_long_name);
        }
    }

    log::info!("Ghan's decomposition completed");
    Ok(GhanOutcome::Applied(out))
}

fn derive_term(ds: &Dataset, term: &GhanTerm) -> Result<Variable, DatasetError> {
    let (_, first_name) = term.terms[0];
    let first = ds.get(first_name)?;

    let mut values = ArrayD::<f64>::zeros(first.data.shape());
    for &(coef, name) in term.terms {
        let source = ds
            .get(name)?
            .data
            .to_f64()
            .ok_or_else(|| DatasetError::NotNumeric(name.to_string()))?;
        values.scaled_add(coef, &source);
    }

    // A plain copy keeps all of its source's metadata
    let mut var = if let [(coef, _)] = term.terms {
        if *coef == 1.0 {
            first.clone()
        } else {
            Variable::new(&first.dims, first.data.clone())
        }
    } else {
        Variable::new(&first.dims, first.data.clone())
    };
    var.data = NcArray::from_f64_like(values, &first.data);

    if let Some(units) = ds.get(term.units_from)?.attrs.get("units") {
        var.attrs.insert("units".to_string(), units.clone());
    }
    var.attrs
        .insert("long_name".to_string(), AttrValue::from(term.long_name));
    var.set_attr("formula", term.formula);
    Ok(var)
}
