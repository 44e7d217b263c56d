//! Conversion of selected variables to more readable units, and clearer
//! descriptions for others.
use crate::dataset::{AttrValue, Dataset};

/// Attribute recording the units a variable had before it was rescaled.
/// Variables carrying it are never rescaled a second time.
pub const ORIGINAL_UNITS_ATTR: &str = "original_units";

/// Attribute recording the model's own name for a variable.
pub const MODEL_NAME_ATTR: &str = "CLM5_name";

/// A multiplicative unit change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rescale {
    pub factor: f64,
    pub units: &'static str,
}

const SECONDS_PER_YEAR: f64 = 60.0 * 60.0 * 24.0 * 365.0;
const SECONDS_PER_DAY: f64 = 60.0 * 60.0 * 24.0;

/// Variables whose values are multiplied by a factor, with their new units.
pub static RESCALES: &[(&str, Rescale)] = &[
    // kg/m2/s -> mg/m2/y
    ("SFisoprene", Rescale { factor: 1e6 * SECONDS_PER_YEAR, units: "mg/m$^2$/y" }),
    ("SFmonoterp", Rescale { factor: 1e6 * SECONDS_PER_YEAR, units: "mg/m$^2$/y" }),
    // kg/kg -> ug/kg
    ("SOA_A1", Rescale { factor: 1e9, units: "$\\mu$g/kg" }),
    ("SOA_NA", Rescale { factor: 1e9, units: "$\\mu$g/kg" }),
    // kg/m2 -> mg/m2
    ("cb_SOA_A1", Rescale { factor: 1e6, units: "mg/m$^2$" }),
    ("cb_SOA_NA", Rescale { factor: 1e6, units: "mg/m$^2$" }),
    ("cb_SOA_A1_OCW", Rescale { factor: 1e6, units: "mg/m$^2$" }),
    ("cb_SOA_NA_OCW", Rescale { factor: 1e6, units: "mg/m$^2$" }),
    ("ACTNL", Rescale { factor: 1e6, units: "cm$^{-3}$" }),
    // 1/m2 -> 1e6 cm-2
    ("CDNUMC", Rescale { factor: 1e-10, units: "1e6 cm$^{-2}$" }),
    ("CLDHGH", Rescale { factor: 1e3, units: "g/kg" }),
    ("CLDLOW", Rescale { factor: 1e3, units: "g/kg" }),
    ("CLDMED", Rescale { factor: 1e3, units: "g/kg" }),
    // kg/kg -> mg/kg
    ("CLDLIQ", Rescale { factor: 1e6, units: "mg/kg" }),
    // kg/m2 -> g/m2
    ("TGCLDLWP", Rescale { factor: 1e3, units: "g/m$^2$" }),
    // mm H2O/s -> mm H2O/day
    ("QFLX_EVAP_TOT", Rescale { factor: SECONDS_PER_DAY, units: "mm/day" }),
];

/// Variables whose values are fine but whose unit label is normalized to
/// match the other radiative fluxes.
pub static RELABELS: &[(&str, &str)] = &[
    ("FLNT", "W/m$^2$"),
    ("FSNT", "W/m$^2$"),
    ("FLNT_DRF", "W/m$^2$"),
    ("FLNTCDRF", "W/m$^2$"),
    ("FSNT_DRF", "W/m$^2$"),
    ("FSNTCDRF", "W/m$^2$"),
    ("LHFLX", "W/m$^2$"),
    ("SHFLX", "W/m$^2$"),
];

/// New `long_name` descriptions.
pub static LONG_NAMES: &[(&str, &str)] = &[
    ("SOA_A1", "SOA_A1 concentration - SOA condensate on existing particles from SOAGSV (gas)"),
    ("SOA_NA", "SOA_NA concentration - SOA formed by co-nucleation with SO4"),
    ("cb_SOA_A1", "SOA_A1 burden column - SOA condensate on existing particles from SOAGSV (gas)"),
    ("cb_SOA_NA", "SOA_NA burden column - SOA formed by co-nucleation with SO4"),
    ("cb_SOA_A1_OCW", "SOA_A1 burden column in cloud water - SOA condensate on existing particles from SOAGSV (gas)"),
    ("cb_SOA_NA_OCW", "SOA_NA burden column in cloud water - SOA formed by co-nucleation with SO4"),
];

/// Variables annotated with their model name, keyed by that name.
pub static MODEL_NAMES: &[&str] = &["TGCLDLWP", "QFLX_EVAP_TOT"];

pub fn rescale_for(varname: &str) -> Option<&'static Rescale> {
    RESCALES.iter().find(|(name, _)| *name == varname).map(|(_, r)| r)
}

pub fn relabel_for(varname: &str) -> Option<&'static str> {
    RELABELS.iter().find(|(name, _)| *name == varname).map(|(_, u)| *u)
}

/// Return a copy of `ds` with the [`RESCALES`] and [`RELABELS`] tables applied.
///
/// Rescaled variables are tagged with [`ORIGINAL_UNITS_ATTR`]; a variable
/// that already has the tag is left alone, so applying this twice is the
/// same as applying it once. Character variables and variables in neither
/// table pass through unchanged.
pub fn fix_units(ds: &Dataset) -> Dataset {
    let mut out = ds.clone();

    for (name, var) in ds.variables() {
        if let Some(rescale) = rescale_for(name) {
            if var.attrs.contains_key(ORIGINAL_UNITS_ATTR) {
                log::debug!("{name} was already rescaled, skipping");
                continue;
            }
            let Some(data) = var.data.scaled(rescale.factor) else {
                log::warn!("{name} does not hold numeric data, cannot rescale it");
                continue;
            };

            let mut new_var = var.clone();
            new_var.data = data;
            let old_units = var.units().unwrap_or("").to_string();
            new_var.set_attr(ORIGINAL_UNITS_ATTR, old_units);
            new_var.set_attr("units", rescale.units);
            if let Some(slot) = out.variable_mut(name) {
                *slot = new_var;
            }
        } else if let Some(units) = relabel_for(name) {
            if let Some(slot) = out.variable_mut(name) {
                slot.set_attr("units", units);
            }
        }
    }

    log::info!("Fix units completed");
    out
}

/// Return a copy of `ds` with clearer `long_name`s from [`LONG_NAMES`] and the
/// model name recorded for the variables in [`MODEL_NAMES`].
pub fn fix_names(ds: &Dataset) -> Dataset {
    let mut out = ds.clone();

    for (name, long_name) in LONG_NAMES {
        if let Some(var) = out.variable_mut(name) {
            var.set_attr("long_name", *long_name);
        }
    }

    for name in MODEL_NAMES {
        if let Some(var) = out.variable_mut(name) {
            var.attrs
                .insert(MODEL_NAME_ATTR.to_string(), AttrValue::Str(name.to_string()));
        }
    }

    log::info!("Fix names completed");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        nc_utils::NcArray,
        test_utils::{monthly_dataset, scalar_field},
    };
    use approx::assert_relative_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn raw() -> Dataset {
        let mut ds = monthly_dataset(2000, 4);
        ds.insert_variable("SFisoprene", scalar_field(4, 2e-12, "kg/m2/s")).unwrap();
        ds.insert_variable("CDNUMC", scalar_field(4, 3e10, "1/m2")).unwrap();
        ds.insert_variable("QFLX_EVAP_TOT", scalar_field(4, 1e-5, "mm H2O/s")).unwrap();
        ds.insert_variable("FSNT", scalar_field(4, 240.0, "W/m2")).unwrap();
        ds.insert_variable("T", scalar_field(4, 280.0, "K")).unwrap();
        ds
    }

    fn values(ds: &Dataset, name: &str) -> Vec<f64> {
        ds.get(name).unwrap().data.to_f64().unwrap().iter().copied().collect()
    }

    #[rstest]
    #[case("SFisoprene", 1e6 * SECONDS_PER_YEAR, "mg/m$^2$/y")]
    #[case("CDNUMC", 1e-10, "1e6 cm$^{-2}$")]
    #[case("QFLX_EVAP_TOT", 86400.0, "mm/day")]
    fn test_rescaled(raw: Dataset, #[case] name: &str, #[case] factor: f64, #[case] units: &str) {
        let fixed = fix_units(&raw);
        for (before, after) in values(&raw, name).iter().zip(values(&fixed, name)) {
            assert_relative_eq!(after, before * factor, max_relative = 1e-6);
        }
        let var = fixed.get(name).unwrap();
        assert_eq!(var.units(), Some(units));
        assert_eq!(var.attr_str(ORIGINAL_UNITS_ATTR), raw.get(name).unwrap().units());
    }

    #[rstest]
    fn test_relabel_only(raw: Dataset) {
        let fixed = fix_units(&raw);
        assert_eq!(values(&fixed, "FSNT"), values(&raw, "FSNT"));
        assert_eq!(fixed.get("FSNT").unwrap().units(), Some("W/m$^2$"));
        assert!(!fixed.get("FSNT").unwrap().attrs.contains_key(ORIGINAL_UNITS_ATTR));
    }

    #[rstest]
    fn test_unknown_unchanged(raw: Dataset) {
        let fixed = fix_units(&raw);
        assert_eq!(fixed.get("T").unwrap(), raw.get("T").unwrap());
        assert_eq!(fixed.get("time").unwrap(), raw.get("time").unwrap());
    }

    #[rstest]
    fn test_idempotent(raw: Dataset) {
        let once = fix_units(&raw);
        let twice = fix_units(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_integer_data_promoted() {
        let mut ds = monthly_dataset(2000, 2);
        let data = NcArray::I32(ndarray::ArrayD::from_elem(ndarray::IxDyn(&[2]), 3));
        let var = crate::dataset::Variable::new(&["time"], data).with_attr("units", "kg/m2");
        ds.insert_variable("TGCLDLWP", var).unwrap();
        let fixed = fix_units(&ds);
        assert_eq!(values(&fixed, "TGCLDLWP"), vec![3000.0, 3000.0]);
    }

    #[test]
    fn test_tables_have_no_duplicates() {
        let mut names: Vec<&str> = RESCALES.iter().map(|(n, _)| *n).chain(RELABELS.iter().map(|(n, _)| *n)).collect();
        let n = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), n);
    }

    #[test]
    fn test_fix_names() {
        let mut ds = monthly_dataset(2000, 2);
        ds.insert_variable("SOA_NA", scalar_field(2, 1.0, "kg/kg")).unwrap();
        ds.insert_variable("TGCLDLWP", scalar_field(2, 1.0, "kg/m2")).unwrap();
        let fixed = fix_names(&ds);

        assert_eq!(
            fixed.get("SOA_NA").unwrap().long_name(),
            Some("SOA_NA concentration - SOA formed by co-nucleation with SO4")
        );
        assert_eq!(fixed.get("TGCLDLWP").unwrap().attr_str(MODEL_NAME_ATTR), Some("TGCLDLWP"));
        assert_eq!(fixed.get("TGCLDLWP").unwrap().long_name(), Some("synthetic field"));
        // the input is untouched
        assert_eq!(ds.get("SOA_NA").unwrap().long_name(), Some("synthetic field"));
    }
}
