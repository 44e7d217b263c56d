//! Which variables to keep from each model component, grouped by topic.
//!
//! Categories serve two purposes: they define the subset of variables kept
//! by the dataset builder and they define how the output is split into files.
use std::{fmt::Display, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

pub static ATM_ALWAYS_INCLUDE: &[&str] = &["LANDFRAC", "GRIDAREA", "gw", "date", "time_bnds"];
pub static LND_ALWAYS_INCLUDE: &[&str] = &["area", "landfrac", "landmask", "pftmask", "PCT_LANDUNIT"];
pub static PRESSURE_VARIABLES: &[&str] = &["P0", "hyam", "hybm", "PS", "hyai", "hybi", "ilev"];
pub static GHAN_VARIABLES: &[&str] = &["SWDIR", "LWDIR", "DIR", "SWCF", "LWCF", "NCFT", "SW_rest", "LW_rest"];

static MEGAN_EMISSIONS: &[&str] = &[
    "MEG_isoprene", "MEG_limonene", "MEG_myrcene", "MEG_ocimene_t_b",
    "MEG_pinene_a", "MEG_pinene_b", "MEG_sabinene",
];
static LND_VARS: &[&str] = &["PCT_NAT_PFT", "TLAI"];
static BIOGEOCHEM_VARS: &[&str] = &[
    "GPP", "NPP", "NEE", "NEP", "STORVEGN", "TOTPFTN", "TOTVEGN",
    "TOTCOLC", "TOTECOSYSC", "TOTPFTC", "TOTVEGC", "STORVEGC",
];
static EVAP_VARS: &[&str] = &["QFLX_EVAP_TOT", "FCEV", "FCTR", "FGEV", "QSOIL", "QVEGE", "QVEGT"];

/// Category whose output file also receives the Ghan and turbulent flux variables.
pub const RADIATIVE: &str = "RADIATIVE";
/// Category written as part of [`RADIATIVE`] rather than to its own file.
pub const TURBFLUXES: &str = "TURBFLUXES";

/// Substring of a case name marking runs with biogenic emissions switched off.
const BVOC_OFF_TAG: &str = "OFF";

/// The model components handled by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    /// Atmosphere (CAM)
    Atm,
    /// Land surface (CLM)
    Lnd,
}

impl Component {
    /// The model name used in history file names: "cam" or "clm2".
    pub fn model_name(&self) -> &'static str {
        match self {
            Component::Atm => "cam",
            Component::Lnd => "clm2",
        }
    }

    /// The directory name of the component in a case's archive.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Component::Atm => "atm",
            Component::Lnd => "lnd",
        }
    }

    /// Variables kept regardless of category. Pressure coordinate variables
    /// are only ever added for the atmosphere.
    pub fn always_include(&self, pressure_vars: bool) -> Vec<&'static str> {
        match self {
            Component::Atm => {
                let mut vars = ATM_ALWAYS_INCLUDE.to_vec();
                if pressure_vars {
                    vars.extend_from_slice(PRESSURE_VARIABLES);
                }
                vars
            }
            Component::Lnd => LND_ALWAYS_INCLUDE.to_vec(),
        }
    }
}

impl FromStr for Component {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "atm" => Ok(Self::Atm),
            "lnd" => Ok(Self::Lnd),
            _ => Err(CatalogError::UnsupportedComponent(s.to_string())),
        }
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// Whether the land catalog for `case` should include the biogenic emission
/// variables, i.e. the case name is not tagged as having them switched off.
pub fn bvoc_enabled(case: &str) -> bool {
    !case.contains(BVOC_OFF_TAG)
}

/// An ordered mapping of category name to the variable names in it.
/// A variable may belong to more than one category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    categories: IndexMap<String, Vec<String>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style helper to append a category.
    pub fn with_category<S: ToString>(mut self, name: &str, variables: &[S]) -> Self {
        self.categories.insert(
            name.to_string(),
            variables.iter().map(|v| v.to_string()).collect(),
        );
        self
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(|k| k.as_str())
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.categories.get(category).map(|v| v.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.categories.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// All variables of all categories, in catalog order. Variables listed
    /// in several categories appear once per listing.
    pub fn flattened(&self) -> Vec<String> {
        self.categories.values().flatten().cloned().collect()
    }
}

/// The variable catalog for `comp`. For the land component, `bvoc` chooses
/// whether the MEGAN biogenic emission variables are part of the "LAND"
/// category; it has no effect for the atmosphere.
pub fn variables_by_component(comp: Component, bvoc: bool) -> Catalog {
    match comp {
        Component::Atm => Catalog::new()
            .with_category("BVOC", &["SFisoprene", "SFmonoterp"])
            .with_category(
                "SOA",
                &["N_AER", "DOD550", "SOA_A1", "SOA_NA", "cb_SOA_A1", "cb_SOA_NA", "cb_SOA_A1_OCW", "cb_SOA_NA_OCW"],
            )
            .with_category(
                "CLOUDPROP",
                &[
                    "ACTNL", "ACTREL", "CDNUMC", "CLDHGH", "CLDLOW", "CLDMED", "CLDTOT", "CLDLIQ",
                    "CLOUD", "CLOUDCOVER_CLUBB", "FCTL", "NUMLIQ", "TGCLDLWP",
                ],
            )
            .with_category(
                RADIATIVE,
                &["FSDS", "FSNS", "FLNT", "FSNT", "FLNT_DRF", "FLNTCDRF", "FSNTCDRF", "FSNT_DRF", "LWCF", "SWCF"],
            )
            .with_category(TURBFLUXES, &["LHFLX", "SHFLX"]),
        Component::Lnd => {
            let land: Vec<&str> = if bvoc {
                MEGAN_EMISSIONS.iter().chain(LND_VARS).copied().collect()
            } else {
                LND_VARS.to_vec()
            };
            Catalog::new()
                .with_category("LAND", &land)
                .with_category("BIOGEOCHEM", BIOGEOCHEM_VARS)
                .with_category("ET", EVAP_VARS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_atm_categories() {
        let catalog = variables_by_component(Component::Atm, true);
        let names: Vec<&str> = catalog.category_names().collect();
        assert_eq!(names, vec!["BVOC", "SOA", "CLOUDPROP", "RADIATIVE", "TURBFLUXES"]);
        assert_eq!(catalog.get("TURBFLUXES").unwrap(), &["LHFLX", "SHFLX"]);
        assert_eq!(catalog.flattened().len(), 2 + 8 + 13 + 10 + 2);
    }

    #[test]
    fn test_atm_ignores_bvoc_flag() {
        assert_eq!(
            variables_by_component(Component::Atm, true),
            variables_by_component(Component::Atm, false)
        );
    }

    #[rstest]
    #[case("IDEAL-ON", true)]
    #[case("IDEAL-OFF", false)]
    #[case("OFF-start", false)]
    #[case("NF2000_BVOC", true)]
    fn test_land_bvoc_by_case(#[case] case: &str, #[case] has_megan: bool) {
        let catalog = variables_by_component(Component::Lnd, bvoc_enabled(case));
        let land = catalog.get("LAND").unwrap();
        for megan in MEGAN_EMISSIONS {
            assert_eq!(land.iter().any(|v| v == megan), has_megan, "{megan} in {case}");
        }
        assert!(land.iter().any(|v| v == "TLAI"));
        let names: Vec<&str> = catalog.category_names().collect();
        assert_eq!(names, vec!["LAND", "BIOGEOCHEM", "ET"]);
    }

    #[test]
    fn test_component_parsing() {
        assert_eq!("atm".parse::<Component>().unwrap(), Component::Atm);
        assert_eq!("lnd".parse::<Component>().unwrap(), Component::Lnd);
        assert!(matches!(
            "ocn".parse::<Component>(),
            Err(CatalogError::UnsupportedComponent(c)) if c == "ocn"
        ));
        assert_eq!(Component::Atm.model_name(), "cam");
        assert_eq!(Component::Lnd.model_name(), "clm2");
    }

    #[test]
    fn test_always_include() {
        assert_eq!(Component::Atm.always_include(false), ATM_ALWAYS_INCLUDE);
        assert_eq!(Component::Atm.always_include(true).len(), 12);
        assert_eq!(Component::Lnd.always_include(true), LND_ALWAYS_INCLUDE);
    }
}
