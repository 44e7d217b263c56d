//! Run configuration for the post-processing driver.
use std::{io::Write, path::{Path, PathBuf}};

use error_stack::ResultExt;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{
    builder::{BuildOptions, MONTHLY_HISTORY},
    catalog::Component,
    error::ConfigError,
    time_fix::TimeType,
    writer::WriteMode,
};

/// Prefix for environment variables that override values from the TOML file,
/// e.g. `NORESM_PP_SPINUP_MONTHS=24`.
pub const ENV_PREFIX: &str = "NORESM_PP_";

/// The `fix_timestamp` setting: a [`TimeType`] or "none" to leave the time
/// coordinate as it is in the files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimestampFix {
    #[default]
    #[serde(rename = "datetime64")]
    Datetime64,
    #[serde(rename = "DatetimeNoLeap")]
    DatetimeNoLeap,
    #[serde(rename = "none", alias = "None")]
    Off,
}

impl TimestampFix {
    pub fn time_type(self) -> Option<TimeType> {
        match self {
            TimestampFix::Datetime64 => Some(TimeType::Datetime64),
            TimestampFix::DatetimeNoLeap => Some(TimeType::DatetimeNoLeap),
            TimestampFix::Off => None,
        }
    }
}

/// Everything needed to post-process one case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Directory holding the raw case archives, i.e. `<raw_path>/<case>/<comp>/hist`.
    pub raw_path: PathBuf,
    /// Directory the category files are written to.
    pub processed_path: PathBuf,
    pub case: String,
    /// Short name used in the output file names. Defaults to `case`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_alias: Option<String>,
    #[serde(default = "default_components")]
    pub components: Vec<Component>,
    #[serde(default = "default_history_field")]
    pub history_field: String,
    #[serde(default)]
    pub fix_timestamp: TimestampFix,
    #[serde(default = "default_spinup_months")]
    pub spinup_months: usize,
    /// Keep the hybrid pressure coordinate variables in the atmosphere output.
    #[serde(default)]
    pub pressure_vars: bool,
    /// Skip the catalog selection when building the dataset. The output files
    /// still only contain catalog variables.
    #[serde(default)]
    pub full_dataset: bool,
    #[serde(default)]
    pub write_mode: WriteMode,
    /// Also write the log to this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

fn default_components() -> Vec<Component> {
    vec![Component::Atm, Component::Lnd]
}

fn default_history_field() -> String {
    MONTHLY_HISTORY.to_string()
}

fn default_spinup_months() -> usize {
    12
}

impl RunConfig {
    /// Load a configuration from a TOML file, with overrides from `NORESM_PP_*`
    /// environment variables.
    pub fn load(toml_file: &Path) -> error_stack::Result<Self, ConfigError> {
        if !toml_file.exists() {
            return Err(ConfigError::NotFound(toml_file.to_path_buf()).into());
        }

        let config: Self = Figment::new()
            .merge(Toml::file(toml_file))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .change_context(ConfigError::Parse)
            .attach_printable_lazy(|| format!("configuration file: {}", toml_file.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a configuration from a TOML string. Environment variables are not consulted.
    pub fn from_toml_str(toml_str: &str) -> error_stack::Result<Self, ConfigError> {
        let config: Self = Figment::from(Toml::string(toml_str))
            .extract()
            .change_context(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> error_stack::Result<(), ConfigError> {
        if self.components.is_empty() {
            return Err(ConfigError::Invalid {
                key: "components",
                reason: "at least one component is required".to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn case_alias(&self) -> &str {
        self.case_alias.as_deref().unwrap_or(&self.case)
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            history_field: self.history_field.clone(),
            full_dataset: self.full_dataset,
            fix_timestamp: self.fix_timestamp.time_type(),
            spinup_months: self.spinup_months,
            pressure_vars: self.pressure_vars,
        }
    }

    /// Create an example configuration
    pub fn template_example() -> Self {
        Self {
            raw_path: PathBuf::from("/path/to/archive"),
            processed_path: PathBuf::from("/path/to/processed"),
            case: "NF2000_IDEAL-ON".to_string(),
            case_alias: Some("IDEAL-ON".to_string()),
            components: default_components(),
            history_field: default_history_field(),
            fix_timestamp: TimestampFix::default(),
            spinup_months: default_spinup_months(),
            pressure_vars: false,
            full_dataset: false,
            write_mode: WriteMode::Cumulative,
            log_file: None,
        }
    }

    /// Write a commented example configuration file
    pub fn write_template_example(example_file: &Path) -> error_stack::Result<(), ConfigError> {
        let comments = [
            "Example configuration for postprocess_noresm.",
            "",
            "History files are looked up as <raw_path>/<case>/<comp>/hist/<case>.<model>.<history_field>.*.nc",
            "and the category files are written to processed_path as <case_alias>_<category>_<start><end>.nc.",
            "",
            "fix_timestamp is one of \"datetime64\", \"DatetimeNoLeap\" or \"none\"; it only applies to the h0 stream.",
            "spinup_months leading time steps are dropped and must be fewer than the number of steps read.",
            "write_mode \"cumulative\" repeats earlier categories in later files, \"exclusive\" does not.",
            "Land cases with OFF in their name get no MEGAN emission variables.",
            "Add log_file = \"/path/to/postprocess.log\" to keep a copy of the log.",
            "",
            "Any value can be overridden with an environment variable, e.g. NORESM_PP_SPINUP_MONTHS=24.",
            "",
        ];
        let template = Self::template_example();
        let s = toml::to_string_pretty(&template)
            .change_context_lazy(|| ConfigError::Template(example_file.to_path_buf()))?;

        let mut f = std::fs::File::create(example_file)
            .change_context_lazy(|| ConfigError::Template(example_file.to_path_buf()))?;
        for line in comments {
            writeln!(f, "# {line}").change_context_lazy(|| ConfigError::Template(example_file.to_path_buf()))?;
        }
        write!(f, "{s}").change_context_lazy(|| ConfigError::Template(example_file.to_path_buf()))?;
        Ok(())
    }
}
