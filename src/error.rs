//! Common errors across the noresm-postproc crate
use std::path::PathBuf;

/// Errors related to choosing a model component
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("component '{0}' not supported, choose 'atm' or 'lnd'")]
    UnsupportedComponent(String),
}

/// Errors related to working with CF time values and the time coordinate
#[derive(Debug, thiserror::Error)]
pub enum TimeError {
    #[error("time type '{0}' not supported, choose 'DatetimeNoLeap' or 'datetime64'")]
    UnsupportedTimeType(String),
    #[error("Could not interpret time units '{0}'")]
    BadUnits(String),
    #[error("Calendar '{0}' is not supported")]
    UnsupportedCalendar(String),
    #[error("Year {0}, month {1}, day {2} is not a valid date in a no-leap calendar")]
    InvalidNoLeapDate(i32, u32, u32),
    #[error("Time value {0} is outside the range of representable dates")]
    OutOfRange(f64),
    #[error("No time bounds variable found (looked for {0})")]
    MissingBounds(String),
    #[error("Time bounds variable '{0}' must have dimensions (time, 2)")]
    BadBounds(String),
    #[error("Time coordinate is missing its '{0}' attribute")]
    MissingAttribute(&'static str),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

/// Errors raised by operations on an in-memory [`crate::dataset::Dataset`]
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Missing expected variable: {0}")]
    MissingVariable(String),
    #[error("Missing expected dimension: {0}")]
    MissingDimension(String),
    #[error("Dimension '{dim}' has length {expected} in the dataset but {got} in variable '{varname}'")]
    DimensionMismatch {
        dim: String,
        varname: String,
        expected: usize,
        got: usize,
    },
    #[error("Variable '{varname}' has {ndim} dimension names but its data has {ndata} axes")]
    ShapeMismatch {
        varname: String,
        ndim: usize,
        ndata: usize,
    },
    #[error("Variable '{varname}' cannot be concatenated: {reason}")]
    Concat { varname: String, reason: String },
    #[error("Cannot concatenate an empty list of datasets")]
    NothingToConcat,
    #[error("Variable '{0}' does not hold numeric data")]
    NotNumeric(String),
    #[error("Variables '{0}' and '{1}' do not have the same dimensions")]
    IncompatibleShapes(String, String),
}

impl DatasetError {
    pub fn missing_variable<S: ToString>(varname: S) -> Self {
        Self::MissingVariable(varname.to_string())
    }

    pub fn concat<S: ToString, R: ToString>(varname: S, reason: R) -> Self {
        Self::Concat {
            varname: varname.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Errors from turning raw history files into one dataset
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid glob pattern for input files: {0}")]
    BadPattern(String),
    #[error("No input files matched {0}")]
    NoInputFiles(String),
    #[error("Error listing input files")]
    Listing,
    #[error("Error reading the input files")]
    Reading,
    #[error("Error correcting the time coordinate")]
    TimeFix,
    #[error("Cannot drop {spinup} spin-up months from a record of {ntime} time steps")]
    SpinupTooLong { spinup: usize, ntime: usize },
    #[error("Error selecting the catalog variables")]
    Selection,
}

/// Errors from reading or writing netCDF files
#[derive(Debug, thiserror::Error)]
pub enum NcIoError {
    #[error("Could not open {}", .0.display())]
    Open(PathBuf),
    #[error("Could not create {}", .0.display())]
    Create(PathBuf),
    #[error("Error reading variable '{0}'")]
    ReadVariable(String),
    #[error("Error writing variable '{0}'")]
    WriteVariable(String),
    #[error("Error writing attribute '{0}'")]
    WriteAttribute(String),
    #[error("Error writing dimension '{0}'")]
    WriteDimension(String),
    #[error("Error merging the input files")]
    Merge,
}

/// Errors from writing the per-category output files
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("Could not determine the year range of the dataset")]
    YearRange,
    #[error("Could not select the variables for category {0}")]
    Selection(String),
    #[error("Could not write {}", .0.display())]
    File(PathBuf),
}

/// Errors from loading the run configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("Could not parse the configuration")]
    Parse,
    #[error("Could not write the configuration template to {}", .0.display())]
    Template(PathBuf),
    #[error("Invalid configuration value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Errors from setting up logging
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Could not open log file {}", .0.display())]
    LogFile(PathBuf),
    #[error("Invalid logger configuration")]
    Config,
    #[error("Could not install the logger")]
    Init,
}
