//! Post-processing of NorESM/CESM monthly history output: merge the raw
//! files of a case, correct the time coordinate, convert units, derive the
//! Ghan forcing decomposition and split the result into one file per
//! variable category.
pub mod error;
pub mod logging;
pub mod nc_utils;
pub mod dataset;
pub mod cftime;
pub mod time_fix;
pub mod catalog;
pub mod builder;
#[cfg(feature = "netcdf")]
pub mod nc_io;
pub mod units;
pub mod forcing;
pub mod writer;
pub mod config;

#[cfg(test)]
pub(crate) mod test_utils;
