//! Command line interface definitions
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};

/// Post-process NorESM monthly history output of one case into per-category
/// netCDF files.
#[derive(Debug, Parser)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub(crate) command: Commands,

    #[command(flatten)]
    pub(crate) verbosity: Verbosity<InfoLevel>,
}

#[derive(Debug, Clone, Subcommand)]
pub(crate) enum Commands {
    /// Process the case described by a TOML configuration file
    Run(RunCli),
    /// Create an example configuration file
    Template(TemplateCli),
    /// Print out the parsed representation of a TOML configuration file.
    Debug(DebugCli),
}

#[derive(Debug, Clone, Args)]
pub(crate) struct RunCli {
    /// Path to the TOML configuration file. Values in it can be
    /// overridden by NORESM_PP_* environment variables.
    pub(crate) config_file: PathBuf,
}

/// Create an example configuration file
#[derive(Debug, Clone, Args)]
pub(crate) struct TemplateCli {
    /// Path to write the template to
    pub(crate) template_file: PathBuf,
}

/// Print out the parsed representation of a TOML configuration file,
/// including any environment overrides. This can help confirm you've
/// created the right configuration.
#[derive(Debug, Clone, Args)]
pub(crate) struct DebugCli {
    /// Path to the TOML configuration file
    pub(crate) config_file: PathBuf,
}
