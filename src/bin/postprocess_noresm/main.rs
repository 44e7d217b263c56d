use std::{path::Path, process::ExitCode};

use clap::Parser;
use error_stack::ResultExt;
use noresm_postproc::{
    builder::create_dataset,
    catalog::Component,
    config::RunConfig,
    forcing::ghan_decomposition,
    logging::init_logging,
    units::{fix_names, fix_units},
    writer::save_postprocessed,
};

mod cli;

fn main() -> ExitCode {
    let clargs = cli::Cli::parse();
    if let Err(e) = main_inner(clargs) {
        eprintln!("ERROR: {e:?}");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn main_inner(clargs: cli::Cli) -> error_stack::Result<(), CliError> {
    let level = clargs.verbosity.log_level_filter();
    match clargs.command {
        cli::Commands::Run(run_cli) => {
            let config = load_config(&run_cli.config_file)?;
            init_logging(level, config.log_file.as_deref())
                .change_context_lazy(|| CliError::context("Error setting up logging"))?;
            run_driver(&config)
        }
        cli::Commands::Template(template_cli) => {
            RunConfig::write_template_example(&template_cli.template_file)
                .change_context_lazy(|| CliError::context("Error writing the configuration template"))
        }
        cli::Commands::Debug(debug_cli) => {
            let config = load_config(&debug_cli.config_file)?;
            println!("Configuration:\n\n{config:#?}");
            Ok(())
        }
    }
}

/// Build, convert and write the output of every configured component in turn.
fn run_driver(config: &RunConfig) -> error_stack::Result<(), CliError> {
    let opts = config.build_options();

    std::fs::create_dir_all(&config.processed_path).change_context_lazy(|| {
        CliError::context(format!(
            "Error creating output directory {}",
            config.processed_path.display()
        ))
    })?;

    for &component in config.components.iter() {
        log::info!("Processing {component} output of case {}", config.case);
        let ds = create_dataset(&config.raw_path, &config.case, component, &opts)
            .change_context_lazy(|| CliError::context(format!("Error building the {component} dataset")))?;

        let ds = fix_names(&fix_units(&ds));
        let ds = match component {
            Component::Atm => ghan_decomposition(&ds)
                .change_context_lazy(|| CliError::context("Error computing the forcing decomposition"))?
                .into_dataset(),
            Component::Lnd => ds,
        };

        let written = save_postprocessed(
            &ds,
            component,
            &config.processed_path,
            config.case_alias(),
            config.pressure_vars,
            config.write_mode,
        )
        .change_context_lazy(|| CliError::context(format!("Error writing the {component} files")))?;
        log::info!("{} {component} file(s) written to {}", written.len(), config.processed_path.display());
    }

    Ok(())
}

fn load_config(config_file: &Path) -> error_stack::Result<RunConfig, CliError> {
    RunConfig::load(config_file).change_context_lazy(|| {
        CliError::context(format!(
            "Error loading configuration file: {}",
            config_file.display()
        ))
    })
}

/// Program error type
#[derive(Debug, thiserror::Error)]
enum CliError {
    /// Wrapper type used to add information to an inner error.
    #[error("{0}")]
    Context(String),
}

impl CliError {
    fn context<S: ToString>(ctx: S) -> Self {
        Self::Context(ctx.to_string())
    }
}
