//! card-stash CLI
//!
//! Downloads the card images referenced by per-Pokémon record files and
//! rewrites the records to point at the local copies.

mod cli_types;
mod commands;
mod error;
mod logging;
mod spinner;

use clap::Parser;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::cli_types::{Cli, Commands, ConfigAction};
use crate::error::CliError;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init(cli.quiet, cli.verbose, cli.logfile.as_deref()) {
        eprintln!("Could not set up logging: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli) {
        log::error!(
            "{} {}",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            e,
        );
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let settings = cli.config.as_deref();
    match cli.command {
        Commands::Acquire(args) => commands::acquire::run_acquire(args, settings, cli.quiet),
        Commands::Missing { dirs, record } => {
            commands::missing::run_missing(&dirs, record.as_deref(), settings)
        }
        Commands::Publish { dirs, output } => {
            commands::publish::run_publish(&dirs, &output, settings)
        }
        Commands::Config { action } => match action {
            ConfigAction::Path => {
                commands::config::run_config_path(settings);
                Ok(())
            }
            ConfigAction::Show => commands::config::run_config_show(settings),
            ConfigAction::Init { force } => commands::config::run_config_init(settings, force),
        },
    }
}
