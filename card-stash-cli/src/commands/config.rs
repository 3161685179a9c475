use std::path::Path;

use card_stash_core::AcquireConfig;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::cli_types::DirArgs;
use crate::error::CliError;

/// Print the settings file path.
pub(crate) fn run_config_path(settings: Option<&Path>) {
    log::info!("{}", super::settings_file(settings).display());
}

/// Show the effective configuration.
pub(crate) fn run_config_show(settings: Option<&Path>) -> Result<(), CliError> {
    let path = super::settings_file(settings);
    let config = super::load_config(settings, &DirArgs::default())?;

    log::info!(
        "{}",
        "card-stash Configuration".if_supports_color(Stdout, |t| t.bold()),
    );
    log::info!("");
    if path.exists() {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(exists)".if_supports_color(Stdout, |t| t.green()),
        );
    } else {
        log::info!(
            "  Settings file: {} {}",
            path.display().if_supports_color(Stdout, |t| t.cyan()),
            "(not found, using defaults)".if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    log::info!("");

    let text = card_stash_lib::settings::config_to_string(&config)?;
    for line in text.lines() {
        log::info!("  {}", line);
    }

    if let Err(e) = config.validate() {
        log::warn!(
            "  {} {}",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            e,
        );
    }
    Ok(())
}

/// Write a settings file with the default values.
pub(crate) fn run_config_init(settings: Option<&Path>, force: bool) -> Result<(), CliError> {
    let path = super::settings_file(settings);
    card_stash_lib::settings::write_config(&path, &AcquireConfig::default(), force)?;
    log::info!(
        "{} Settings written to {}",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        path.display().if_supports_color(Stdout, |t| t.cyan()),
    );
    Ok(())
}
