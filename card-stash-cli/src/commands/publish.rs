use std::path::Path;

use card_stash_catalog::CatalogStore;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::cli_types::DirArgs;
use crate::error::CliError;

/// Run the publish command.
pub(crate) fn run_publish(
    dirs: &DirArgs,
    output: &Path,
    settings: Option<&Path>,
) -> Result<(), CliError> {
    let config = super::load_config(settings, dirs)?;
    let store = CatalogStore::open(&config.data_dir)?;
    publish_and_report(&store, output)
}

/// Regenerate the publication file and print the result.
pub(crate) fn publish_and_report(store: &CatalogStore, output: &Path) -> Result<(), CliError> {
    let report = card_stash_catalog::publish(store, output)?;

    if report.backup_created {
        log::info!(
            "  Previous file backed up to {}",
            card_stash_catalog::backup_path(output)
                .display()
                .if_supports_color(Stdout, |t| t.dimmed()),
        );
    }
    for path in &report.skipped {
        log::warn!(
            "  {} {} could not be read and was left out",
            "\u{2718}".if_supports_color(Stdout, |t| t.red()),
            path.display(),
        );
    }
    log::info!(
        "{} Created {} with data from {} records",
        "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        report.output.display().if_supports_color(Stdout, |t| t.cyan()),
        report.records,
    );
    Ok(())
}
