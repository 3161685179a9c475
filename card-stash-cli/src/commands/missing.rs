use std::path::Path;

use card_stash_catalog::CatalogStore;
use card_stash_core::RecordName;
use owo_colors::OwoColorize;
use owo_colors::Stream::Stdout;

use crate::cli_types::DirArgs;
use crate::error::CliError;

/// List the cards that have no small image.
pub(crate) fn run_missing(
    dirs: &DirArgs,
    record: Option<&str>,
    settings: Option<&Path>,
) -> Result<(), CliError> {
    let config = super::load_config(settings, dirs)?;
    let store = CatalogStore::open(&config.data_dir)?;
    let filter = record.map(RecordName::new);
    let found = card_stash_catalog::scan_missing(&store, filter.as_ref())?;

    if found.is_empty() {
        log::info!(
            "{} Every card has a small image",
            "\u{2714}".if_supports_color(Stdout, |t| t.green()),
        );
        return Ok(());
    }

    let mut total = 0;
    for missing in &found {
        log::info!(
            "{} {}",
            missing.record.as_str().if_supports_color(Stdout, |t| t.bold()),
            format!("({} of {} cards)", missing.cards.len(), missing.total_cards)
                .if_supports_color(Stdout, |t| t.dimmed()),
        );
        for card in &missing.cards {
            log::info!(
                "  #{} {} {}",
                card.index,
                card.id.as_deref().unwrap_or("-"),
                card.name.as_deref().unwrap_or(""),
            );
        }
        total += missing.cards.len();
    }
    log::info!("");
    log::warn!(
        "{} {} cards in {} records have no small image",
        "?".if_supports_color(Stdout, |t| t.yellow()),
        total,
        found.len(),
    );
    Ok(())
}
