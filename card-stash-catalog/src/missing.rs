//! Scan for cards that have no small image reference.

use card_stash_core::RecordName;

use crate::error::StoreError;
use crate::store::CatalogStore;

/// A card with an empty or absent small image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingCard {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Cards of one record that lack a small image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingImages {
    pub record: RecordName,
    pub total_cards: usize,
    pub cards: Vec<MissingCard>,
}

/// Scan every record (or only `filter`) for cards without a small image.
///
/// Records that fail to load are logged and left out of the result. Records
/// with no missing cards are omitted.
pub fn scan_missing(
    store: &CatalogStore,
    filter: Option<&RecordName>,
) -> Result<Vec<MissingImages>, StoreError> {
    let names = match filter {
        Some(name) => vec![name.clone()],
        None => store.list()?,
    };

    let mut found = Vec::new();
    for name in names {
        let record = match store.load(&name) {
            Ok(r) => r,
            Err(e @ StoreError::NotFound(_)) if filter.is_some() => return Err(e),
            Err(e) => {
                log::error!("Skipping {}: {}", name, e);
                continue;
            }
        };

        let cards: Vec<MissingCard> = record
            .cards()
            .iter()
            .enumerate()
            .filter(|(_, card)| card.small_image().is_none())
            .map(|(index, card)| MissingCard {
                index,
                id: card.id.clone(),
                name: card.name.clone(),
            })
            .collect();

        if !cards.is_empty() {
            found.push(MissingImages {
                record: name,
                total_cards: record.cards().len(),
                cards,
            });
        }
    }
    Ok(found)
}
