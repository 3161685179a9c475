//! Combined publication file for the web front end.
//!
//! All record documents are merged into a single `pokemonData.js` script,
//! keyed by lower-cased record name:
//!
//! ```text
//! // pokemonData.js - ...
//! var pokemonData = { "pikachu": { "data": [...] }, ... };
//!
//! console.log('Pokémon data loaded for local development');
//! ```

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::StoreError;
use crate::store::{CatalogStore, backup_path};

const HEADER: &str = "// pokemonData.js - Contains all Pokémon card data for local development\n\
// This file was automatically generated from JSON files in the data directory\n\n";
const FOOTER: &str = "console.log('Pokémon data loaded for local development');\n";

/// Result of a [`publish`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    pub output: PathBuf,
    pub records: usize,
    /// Documents that could not be read or parsed and were left out.
    pub skipped: Vec<PathBuf>,
    pub backup_created: bool,
}

/// Merge every record document of `store` into the script at `output`.
///
/// Bare card arrays are wrapped as `{"data": [...]}`. An existing output
/// file is copied to `<output>.bak` before being replaced.
pub fn publish(store: &CatalogStore, output: &Path) -> Result<PublishReport, StoreError> {
    let mut merged = Map::new();
    let mut skipped = Vec::new();

    for name in store.list()? {
        let path = store.locate(&name)?;
        let value = match read_document(&path) {
            Ok(v) => v,
            Err(e) => {
                log::error!("Leaving {} out of {}: {}", path.display(), output.display(), e);
                skipped.push(path);
                continue;
            }
        };
        let entry = match value {
            Value::Object(ref map) if map.contains_key("data") => value,
            other => {
                let mut wrapped = Map::new();
                wrapped.insert("data".to_string(), other);
                Value::Object(wrapped)
            }
        };
        merged.insert(name.to_string(), entry);
    }

    if merged.is_empty() {
        return Err(StoreError::NothingToPublish(store.data_dir().to_path_buf()));
    }

    let records = merged.len();
    let body = serde_json::to_string_pretty(&Value::Object(merged))
        .map_err(|e| StoreError::document(output, e.into()))?;
    let script = format!("{HEADER}var pokemonData = {body};\n\n{FOOTER}");

    let mut backup_created = false;
    if output.exists() {
        let backup = backup_path(output);
        fs::copy(output, &backup).map_err(|e| StoreError::io(&backup, e))?;
        backup_created = true;
    }

    let tmp = output.with_extension("js.tmp");
    let written = fs::File::create(&tmp)
        .and_then(|mut f| {
            f.write_all(script.as_bytes())?;
            f.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, output));
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::io(output, e));
    }

    log::info!("Published {} records to {}", records, output.display());
    Ok(PublishReport {
        output: output.to_path_buf(),
        records,
        skipped,
        backup_created,
    })
}

fn read_document(path: &Path) -> Result<Value, String> {
    let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}
