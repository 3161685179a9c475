//! Record document storage.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use card_stash_core::{Record, RecordName};

use crate::error::StoreError;

/// Result of [`CatalogStore::save`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Nothing changed; the document was not touched.
    Unchanged,
    /// The document was rewritten.
    Written { backup_created: bool },
}

/// A directory of `<name>.json` record documents.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    data_dir: PathBuf,
}

impl CatalogStore {
    /// Open an existing data directory.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        if !data_dir.is_dir() {
            return Err(StoreError::DirNotFound(data_dir));
        }
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// All record names in the directory, sorted.
    pub fn list(&self) -> Result<Vec<RecordName>, StoreError> {
        let mut names: Vec<RecordName> = self
            .document_paths()?
            .iter()
            .filter_map(|p| RecordName::from_path(p))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Path of the document for `name`, matching the file stem case-insensitively.
    pub fn locate(&self, name: &RecordName) -> Result<PathBuf, StoreError> {
        let direct = self.data_dir.join(format!("{}.json", name));
        if direct.is_file() {
            return Ok(direct);
        }
        self.document_paths()?
            .into_iter()
            .find(|p| RecordName::from_path(p).as_ref() == Some(name))
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Load and parse a record document.
    pub fn load(&self, name: &RecordName) -> Result<Record, StoreError> {
        let path = self.locate(name)?;
        let text = fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
        Record::from_json(name.clone(), path.clone(), &text)
            .map_err(|e| StoreError::document(&path, e))
    }

    /// Persist a record if it changed.
    ///
    /// The first write of a document copies the original to `<file>.bak`;
    /// later writes leave that backup alone. The new content goes to a temp
    /// file which is synced and renamed over the document.
    pub fn save(&self, record: &mut Record) -> Result<SaveOutcome, StoreError> {
        if !record.is_dirty() {
            return Ok(SaveOutcome::Unchanged);
        }

        let path = record.path().to_path_buf();
        let text = record
            .to_json()
            .map_err(|e| StoreError::document(&path, e))?;

        let mut backup_created = false;
        let backup = backup_path(&path);
        if path.exists() && !backup.exists() {
            fs::copy(&path, &backup).map_err(|e| StoreError::io(&backup, e))?;
            backup_created = true;
        }

        let tmp = path.with_extension("json.tmp");
        let written = write_synced(&tmp, text.as_bytes()).and_then(|()| fs::rename(&tmp, &path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(StoreError::io(&path, e));
        }

        record.mark_clean();
        log::debug!("Saved {}", path.display());
        Ok(SaveOutcome::Written { backup_created })
    }

    fn document_paths(&self) -> Result<Vec<PathBuf>, StoreError> {
        let entries = fs::read_dir(&self.data_dir).map_err(|e| StoreError::io(&self.data_dir, e))?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();
        Ok(paths)
    }
}

/// Sibling backup path: `pikachu.json` -> `pikachu.json.bak`.
pub fn backup_path(path: &Path) -> PathBuf {
    path.with_extension(format!(
        "{}.bak",
        path.extension().and_then(|e| e.to_str()).unwrap_or("")
    ))
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_path_appends_bak() {
        assert_eq!(
            backup_path(Path::new("/data/pikachu.json")),
            PathBuf::from("/data/pikachu.json.bak")
        );
    }
}
