use std::path::PathBuf;

use card_stash_catalog::StoreError;
use card_stash_core::ConfigError;
use card_stash_scraper::ScrapeError;
use thiserror::Error;

/// Errors that stop a run before its first batch.
///
/// Per-record and per-asset failures never surface here; they are logged,
/// reported as events and counted in the summary.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Data directory missing, or the filtered record does not exist
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Registry unreadable, HTTP client or renderer could not start
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
}

/// Errors reading or writing the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Settings file already exists: {0}")]
    AlreadyExists(PathBuf),
}
