//! Settings file handling.
//!
//! The settings file is `~/.config/card-stash/config.toml`. Run options live
//! in its `[acquire]` table; any key left out keeps its default.

use std::path::{Path, PathBuf};

use card_stash_core::AcquireConfig;
use serde::{Deserialize, Serialize};

use crate::error::SettingsError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    acquire: AcquireConfig,
}

/// Canonical path to the settings file: `~/.config/card-stash/config.toml`.
pub fn settings_path() -> PathBuf {
    let config = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    config.join("card-stash").join("config.toml")
}

/// Load the `[acquire]` table from `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<AcquireConfig, SettingsError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::debug!("No settings file at {}, using defaults", path.display());
            return Ok(AcquireConfig::default());
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let file: SettingsFile = toml::from_str(&contents).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.acquire)
}

/// `config` rendered as a settings file.
pub fn config_to_string(config: &AcquireConfig) -> Result<String, SettingsError> {
    let file = SettingsFile {
        acquire: config.clone(),
    };
    Ok(toml::to_string_pretty(&file)?)
}

/// Write `config` to `path` atomically. Refuses to replace an existing file
/// unless `force` is set.
pub fn write_config(path: &Path, config: &AcquireConfig, force: bool) -> Result<(), SettingsError> {
    if path.exists() && !force {
        return Err(SettingsError::AlreadyExists(path.to_path_buf()));
    }
    let serialized = config_to_string(config)?;
    let io_err = |source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, serialized).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
