pub(crate) mod acquire;
pub(crate) mod config;
pub(crate) mod missing;
pub(crate) mod publish;

use std::path::{Path, PathBuf};

use card_stash_core::AcquireConfig;

use crate::cli_types::DirArgs;
use crate::error::CliError;

/// The settings file in effect: `--config` or the default location.
pub(crate) fn settings_file(cli_config: Option<&Path>) -> PathBuf {
    cli_config
        .map(Path::to_path_buf)
        .unwrap_or_else(card_stash_lib::settings::settings_path)
}

/// Load the settings file and apply directory overrides.
pub(crate) fn load_config(
    cli_config: Option<&Path>,
    dirs: &DirArgs,
) -> Result<AcquireConfig, CliError> {
    let path = settings_file(cli_config);
    let mut config = card_stash_lib::settings::load_config(&path)?;
    if let Some(dir) = &dirs.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(dir) = &dirs.image_dir {
        config.image_dir = dir.clone();
    }
    Ok(config)
}
