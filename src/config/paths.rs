//! Platform-specific configuration paths.

use crate::constants::{APP_NAME, CONFIG_FILE_NAME};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Configuration directory for the current platform.
///
/// - Linux: `~/.config/geotiler/`
/// - macOS: `~/Library/Application Support/geotiler/`
/// - Windows: `%APPDATA%\geotiler\config\`
pub fn config_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", APP_NAME).ok_or(Error::ConfigDirNotFound)?;
    Ok(dirs.config_dir().to_path_buf())
}

/// Path of the default `config.toml`.
pub fn config_file_path() -> Result<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}
