//! Configuration loading and saving.

use crate::config::{Config, config_file_path};
use crate::error::{Error, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Load configuration from a TOML file.
///
/// A missing file yields the defaults; any other read failure is an error.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No config at {}, using defaults", path.display());
            return Ok(Config::default());
        }
        Err(e) => {
            return Err(Error::ConfigRead {
                path: path.to_path_buf(),
                source: e,
            });
        }
    };

    toml::from_str(&contents).map_err(|e| Error::ConfigParse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load configuration from the platform config directory.
///
/// Falls back to the defaults when the platform has no config directory.
pub fn load_default_config() -> Result<Config> {
    match config_file_path() {
        Ok(path) => load_config_file(&path),
        Err(_) => Ok(Config::default()),
    }
}

/// Write configuration as pretty TOML, creating parent directories.
pub fn save_config(config: &Config, path: &Path) -> Result<()> {
    let write_error = |source| Error::ConfigWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    let contents = toml::to_string_pretty(config).map_err(|e| Error::ConfigSerialize { source: e })?;
    std::fs::write(path, contents).map_err(write_error)
}

/// Write configuration to the platform config directory and return its path.
pub fn save_default_config(config: &Config) -> Result<PathBuf> {
    let path = config_file_path()?;
    save_config(config, &path)?;
    Ok(path)
}
