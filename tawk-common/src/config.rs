//! Configuration file discovery
//!
//! Resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Platform config directory (`<config_dir>/tawk/<file_name>`)
//! 4. None: caller falls back to built-in defaults

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Locate the configuration file for a module.
///
/// An explicitly requested path (CLI or environment) must exist; a missing
/// platform default is not an error and yields `Ok(None)`.
pub fn resolve_config_file(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    file_name: &str,
) -> Result<Option<PathBuf>> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        debug!("Config file from command line: {}", path.display());
        return require_exists(path.to_path_buf()).map(Some);
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            debug!("Config file from {}: {}", env_var_name, path);
            return require_exists(PathBuf::from(path)).map(Some);
        }
    }

    // Priority 3: Platform config directory
    Ok(default_config_path(file_name).filter(|p| p.exists()))
}

/// `<config_dir>/tawk/<file_name>` for the current platform
pub fn default_config_path(file_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tawk").join(file_name))
}

/// Read a TOML file into `T`
pub fn load_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
}

fn require_exists(path: PathBuf) -> Result<PathBuf> {
    if path.exists() {
        Ok(path)
    } else {
        Err(Error::Config(format!(
            "Config file not found: {}",
            path.display()
        )))
    }
}
