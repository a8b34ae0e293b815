//! Configuration loading from the file system

use std::path::{Path, PathBuf};

use tracing::{info, instrument, warn};

use super::defaults::CONFIG_FILE_NAME;
use super::types::Config;

/// `<config_dir>/clipkeep/config.json`
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(shellexpand::tilde("~/.config").as_ref()))
        .join("clipkeep")
        .join(CONFIG_FILE_NAME)
}

/// Load configuration from `path`, or the default location when `None`.
///
/// Returns `Config::default()` if the file is missing or cannot be parsed.
#[instrument(name = "load_config")]
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path
        .map(|p| PathBuf::from(shellexpand::tilde(&p.to_string_lossy()).as_ref()))
        .unwrap_or_else(default_config_path);

    let contents = match std::fs::read_to_string(&config_path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %config_path.display(), "Config file not found, using defaults");
            return Config::default();
        }
        Err(e) => {
            warn!(path = %config_path.display(), error = %e, "Failed to read config, using defaults");
            return Config::default();
        }
    };

    match serde_json::from_str::<Config>(&contents) {
        Ok(config) => {
            info!(path = %config_path.display(), "Successfully loaded config");
            config
        }
        Err(e) => {
            warn!(
                path = %config_path.display(),
                error = %e,
                "Failed to parse config JSON, using defaults"
            );
            Config::default()
        }
    }
}
