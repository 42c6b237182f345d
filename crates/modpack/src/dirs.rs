//! Platform directories used by modpack

use std::path::PathBuf;

use etcetera::BaseStrategy;

/// Application directory name under the platform config root
const APP_DIR: &str = "modpack";

/// Name of the configuration file, both per-user and per-project
pub const CONFIG_FILE_NAME: &str = "modpack.toml";

/// Per-user configuration directory, e.g. `~/.config/modpack`
pub fn user_config_dir() -> Option<PathBuf> {
    match etcetera::choose_base_strategy() {
        Ok(strategy) => Some(strategy.config_dir().join(APP_DIR)),
        Err(e) => {
            log::debug!("No home directory available for user config: {e}");
            None
        }
    }
}

/// Per-user configuration file, whether or not it exists
pub fn user_config_file() -> Option<PathBuf> {
    user_config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}
