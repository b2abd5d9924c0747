//! Configuration management
//!
//! All configuration types are exported from this module.

pub mod store;
pub mod types;

pub use store::{AgentConfig, Config, ExecutorConfig, LlmConfig, API_KEY_ENV_VARS};
pub use types::{Provider, ShellKind};

use std::path::PathBuf;

const APP_DIR: &str = "aicmd";
const LOCAL_CONFIG: &str = "aicmd.toml";

/// Find the configuration file in standard locations
///
/// `./aicmd.toml` wins over the per-user file so a project can carry its
/// own settings.
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        let path = cwd.join(LOCAL_CONFIG);
        if path.exists() {
            return Some(path);
        }
    }

    Config::default_path().filter(|path| path.exists())
}

/// Get the configuration directory path
pub fn get_config_dir() -> Option<PathBuf> {
    if let Some(dir) = dirs::config_dir() {
        return Some(dir.join(APP_DIR));
    }

    home::home_dir().map(|home| home.join(".config").join(APP_DIR))
}
