//! XDG Base Directory paths for chat0.
//!
//! The CLI and the server resolve their config files and the local chat
//! database through these helpers so both agree on locations.

use std::path::PathBuf;

const APP_DIR: &str = "chat0";

/// Get the chat0 config directory.
///
/// Returns `$XDG_CONFIG_HOME/chat0` if set, otherwise `~/.config/chat0`.
///
/// # Examples
///
/// ```
/// use chat0_paths::config_dir;
///
/// let config = config_dir();
/// let file = config.join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(xdg_config).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".config").join(APP_DIR)
    } else {
        PathBuf::from(".config").join(APP_DIR)
    }
}

/// Get the chat0 data directory.
///
/// Returns `$XDG_DATA_HOME/chat0` if set, otherwise `~/.local/share/chat0`.
/// Conversation history lives here.
pub fn data_dir() -> PathBuf {
    if let Ok(xdg_data) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(xdg_data).join(APP_DIR)
    } else if let Some(home) = dirs::home_dir() {
        home.join(".local/share").join(APP_DIR)
    } else {
        PathBuf::from(".local/share").join(APP_DIR)
    }
}

/// User config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default location of the local conversation database.
pub fn database_path() -> PathBuf {
    data_dir().join("chat0.db")
}
