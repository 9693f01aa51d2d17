//! Configuration paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/probe-runner/`
//! - macOS: `~/Library/Application Support/probe-runner/`
//! - Windows: `%APPDATA%\probe-runner\`

use std::path::PathBuf;

/// Name used for the configuration directory
const APP_NAME: &str = "probe-runner";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
