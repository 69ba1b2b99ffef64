//! Configuration and log file locations
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/docker-proxy-itest/`
//! - macOS: `~/Library/Application Support/docker-proxy-itest/`
//! - Windows: `%APPDATA%\docker-proxy-itest\`

use std::path::PathBuf;

/// Name used for per-user directories
const APP_NAME: &str = "docker-proxy-itest";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}
