//! XDG-style locations of the configuration file and the translation cache.
//!
//! XDG Base Directory conventions are preferred over OS-specific locations so
//! that servers and developer machines resolve the same layout.

use anyhow::{Context, Result};
use std::path::PathBuf;

const APP_DIR: &str = "transcache";
const CACHE_DB_FILE: &str = "translations.db";

/// Returns the configuration directory.
///
/// Resolution order:
/// 1. `$XDG_CONFIG_HOME/transcache` if `XDG_CONFIG_HOME` is set
/// 2. `~/.config/transcache` otherwise
pub fn config_dir() -> Result<PathBuf> {
    match std::env::var("XDG_CONFIG_HOME") {
        Ok(xdg) if !xdg.is_empty() => Ok(PathBuf::from(xdg).join(APP_DIR)),
        _ => Ok(home_dir()?.join(".config").join(APP_DIR)),
    }
}

/// Returns the cache directory.
///
/// Resolution order:
/// 1. `$XDG_CACHE_HOME/transcache` if `XDG_CACHE_HOME` is set
/// 2. `~/.cache/transcache` otherwise
pub fn cache_dir() -> Result<PathBuf> {
    match std::env::var("XDG_CACHE_HOME") {
        Ok(xdg) if !xdg.is_empty() => Ok(PathBuf::from(xdg).join(APP_DIR)),
        _ => Ok(home_dir()?.join(".cache").join(APP_DIR)),
    }
}

/// Default location of the translation cache database.
pub fn default_cache_path() -> Result<PathBuf> {
    Ok(cache_dir()?.join(CACHE_DB_FILE))
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("Failed to determine home directory")
}
