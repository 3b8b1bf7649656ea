//! Subcommand implementations.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::cache::SqliteCacheStore;
use crate::config::{ConfigFile, ConfigManager, ResolvedConfig};
use crate::translation::{BackendClient, Orchestrator};

/// Configure command handler.
pub mod configure;

/// Language detection command handler.
pub mod detect;

/// Cache invalidation command handler.
pub mod invalidate;

/// Batch item translation command handler.
pub mod items;

/// Cache statistics command handler.
pub mod stats;

/// Single-field translation command handler.
pub mod translate;

/// Returns the manager for `--config`, or for the XDG location.
pub fn config_manager(config_path: Option<&Path>) -> Result<ConfigManager> {
    match config_path {
        Some(path) => Ok(ConfigManager::with_path(path)),
        None => ConfigManager::new(),
    }
}

/// Loads the config file. An explicit `--config` file must exist.
pub fn load_config_file(config_path: Option<&Path>) -> Result<ConfigFile> {
    let manager = config_manager(config_path)?;
    if config_path.is_some() {
        manager.load()
    } else {
        Ok(manager.load_or_default())
    }
}

fn build_orchestrator(config: &ResolvedConfig) -> Result<Orchestrator> {
    let store = SqliteCacheStore::open(&config.cache_path)?;
    let backend = BackendClient::new(&config.backend)?;

    Ok(Orchestrator::new(
        Arc::new(store),
        Arc::new(backend),
        config.pipeline.clone(),
    ))
}
