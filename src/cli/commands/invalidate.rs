use anyhow::{Context, Result};
use std::path::PathBuf;

use super::load_config_file;
use crate::cache::{CacheStore, SqliteCacheStore};
use crate::config::{ResolveOptions, resolve_cache_path};
use crate::status;
use crate::ui::Style;

pub struct InvalidateOptions {
    pub config: Option<PathBuf>,
    pub entity_type: String,
    pub entity_id: i64,
    pub cache_path: Option<PathBuf>,
}

/// Deletes every cached translation of one entity.
///
/// Only the cache is touched; no backend configuration is needed.
pub fn run_invalidate(options: &InvalidateOptions) -> Result<()> {
    let file_config = load_config_file(options.config.as_deref())?;
    let resolve_options = ResolveOptions {
        cache_path: options.cache_path.clone(),
        ..ResolveOptions::default()
    };
    let cache_path = resolve_cache_path(&resolve_options, &file_config)?;

    let store = SqliteCacheStore::open(&cache_path)?;
    let removed = store
        .invalidate_entity(&options.entity_type, options.entity_id)
        .with_context(|| {
            format!(
                "Failed to invalidate {} {}",
                options.entity_type, options.entity_id
            )
        })?;

    status!(
        "{} Removed {} cached translations of {} {}",
        Style::success("✓"),
        removed,
        options.entity_type,
        options.entity_id
    );
    println!("{removed}");

    Ok(())
}
