use anyhow::{Context, Result};
use std::path::PathBuf;

use super::load_config_file;
use crate::cache::{CacheStats, CacheStore, SqliteCacheStore};
use crate::config::{ResolveOptions, resolve_cache_path};
use crate::ui::Style;

pub struct StatsOptions {
    pub config: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
    pub json: bool,
}

pub fn run_stats(options: &StatsOptions) -> Result<()> {
    let file_config = load_config_file(options.config.as_deref())?;
    let resolve_options = ResolveOptions {
        cache_path: options.cache_path.clone(),
        ..ResolveOptions::default()
    };
    let cache_path = resolve_cache_path(&resolve_options, &file_config)?;

    let store = SqliteCacheStore::open(&cache_path)?;
    let stats = store.stats()?;

    if options.json {
        let rendered =
            serde_json::to_string_pretty(&stats).context("Failed to serialize cache stats")?;
        println!("{rendered}");
    } else {
        print_stats(&stats, &cache_path.display().to_string());
    }

    Ok(())
}

fn print_stats(stats: &CacheStats, location: &str) {
    println!("{}", Style::header("Cache statistics"));
    println!("  {}       {}", Style::label("path"), Style::secondary(location));
    println!("  {}    {}", Style::label("entries"), Style::value(stats.total));
    println!("  {} {}", Style::label("never used"), Style::value(stats.never_used));

    if !stats.by_target_lang.is_empty() {
        println!();
        println!("{}", Style::header("By target language"));
        for (lang, count) in &stats.by_target_lang {
            println!("  {:9} {}", Style::code(lang), Style::value(count));
        }
    }
}
