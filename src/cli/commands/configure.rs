//! Configure command handler.

use anyhow::Result;
use std::path::Path;

use super::config_manager;
use crate::config::{
    BackendConfig, ConfigFile, DEFAULT_SECRET_ENV, PipelineConfig, ResolveOptions,
    resolve_cache_path, resolve_pipeline,
};
use crate::status;
use crate::translation::{
    DEFAULT_BATCH_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_FALLBACK_URL, DEFAULT_SECRET_HEADER,
    DEFAULT_SINGLE_TIMEOUT, PipelineSettings,
};
use crate::ui::Style;

/// Shows the effective configuration, or writes a starter config file.
pub fn run_configure(config_path: Option<&Path>, show: bool) -> Result<()> {
    let manager = config_manager(config_path)?;

    if show {
        let config = manager.load_or_default();
        return print_config(&config, manager.config_path());
    }

    if manager.config_path().exists() {
        status!(
            "{} Config file already exists at {}",
            Style::warning("!"),
            Style::secondary(manager.config_path().display())
        );
        return Ok(());
    }

    manager.save(&starter_config())?;
    status!(
        "{} Configuration saved to {}",
        Style::success("✓"),
        Style::secondary(manager.config_path().display())
    );
    status!("  Set backend.primary_url and export {DEFAULT_SECRET_ENV} before translating.");

    Ok(())
}

/// A config file with every default spelled out.
fn starter_config() -> ConfigFile {
    let pipeline = PipelineSettings::default();

    ConfigFile {
        backend: BackendConfig {
            fallback_url: Some(DEFAULT_FALLBACK_URL.to_string()),
            secret_env: Some(DEFAULT_SECRET_ENV.to_string()),
            secret_header: Some(DEFAULT_SECRET_HEADER.to_string()),
            connect_timeout_secs: Some(DEFAULT_CONNECT_TIMEOUT.as_secs()),
            single_timeout_secs: Some(DEFAULT_SINGLE_TIMEOUT.as_secs()),
            batch_timeout_secs: Some(DEFAULT_BATCH_TIMEOUT.as_secs()),
            ..BackendConfig::default()
        },
        pipeline: PipelineConfig {
            chunk_size: Some(pipeline.chunk_size),
            concurrency: Some(pipeline.concurrency),
            parallel: Some(pipeline.parallel),
            jamo_ratio_threshold: Some(pipeline.jamo_ratio_threshold),
            short_text_max_chars: Some(pipeline.skip.short_text_max_chars),
            short_text_exempt_fields: Some(pipeline.skip.short_text_exempt_fields),
            default_source_lang: Some(pipeline.default_source_lang),
        },
        ..ConfigFile::default()
    }
}

/// Masks all but the last four characters of a secret.
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let visible: String = chars[chars.len() - 4..].iter().collect();
    format!("****{visible}")
}

fn print_row(label: &str, value: Option<String>) {
    println!(
        "  {:22} {}",
        Style::label(label),
        value.map_or_else(|| Style::secondary("(not set)"), Style::value)
    );
}

fn print_config(config: &ConfigFile, path: &Path) -> Result<()> {
    let options = ResolveOptions::default();
    let pipeline = resolve_pipeline(&options, config)?;
    let cache_path = resolve_cache_path(&options, config)?;
    let backend = &config.backend;

    println!("{}", Style::header("Configuration"));
    print_row("file", Some(path.display().to_string()));
    println!();

    println!("{}", Style::header("Backend"));
    print_row("primary_url", backend.primary_url.clone());
    print_row(
        "fallback_url",
        Some(
            backend
                .fallback_url
                .clone()
                .unwrap_or_else(|| DEFAULT_FALLBACK_URL.to_string()),
        ),
    );
    print_row("secret", backend.get_secret().as_deref().map(mask_secret));
    print_row(
        "secret_env",
        Some(
            backend
                .secret_env
                .clone()
                .unwrap_or_else(|| DEFAULT_SECRET_ENV.to_string()),
        ),
    );
    print_row(
        "secret_header",
        Some(
            backend
                .secret_header
                .clone()
                .unwrap_or_else(|| DEFAULT_SECRET_HEADER.to_string()),
        ),
    );
    println!();

    println!("{}", Style::header("Pipeline"));
    print_row("chunk_size", Some(pipeline.chunk_size.to_string()));
    print_row("concurrency", Some(pipeline.concurrency.to_string()));
    print_row("parallel", Some(pipeline.parallel.to_string()));
    print_row(
        "jamo_ratio_threshold",
        Some(pipeline.jamo_ratio_threshold.to_string()),
    );
    print_row(
        "short_text_max_chars",
        Some(pipeline.skip.short_text_max_chars.to_string()),
    );
    print_row(
        "short_text_exempt",
        Some(pipeline.skip.short_text_exempt_fields.join(", ")),
    );
    print_row("default_source_lang", Some(pipeline.default_source_lang));
    print_row("model", Some(pipeline.model_label));
    println!();

    println!("{}", Style::header("Cache"));
    print_row("path", Some(cache_path.display().to_string()));

    Ok(())
}
