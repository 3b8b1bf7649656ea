use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::paths;
use crate::translation::{
    BackendSettings, DEFAULT_FALLBACK_URL, DEFAULT_SECRET_HEADER, PipelineSettings,
    validate_language,
};

/// Environment variable read for the shared secret when `secret_env` is unset.
pub const DEFAULT_SECRET_ENV: &str = "TRANSCACHE_SECRET";

/// `[backend]` section of config.toml.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Primary translation backend URL.
    pub primary_url: Option<String>,
    /// Loopback URL tried after the primary fails. An empty string disables it.
    pub fallback_url: Option<String>,
    /// Shared secret stored directly in config (not recommended).
    pub secret: Option<String>,
    /// Environment variable holding the shared secret (default `TRANSCACHE_SECRET`).
    pub secret_env: Option<String>,
    pub secret_header: Option<String>,
    pub connect_timeout_secs: Option<u64>,
    pub single_timeout_secs: Option<u64>,
    pub batch_timeout_secs: Option<u64>,
    /// Model label recorded on cache entries when the backend reports none.
    pub model: Option<String>,
}

impl BackendConfig {
    /// Gets the shared secret, preferring the environment variable over the config file.
    pub fn get_secret(&self) -> Option<String> {
        let env_var = self.secret_env.as_deref().unwrap_or(DEFAULT_SECRET_ENV);
        if let Ok(secret) = std::env::var(env_var)
            && !secret.is_empty()
        {
            return Some(secret);
        }
        self.secret.clone().filter(|s| !s.is_empty())
    }
}

/// `[pipeline]` section of config.toml.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub chunk_size: Option<usize>,
    pub concurrency: Option<usize>,
    pub parallel: Option<bool>,
    pub jamo_ratio_threshold: Option<f64>,
    pub short_text_max_chars: Option<usize>,
    pub short_text_exempt_fields: Option<Vec<String>>,
    pub default_source_lang: Option<String>,
}

/// `[cache]` section of config.toml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub path: Option<PathBuf>,
}

/// The complete configuration file structure.
///
/// Corresponds to `~/.config/transcache/config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Options for resolving configuration.
///
/// Contains CLI overrides that take precedence over config file values.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub primary_url: Option<String>,
    pub fallback_url: Option<String>,
    pub cache_path: Option<PathBuf>,
    pub concurrency: Option<usize>,
    /// Dispatch chunks one at a time.
    pub sequential: bool,
}

/// Resolved configuration after merging CLI arguments and config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub backend: BackendSettings,
    pub pipeline: PipelineSettings,
    pub cache_path: PathBuf,
}

/// Resolves the cache database location.
///
/// # Errors
///
/// Returns an error if no path is configured and the home directory is unknown.
pub fn resolve_cache_path(options: &ResolveOptions, config_file: &ConfigFile) -> Result<PathBuf> {
    match options.cache_path.as_ref().or(config_file.cache.path.as_ref()) {
        Some(path) => Ok(path.clone()),
        None => paths::default_cache_path(),
    }
}

/// Resolves pipeline tunables.
///
/// # Errors
///
/// Returns an error if a tunable is out of range or the default source
/// language is not a supported tag.
pub fn resolve_pipeline(
    options: &ResolveOptions,
    config_file: &ConfigFile,
) -> Result<PipelineSettings> {
    let file = &config_file.pipeline;
    let mut settings = PipelineSettings::default();

    if let Some(chunk_size) = file.chunk_size {
        settings.chunk_size = chunk_size;
    }
    if let Some(concurrency) = options.concurrency.or(file.concurrency) {
        settings.concurrency = concurrency;
    }
    if let Some(parallel) = file.parallel {
        settings.parallel = parallel;
    }
    if options.sequential {
        settings.parallel = false;
    }
    if let Some(threshold) = file.jamo_ratio_threshold {
        settings.jamo_ratio_threshold = threshold;
    }
    if let Some(max_chars) = file.short_text_max_chars {
        settings.skip.short_text_max_chars = max_chars;
    }
    if let Some(fields) = &file.short_text_exempt_fields {
        settings.skip.short_text_exempt_fields.clone_from(fields);
    }
    if let Some(lang) = &file.default_source_lang {
        settings.default_source_lang.clone_from(lang);
    }
    if let Some(model) = &config_file.backend.model {
        settings.model_label.clone_from(model);
    }

    if settings.chunk_size == 0 {
        bail!("Invalid configuration: 'pipeline.chunk_size' must be at least 1");
    }
    if settings.concurrency == 0 {
        bail!("Invalid configuration: 'pipeline.concurrency' must be at least 1");
    }
    if !(0.0..=1.0).contains(&settings.jamo_ratio_threshold) {
        bail!(
            "Invalid configuration: 'pipeline.jamo_ratio_threshold' must be between 0 and 1, got {}",
            settings.jamo_ratio_threshold
        );
    }
    validate_language(&settings.default_source_lang)
        .context("Invalid configuration: 'pipeline.default_source_lang'")?;

    Ok(settings)
}

fn resolve_backend(options: &ResolveOptions, config_file: &ConfigFile) -> Result<BackendSettings> {
    let file = &config_file.backend;

    let primary_url = options
        .primary_url
        .as_ref()
        .or(file.primary_url.as_ref())
        .filter(|url| !url.trim().is_empty())
        .cloned()
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Missing required configuration: 'backend.primary_url'\n\n\
                 Please provide it via:\n  \
                 - CLI option: transcache --primary-url <url>\n  \
                 - Config file: ~/.config/transcache/config.toml"
            )
        })?;

    let Some(secret) = file.get_secret() else {
        let env_var = file.secret_env.as_deref().unwrap_or(DEFAULT_SECRET_ENV);
        bail!(
            "Missing required configuration: backend shared secret\n\n\
             Set the {env_var} environment variable:\n  \
             export {env_var}=\"your-shared-secret\"\n\n\
             Or set secret in ~/.config/transcache/config.toml"
        );
    };

    let fallback_url = options
        .fallback_url
        .clone()
        .or_else(|| file.fallback_url.clone())
        .unwrap_or_else(|| DEFAULT_FALLBACK_URL.to_string());

    let mut settings = BackendSettings::new(primary_url, Some(secret));
    settings.fallback_url = Some(fallback_url).filter(|url| !url.trim().is_empty());
    settings.secret_header = file
        .secret_header
        .clone()
        .unwrap_or_else(|| DEFAULT_SECRET_HEADER.to_string());
    if let Some(secs) = file.connect_timeout_secs {
        settings.connect_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = file.single_timeout_secs {
        settings.single_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = file.batch_timeout_secs {
        settings.batch_timeout = Duration::from_secs(secs);
    }

    Ok(settings)
}

/// Resolves configuration by merging CLI options with config file settings.
///
/// CLI options take precedence over config file values, which take
/// precedence over built-in defaults.
///
/// # Errors
///
/// Returns an error if the primary URL or the shared secret is missing, or
/// if a pipeline tunable is invalid.
pub fn resolve_config(options: &ResolveOptions, config_file: &ConfigFile) -> Result<ResolvedConfig> {
    Ok(ResolvedConfig {
        backend: resolve_backend(options, config_file)?,
        pipeline: resolve_pipeline(options, config_file)?,
        cache_path: resolve_cache_path(options, config_file)?,
    })
}

/// Manages loading and saving configuration files.
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Creates a new config manager.
    ///
    /// Configuration is stored at `$XDG_CONFIG_HOME/transcache/config.toml`
    /// or `~/.config/transcache/config.toml` if `XDG_CONFIG_HOME` is not set.
    pub fn new() -> Result<Self> {
        Ok(Self {
            config_path: paths::config_dir()?.join("config.toml"),
        })
    }

    /// Uses an explicit config file instead of the XDG location.
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> Result<ConfigFile> {
        let contents = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;

        let config_file: ConfigFile = toml::from_str(&contents).with_context(|| {
            format!("Failed to parse config file: {}", self.config_path.display())
        })?;

        Ok(config_file)
    }

    pub fn save(&self, config: &ConfigFile) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(&self.config_path, contents).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;

        Ok(())
    }

    /// Loads the config file, falling back to defaults when it is absent.
    ///
    /// A file that exists but does not parse is reported and ignored.
    pub fn load_or_default(&self) -> ConfigFile {
        if !self.config_path.exists() {
            return ConfigFile::default();
        }
        self.load().unwrap_or_else(|err| {
            warn!(error = %format!("{err:#}"), "ignoring unreadable config file");
            ConfigFile::default()
        })
    }
}
