mod manager;

pub use manager::{
    BackendConfig, CacheConfig, ConfigFile, ConfigManager, DEFAULT_SECRET_ENV, PipelineConfig,
    ResolveOptions, ResolvedConfig, resolve_cache_path, resolve_config, resolve_pipeline,
};
