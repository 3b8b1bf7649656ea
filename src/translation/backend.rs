//! Backend abstraction consumed by the pipeline.

use async_trait::async_trait;

use super::BackendError;

/// Label this crate assigns to results that echo the source text after a failure.
pub const ERROR_FALLBACK_PROVIDER: &str = "error_fallback";

/// Labels the backend uses when it gave up and echoed its input.
const DEGRADED_PROVIDER_LABELS: &[&str] = &["fallback", "passthrough", "original", "none"];

/// A single translation with the label of whatever produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translated {
    pub text: String,
    pub provider: String,
    pub model: Option<String>,
}

/// Batch translations, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchTranslated {
    pub texts: Vec<String>,
    pub provider: String,
    pub model: Option<String>,
}

/// Whether `provider` marks a fallback/error path whose output must not be cached.
pub fn is_degraded_provider(provider: &str) -> bool {
    let label = provider.trim().to_ascii_lowercase();
    label.is_empty()
        || label.starts_with("error")
        || DEGRADED_PROVIDER_LABELS.contains(&label.as_str())
}

/// A multilingual translation backend.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn translate_one(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Translated, BackendError>;

    /// Translates `texts` in one call. The result has the same length and
    /// order as `texts`.
    async fn translate_batch(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> Result<BatchTranslated, BackendError>;
}
