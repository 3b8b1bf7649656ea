//! Tunables of one orchestration pass.

use super::language::{DEFAULT_JAMO_RATIO_THRESHOLD, KOREAN, LanguageClassifier};

pub const DEFAULT_CHUNK_SIZE: usize = 15;
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_SHORT_TEXT_MAX_CHARS: usize = 3;
pub const DEFAULT_MODEL_LABEL: &str = "unknown";

/// Fields exempt from the short-text skip; short place names are legitimate.
pub const DEFAULT_SHORT_TEXT_EXEMPT_FIELDS: &[&str] = &["location"];

/// When a field's text is passed through untranslated.
#[derive(Debug, Clone, PartialEq)]
pub struct SkipRules {
    /// Trimmed texts of at most this many characters are passed through.
    pub short_text_max_chars: usize,
    pub short_text_exempt_fields: Vec<String>,
}

impl Default for SkipRules {
    fn default() -> Self {
        Self {
            short_text_max_chars: DEFAULT_SHORT_TEXT_MAX_CHARS,
            short_text_exempt_fields: DEFAULT_SHORT_TEXT_EXEMPT_FIELDS
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub chunk_size: usize,
    pub concurrency: usize,
    /// Dispatch chunks concurrently; `false` sends them one at a time.
    pub parallel: bool,
    pub jamo_ratio_threshold: f64,
    pub skip: SkipRules,
    /// Declared language assumed for entities that do not carry one.
    pub default_source_lang: String,
    /// Model label stored when the backend does not report one.
    pub model_label: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            parallel: true,
            jamo_ratio_threshold: DEFAULT_JAMO_RATIO_THRESHOLD,
            skip: SkipRules::default(),
            default_source_lang: KOREAN.to_string(),
            model_label: DEFAULT_MODEL_LABEL.to_string(),
        }
    }
}

impl PipelineSettings {
    pub const fn classifier(&self) -> LanguageClassifier {
        LanguageClassifier::new(self.jamo_ratio_threshold)
    }

    /// In-flight backend calls allowed during one pass.
    pub fn effective_concurrency(&self) -> usize {
        if self.parallel {
            self.concurrency.max(1)
        } else {
            1
        }
    }

    pub fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }
}
