//! Request coalescing: folds every (item, field) pair of a pass into one
//! request per cache key.

use anyhow::{Result, bail};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{trace, warn};

use super::language::{LanguageClassifier, UNKNOWN};
use super::settings::{PipelineSettings, SkipRules};
use crate::cache::{CacheKey, source_digest};

/// One content object handed over by the caller.
pub type Item = Map<String, Value>;

/// Item key holding the entity id.
pub const ID_FIELD: &str = "id";
/// Item key holding the entity's declared language.
pub const SOURCE_LANG_FIELD: &str = "source_lang";
pub const OUTPUT_SUFFIX: &str = "_translated";

/// Where a field's source language comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// The owning entity's declared `source_lang`.
    Entity,
    /// Detected from the field's own text.
    Text,
}

/// A field to translate and where its result goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub source_field: String,
    pub output_field: String,
    pub provenance: Provenance,
}

impl FieldSpec {
    /// A field written in the entity's declared language.
    pub fn entity(field: impl Into<String>) -> Self {
        let source_field = field.into();
        Self {
            output_field: format!("{source_field}{OUTPUT_SUFFIX}"),
            source_field,
            provenance: Provenance::Entity,
        }
    }

    /// A field whose language is detected from its text.
    pub fn detected(field: impl Into<String>) -> Self {
        Self {
            provenance: Provenance::Text,
            ..Self::entity(field)
        }
    }

    #[must_use]
    pub fn with_output(mut self, output_field: impl Into<String>) -> Self {
        self.output_field = output_field.into();
        self
    }

    #[must_use]
    pub const fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }
}

/// Parses `field` or `field:output`; provenance is [`Provenance::Entity`].
impl FromStr for FieldSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (source, output) = match s.split_once(':') {
            Some((source, output)) => (source.trim(), Some(output.trim())),
            None => (s.trim(), None),
        };

        if source.is_empty() {
            bail!("Field name is empty in '{s}'");
        }

        match output {
            Some("") => bail!("Output field name is empty in '{s}'"),
            Some(output) => Ok(Self::entity(source).with_output(output)),
            None => Ok(Self::entity(source)),
        }
    }
}

/// Where one translated value must be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumer {
    pub item_index: usize,
    pub output_field: String,
}

/// Everything that wants the translation of one cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoalescedRequest {
    pub key: CacheKey,
    pub text: String,
    /// Effective source language of `text`.
    pub source_lang: String,
    pub source_hash: String,
    pub consumers: Vec<Consumer>,
}

impl CoalescedRequest {
    /// Writes `translated` into every consumer's output field.
    pub fn apply(&self, items: &mut [Item], translated: &str) {
        for consumer in &self.consumers {
            if let Some(item) = items.get_mut(consumer.item_index) {
                item.insert(
                    consumer.output_field.clone(),
                    Value::String(translated.to_string()),
                );
            }
        }
    }
}

/// Why a field bypasses cache and backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    SameLanguage,
    UnknownLanguage,
    TooShort,
}

/// Decides whether a field is passed through untranslated.
///
/// The short-text rule only covers detected fields: a declared-language title
/// such as "경복궁" is a real translation candidate.
pub fn skip_reason(
    text: &str,
    field: &str,
    provenance: Provenance,
    source_lang: &str,
    target_lang: &str,
    rules: &SkipRules,
) -> Option<SkipReason> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(SkipReason::Empty);
    }
    if source_lang == target_lang {
        return Some(SkipReason::SameLanguage);
    }
    if source_lang == UNKNOWN {
        return Some(SkipReason::UnknownLanguage);
    }
    if provenance == Provenance::Text
        && trimmed.chars().count() <= rules.short_text_max_chars
        && !rules.short_text_exempt_fields.iter().any(|f| f == field)
    {
        return Some(SkipReason::TooShort);
    }
    None
}

/// Entity id of an item: an integer or numeric string under `id`, else 0.
pub fn entity_id(item: &Item) -> i64 {
    match item.get(ID_FIELD) {
        Some(Value::Number(n)) => n.as_i64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    }
}

fn field_text(item: &Item, field: &str) -> String {
    item.get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

pub struct RequestCoalescer<'a> {
    classifier: LanguageClassifier,
    rules: &'a SkipRules,
    default_source_lang: &'a str,
}

impl<'a> RequestCoalescer<'a> {
    pub fn new(settings: &'a PipelineSettings) -> Self {
        Self {
            classifier: settings.classifier(),
            rules: &settings.skip,
            default_source_lang: settings.default_source_lang.as_str(),
        }
    }

    fn declared_lang<'i>(&self, item: &'i Item) -> &'i str
    where
        'a: 'i,
    {
        item.get(SOURCE_LANG_FIELD)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|lang| !lang.is_empty())
            .unwrap_or(self.default_source_lang)
    }

    /// Groups every translatable (item, field) pair by cache key.
    ///
    /// Fields that are skipped get their original text written to the output
    /// field right away and never appear in the result.
    pub fn coalesce(
        &self,
        items: &mut [Item],
        entity_type: &str,
        target_lang: &str,
        fields: &[FieldSpec],
    ) -> BTreeMap<CacheKey, CoalescedRequest> {
        let mut requests: BTreeMap<CacheKey, CoalescedRequest> = BTreeMap::new();

        for (item_index, item) in items.iter_mut().enumerate() {
            let id = entity_id(item);

            for spec in fields {
                let text = field_text(item, &spec.source_field);
                let source_lang = match spec.provenance {
                    Provenance::Entity => self.declared_lang(item).to_string(),
                    Provenance::Text => self.classifier.classify(&text).to_string(),
                };

                if let Some(reason) = skip_reason(
                    &text,
                    &spec.source_field,
                    spec.provenance,
                    &source_lang,
                    target_lang,
                    self.rules,
                ) {
                    trace!(
                        entity_id = id,
                        field = %spec.source_field,
                        ?reason,
                        "passing field through"
                    );
                    item.insert(spec.output_field.clone(), Value::String(text));
                    continue;
                }

                let key = CacheKey::new(entity_type, id, spec.source_field.as_str(), target_lang);
                let consumer = Consumer {
                    item_index,
                    output_field: spec.output_field.clone(),
                };

                match requests.get_mut(&key) {
                    Some(request) => {
                        if request.text != text {
                            warn!(
                                key = %key,
                                item_index,
                                "conflicting texts for one key, keeping the first"
                            );
                        }
                        request.consumers.push(consumer);
                    }
                    None => {
                        let request = CoalescedRequest {
                            key: key.clone(),
                            source_hash: source_digest(&text),
                            text,
                            source_lang,
                            consumers: vec![consumer],
                        };
                        requests.insert(key, request);
                    }
                }
            }
        }

        requests
    }
}
