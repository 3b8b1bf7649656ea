use anyhow::{Context, Result, anyhow, bail};
use serde_json::Value;
use std::path::PathBuf;

use super::{build_orchestrator, load_config_file};
use crate::cli::BackendArgs;
use crate::config::{ResolveOptions, resolve_config};
use crate::fs::atomic_write;
use crate::input::InputReader;
use crate::status;
use crate::translation::{FieldSpec, Item, Provenance, validate_language};
use crate::ui::{Spinner, Style};

pub struct ItemsOptions {
    pub config: Option<PathBuf>,
    pub file: Option<PathBuf>,
    pub entity_type: String,
    pub to: String,
    pub fields: Vec<FieldSpec>,
    pub detect: Vec<FieldSpec>,
    pub output: Option<PathBuf>,
    pub concurrency: Option<usize>,
    pub sequential: bool,
    pub backend: BackendArgs,
}

impl ItemsOptions {
    /// Declared-language fields followed by detected ones.
    fn field_specs(&self) -> Vec<FieldSpec> {
        self.fields
            .iter()
            .cloned()
            .chain(
                self.detect
                    .iter()
                    .cloned()
                    .map(|spec| spec.with_provenance(Provenance::Text)),
            )
            .collect()
    }
}

/// Parses a JSON array of objects.
pub fn parse_items(input: &str) -> Result<Vec<Item>> {
    let value: Value = serde_json::from_str(input).context("Input is not valid JSON")?;

    let Value::Array(values) = value else {
        bail!("Input must be a JSON array of objects");
    };

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| match value {
            Value::Object(item) => Ok(item),
            _ => Err(anyhow!("Item {index} is not a JSON object")),
        })
        .collect()
}

/// Translates the requested fields of every item and writes the augmented
/// array to stdout or `--output`.
pub async fn run_items(options: ItemsOptions) -> Result<()> {
    validate_language(&options.to)?;

    let fields = options.field_specs();
    if fields.is_empty() {
        bail!(
            "No fields to translate\n\n\
             Pass at least one --field <name> or --detect <name>"
        );
    }

    let file_config = load_config_file(options.config.as_deref())?;
    let resolve_options = ResolveOptions {
        concurrency: options.concurrency,
        sequential: options.sequential,
        ..ResolveOptions::from(&options.backend)
    };
    let config = resolve_config(&resolve_options, &file_config)?;

    let input = InputReader::read(options.file.as_deref())?;
    let mut items = parse_items(&input)?;

    let orchestrator = build_orchestrator(&config)?;

    let spinner = Spinner::new(&format!("Translating {} items...", items.len()));
    let report = orchestrator
        .translate_items(&mut items, &options.to, &options.entity_type, &fields)
        .await;
    spinner.stop();

    let rendered =
        serde_json::to_string_pretty(&items).context("Failed to serialize translated items")?;

    match &options.output {
        Some(path) => {
            atomic_write(path, &format!("{rendered}\n"))?;
            status!(
                "{} Wrote {} items to {}",
                Style::success("✓"),
                items.len(),
                Style::secondary(path.display())
            );
        }
        None => println!("{rendered}"),
    }

    status!(
        "{} {} keys: {} cached, {} translated, {} untranslated",
        Style::label("summary"),
        report.keys,
        report.hits,
        report.translated,
        report.degraded
    );
    if report.rejected_chunks > 0 {
        status!(
            "{} The backend rejected the shared secret for {} chunks; check backend.secret",
            Style::warning("!"),
            report.rejected_chunks
        );
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_items() {
        let items = parse_items(r#"[{"id": 1, "title": "경복궁"}, {"id": 2}]"#).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0]["title"], "경복궁");
    }

    #[test]
    fn test_parse_items_rejects_non_array() {
        let err = parse_items(r#"{"id": 1}"#).unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }

    #[test]
    fn test_parse_items_rejects_non_object_entries() {
        let err = parse_items(r#"[{"id": 1}, 2]"#).unwrap_err();
        assert!(err.to_string().contains("Item 1"));
    }

    #[test]
    fn test_field_specs_mark_detected_fields() {
        let options = ItemsOptions {
            config: None,
            file: None,
            entity_type: "place".to_string(),
            to: "eng_Latn".to_string(),
            fields: vec!["title".parse().unwrap()],
            detect: vec!["location:location_en".parse().unwrap()],
            output: None,
            concurrency: None,
            sequential: false,
            backend: BackendArgs::default(),
        };

        let specs = options.field_specs();

        assert_eq!(specs[0], FieldSpec::entity("title"));
        assert_eq!(specs[1], FieldSpec::detected("location").with_output("location_en"));
    }
}
