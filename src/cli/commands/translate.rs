use anyhow::{Result, bail};
use std::path::PathBuf;

use super::{build_orchestrator, load_config_file};
use crate::cli::BackendArgs;
use crate::config::{ResolveOptions, resolve_config};
use crate::input::InputReader;
use crate::translation::validate_language;
use crate::ui::Spinner;

pub struct TranslateOptions {
    pub config: Option<PathBuf>,
    pub text: Option<String>,
    pub entity_type: String,
    pub entity_id: i64,
    pub field: String,
    pub from: Option<String>,
    pub to: String,
    pub backend: BackendArgs,
}

/// Translates one field and prints the result to stdout.
///
/// Translation failures still print the original text; only configuration
/// and input errors fail the command.
pub async fn run_translate(options: TranslateOptions) -> Result<()> {
    validate_language(&options.to)?;
    if let Some(from) = &options.from {
        validate_language(from)?;
    }

    let file_config = load_config_file(options.config.as_deref())?;
    let config = resolve_config(&ResolveOptions::from(&options.backend), &file_config)?;

    let text = InputReader::read_text(options.text.as_deref())?;
    if text.trim().is_empty() {
        bail!("Input is empty");
    }

    let orchestrator = build_orchestrator(&config)?;

    let spinner = Spinner::new("Translating...");
    let translated = orchestrator
        .translate_one(
            &options.entity_type,
            options.entity_id,
            &options.field,
            &text,
            options.from.as_deref(),
            &options.to,
        )
        .await;
    spinner.stop();

    println!("{translated}");
    Ok(())
}
