use anyhow::Result;
use std::path::PathBuf;

use super::load_config_file;
use crate::config::{ResolveOptions, resolve_pipeline};
use crate::input::InputReader;

pub struct DetectOptions {
    pub config: Option<PathBuf>,
    pub text: Option<String>,
}

/// Prints the language tag the classifier assigns to the text.
pub fn run_detect(options: &DetectOptions) -> Result<()> {
    let file_config = load_config_file(options.config.as_deref())?;
    let settings = resolve_pipeline(&ResolveOptions::default(), &file_config)?;

    let text = InputReader::read_text(options.text.as_deref())?;
    println!("{}", settings.classifier().classify(&text));

    Ok(())
}
