use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::ResolveOptions;
use crate::translation::FieldSpec;

#[derive(Parser, Debug)]
#[command(name = "transcache")]
#[command(about = "Cache-aware translation of content fields through a multilingual backend")]
#[command(version)]
pub struct Args {
    /// Config file (default: ~/.config/transcache/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Suppress status messages
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Debug-level logs on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Overrides for the backend and cache settings of config.toml.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct BackendArgs {
    /// Primary translation backend URL
    #[arg(long, value_name = "URL")]
    pub primary_url: Option<String>,

    /// Fallback backend URL ("" disables the fallback)
    #[arg(long, value_name = "URL")]
    pub fallback_url: Option<String>,

    /// Translation cache database
    #[arg(long, value_name = "FILE")]
    pub cache_path: Option<PathBuf>,
}

impl From<&BackendArgs> for ResolveOptions {
    fn from(args: &BackendArgs) -> Self {
        Self {
            primary_url: args.primary_url.clone(),
            fallback_url: args.fallback_url.clone(),
            cache_path: args.cache_path.clone(),
            ..Self::default()
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Translate one field of one entity
    Translate {
        /// Text to translate (reads from stdin if not provided)
        text: Option<String>,

        /// Entity type, e.g. place, review, shortform
        #[arg(long)]
        entity_type: String,

        #[arg(long)]
        entity_id: i64,

        /// Field name the text belongs to
        #[arg(long)]
        field: String,

        /// Source language tag (detected from the text if not provided)
        #[arg(short = 'f', long = "from")]
        from: Option<String>,

        /// Target language tag, e.g. eng_Latn
        #[arg(short = 't', long = "to")]
        to: String,

        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Translate fields of a JSON array of items
    Items {
        /// JSON file with an array of objects (reads from stdin if not provided)
        file: Option<PathBuf>,

        #[arg(long)]
        entity_type: String,

        /// Target language tag, e.g. eng_Latn
        #[arg(short = 't', long = "to")]
        to: String,

        /// Field in the entity's declared language, as FIELD or FIELD:OUTPUT
        #[arg(long = "field", value_name = "FIELD[:OUTPUT]")]
        fields: Vec<FieldSpec>,

        /// Field whose language is detected from its text, as FIELD or FIELD:OUTPUT
        #[arg(long = "detect", value_name = "FIELD[:OUTPUT]")]
        detect: Vec<FieldSpec>,

        /// Write the result to this file instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Maximum concurrent backend calls
        #[arg(long)]
        concurrency: Option<usize>,

        /// Send chunks one at a time
        #[arg(long)]
        sequential: bool,

        #[command(flatten)]
        backend: BackendArgs,
    },
    /// Delete every cached translation of an entity
    Invalidate {
        #[arg(long)]
        entity_type: String,

        #[arg(long)]
        entity_id: i64,

        /// Translation cache database
        #[arg(long, value_name = "FILE")]
        cache_path: Option<PathBuf>,
    },
    /// Print the language tag detected for a text
    Detect {
        /// Text to classify (reads from stdin if not provided)
        text: Option<String>,
    },
    /// List supported language tags
    Languages,
    /// Show translation cache statistics
    Stats {
        /// Translation cache database
        #[arg(long, value_name = "FILE")]
        cache_path: Option<PathBuf>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the effective configuration
    Configure {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
}
