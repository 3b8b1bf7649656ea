use anyhow::Result;
use clap::Parser;

use transcache::cli::commands::{configure, detect, invalidate, items, stats, translate};
use transcache::cli::{Args, Command};
use transcache::logging::{self, LogOptions};
use transcache::output::{self, OutputConfig};
use transcache::translation::print_languages;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    output::init(OutputConfig {
        quiet: args.quiet,
        ..OutputConfig::default()
    });
    logging::init(LogOptions {
        verbose: args.verbose,
        json: args.log_json,
    });

    match args.command {
        Command::Translate {
            text,
            entity_type,
            entity_id,
            field,
            from,
            to,
            backend,
        } => {
            let options = translate::TranslateOptions {
                config: args.config,
                text,
                entity_type,
                entity_id,
                field,
                from,
                to,
                backend,
            };
            translate::run_translate(options).await?;
        }
        Command::Items {
            file,
            entity_type,
            to,
            fields,
            detect,
            output,
            concurrency,
            sequential,
            backend,
        } => {
            let options = items::ItemsOptions {
                config: args.config,
                file,
                entity_type,
                to,
                fields,
                detect,
                output,
                concurrency,
                sequential,
                backend,
            };
            items::run_items(options).await?;
        }
        Command::Invalidate {
            entity_type,
            entity_id,
            cache_path,
        } => {
            invalidate::run_invalidate(&invalidate::InvalidateOptions {
                config: args.config,
                entity_type,
                entity_id,
                cache_path,
            })?;
        }
        Command::Detect { text } => {
            detect::run_detect(&detect::DetectOptions {
                config: args.config,
                text,
            })?;
        }
        Command::Languages => {
            print_languages();
        }
        Command::Stats { cache_path, json } => {
            stats::run_stats(&stats::StatsOptions {
                config: args.config,
                cache_path,
                json,
            })?;
        }
        Command::Configure { show } => {
            configure::run_configure(args.config.as_deref(), show)?;
        }
    }

    Ok(())
}
