//! Diagnostic logging via `tracing`.
//!
//! Logs go to stderr so stdout stays clean for results. `RUST_LOG` wins over
//! the defaults chosen here.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "transcache=warn";
const VERBOSE_FILTER: &str = "transcache=debug";

#[derive(Debug, Clone, Copy, Default)]
pub struct LogOptions {
    pub verbose: bool,
    pub json: bool,
}

impl LogOptions {
    const fn default_directives(self) -> &'static str {
        if self.verbose {
            VERBOSE_FILTER
        } else {
            DEFAULT_FILTER
        }
    }
}

fn env_filter(options: LogOptions) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(options.default_directives()))
}

/// Installs the global subscriber.
///
/// Does nothing if a subscriber is already installed (tests, embedding hosts).
pub fn init(options: LogOptions) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(options))
        .with_writer(std::io::stderr)
        .with_target(true);

    let _ = if options.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
