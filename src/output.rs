//! Where human-facing text goes.
//!
//! Translations, JSON and counts are written to stdout so they can be piped.
//! Status lines go to stderr through [`status!`](crate::status) and vanish
//! under `--quiet`. Diagnostics belong to [`crate::logging`].

use std::sync::OnceLock;

static SETTINGS: OnceLock<OutputConfig> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Drop status lines; results are still printed.
    pub quiet: bool,
    /// Print plain text without ANSI colors.
    pub no_color: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            quiet: false,
            // https://no-color.org/
            no_color: std::env::var_os("NO_COLOR").is_some(),
        }
    }
}

/// Fixes the process-wide settings. Only the first call has an effect.
pub fn init(config: OutputConfig) {
    let _ = SETTINGS.set(config);
}

pub fn config() -> &'static OutputConfig {
    SETTINGS.get_or_init(OutputConfig::default)
}

pub fn is_quiet() -> bool {
    config().quiet
}

pub fn is_no_color() -> bool {
    config().no_color
}

/// Writes a status line to stderr unless `--quiet` was given.
#[macro_export]
macro_rules! status {
    ($($arg:tt)*) => {
        if !$crate::output::is_quiet() {
            eprintln!($($arg)*);
        }
    };
}
