#![deny(missing_docs)]
//! Logging for the hunter workspace.
//!
//! The `hunter_*` macros wrap the `log` facade so call sites stay uniform.
//! [`cli_config`] is the record format shared by the binary and the tests:
//! RFC 3339 timestamps and no HTTP stack chatter.

use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, Config, ConfigBuilder, TermLogger, TerminalMode};

/// Environment variable read by [`initialize_for_tests`].
pub const TEST_LOG_ENV: &str = "HUNTER_TEST_LOG";

/// Trace-level record.
#[macro_export]
macro_rules! hunter_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Info-level record.
#[macro_export]
macro_rules! hunter_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Debug-level record.
#[macro_export]
macro_rules! hunter_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Warn-level record.
#[macro_export]
macro_rules! hunter_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Error-level record.
#[macro_export]
macro_rules! hunter_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Parses a level name (`error`, `warn`, `info`, `debug`, `trace`, `off`).
///
/// Unknown names fall back to `Info`.
pub fn parse_level(name: &str) -> LevelFilter {
    name.trim().parse().unwrap_or(LevelFilter::Info)
}

/// Record format for every hunter logger.
pub fn cli_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        // reqwest/hyper internals are noise at debug level.
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("rustls")
        .build()
}

/// Sends test logs to stderr at the level named by `HUNTER_TEST_LOG`
/// (`warn` when unset), so poll and submit traces can be turned on per run.
///
/// No-ops if a logger is already installed.
pub fn initialize_for_tests() {
    let level = std::env::var(TEST_LOG_ENV)
        .map(|name| parse_level(&name))
        .unwrap_or(LevelFilter::Warn);
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        cli_config(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )]);
}
