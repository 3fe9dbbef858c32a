// File: src/logging.rs
// Purpose: tracing subscriber bootstrap

use std::str::FromStr;

use tracing::Level;

use crate::Config;

/// Target used for one-line-per-request access logs
pub const ACCESS_TARGET: &str = "jsweb::access";

/// Parses a level name, falling back to `INFO` for anything unknown
pub fn parse_level(level: &str) -> Level {
    Level::from_str(level.trim()).unwrap_or(Level::INFO)
}

/// Installs a stdout fmt subscriber at the configured level
///
/// Returns `false` when a global subscriber is already installed, which
/// makes repeated calls (one per test, say) harmless.
pub fn init(config: &Config) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(parse_level(&config.logging.level))
        .with_target(true)
        .with_writer(std::io::stdout)
        .try_init()
        .is_ok()
}
