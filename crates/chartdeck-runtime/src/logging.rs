#![forbid(unsafe_code)]

//! Log subscriber installation for native hosts.
//!
//! The runtime only emits `tracing` events and spans. Web hosts route them
//! however they like; native hosts (the harness, tools) call [`install`]
//! once at startup.

use std::fmt;

use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

/// Filter used when the config carries none.
pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug)]
pub enum LoggingError {
    /// The filter directive did not parse.
    Filter(String),
    /// A global subscriber was already installed.
    AlreadyInstalled(String),
}

impl fmt::Display for LoggingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter(msg) => write!(f, "invalid log filter: {msg}"),
            Self::AlreadyInstalled(msg) => write!(f, "log subscriber already set: {msg}"),
        }
    }
}

impl std::error::Error for LoggingError {}

/// Build the filter for `config`.
pub fn filter(config: &LogConfig) -> Result<EnvFilter, LoggingError> {
    let directive = config.filter.as_deref().unwrap_or(DEFAULT_FILTER);
    EnvFilter::try_new(directive).map_err(|e| LoggingError::Filter(e.to_string()))
}

/// Install a global `fmt` subscriber writing to stderr.
pub fn install(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| LoggingError::AlreadyInstalled(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_parses() {
        assert!(filter(&LogConfig::default()).is_ok());
    }

    #[test]
    fn bad_directive_is_reported() {
        let config = LogConfig {
            filter: Some("chartdeck_runtime=loud".into()),
            json: false,
        };
        assert!(matches!(filter(&config), Err(LoggingError::Filter(_))));
    }
}
