#![forbid(unsafe_code)]

//! Client configuration.
//!
//! Every field has a default, so an empty JSON object (or an empty
//! environment) yields a working client. Web hosts pass a JSON string;
//! native hosts and tests read `CHARTDECK_*` variables.
//!
//! # Env Var Contract
//!
//! - `CHARTDECK_REQUEST_TIMEOUT_MS` - request timeout; unset or `0` disables it
//! - `CHARTDECK_INFLIGHT_POLICY` - `reject` or `queue`
//! - `CHARTDECK_NOTICE_TTL_MS` - notice lifetime; `0` keeps notices until dismissed
//! - `CHARTDECK_MAX_NOTICES` - notice queue bound
//! - `CHARTDECK_CHART_TYPES` - comma-separated chart type catalogue
//! - `CHARTDECK_LOG` - tracing filter directive (falls back to `RUST_LOG`)
//! - `CHARTDECK_LOG_JSON` - `1`/`true` for JSON log lines

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chartdeck_core::ChartTypeCatalog;
use serde::{Deserialize, Serialize};

use crate::protocol::Endpoints;

const DEFAULT_NOTICE_TTL_MS: u64 = 4_000;
const DEFAULT_MAX_NOTICES: usize = 5;

/// What to do with a second mutating gesture on a title whose previous
/// mutation is still outstanding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InflightPolicy {
    /// Drop it and tell the user.
    #[default]
    Reject,
    /// Hold it and replay it once the outstanding request completes.
    Queue,
}

impl FromStr for InflightPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "queue" => Ok(Self::Queue),
            other => Err(format!("expected `reject` or `queue`, got `{other}`")),
        }
    }
}

/// Log output settings for native hosts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `chartdeck_runtime=debug`.
    pub filter: Option<String>,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

/// Configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The JSON document could not be decoded.
    Json(String),
    /// An environment variable held an unusable value.
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "invalid config json: {msg}"),
            Self::InvalidVar {
                name,
                value,
                reason,
            } => write!(f, "invalid {name}={value:?}: {reason}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub endpoints: Endpoints,
    /// Request timeout. `None` waits forever.
    pub request_timeout_ms: Option<u64>,
    pub inflight_policy: InflightPolicy,
    /// Notice lifetime. `0` keeps notices until dismissed.
    pub notice_ttl_ms: u64,
    pub max_notices: usize,
    /// Backend chart types; empty accepts any type.
    pub chart_types: ChartTypeCatalog,
    pub log: LogConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            request_timeout_ms: None,
            inflight_policy: InflightPolicy::default(),
            notice_ttl_ms: DEFAULT_NOTICE_TTL_MS,
            max_notices: DEFAULT_MAX_NOTICES,
            chart_types: ChartTypeCatalog::default(),
            log: LogConfig::default(),
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }

    #[must_use]
    pub fn notice_ttl(&self) -> Option<Duration> {
        (self.notice_ttl_ms > 0).then(|| Duration::from_millis(self.notice_ttl_ms))
    }

    /// Decode from a JSON document; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(text).map_err(|e| ConfigError::Json(e.to_string()))
    }

    /// Read `CHARTDECK_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read variables through `lookup`, starting from defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_var(&lookup, "CHARTDECK_REQUEST_TIMEOUT_MS")? {
            config.request_timeout_ms = (ms > 0).then_some(ms);
        }
        if let Some(policy) = parse_var(&lookup, "CHARTDECK_INFLIGHT_POLICY")? {
            config.inflight_policy = policy;
        }
        if let Some(ms) = parse_var(&lookup, "CHARTDECK_NOTICE_TTL_MS")? {
            config.notice_ttl_ms = ms;
        }
        if let Some(max) = parse_var(&lookup, "CHARTDECK_MAX_NOTICES")? {
            config.max_notices = max;
        }
        if let Some(types) = lookup("CHARTDECK_CHART_TYPES") {
            config.chart_types = ChartTypeCatalog::new(
                types
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty()),
            );
        }
        config.log.filter = lookup("CHARTDECK_LOG")
            .or_else(|| lookup("RUST_LOG"))
            .filter(|f| !f.trim().is_empty());
        if let Some(json) = lookup("CHARTDECK_LOG_JSON") {
            config.log.json = matches!(json.trim(), "1" | "true" | "TRUE" | "yes");
        }
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    let parsed = value.trim().parse::<T>();
    parsed
        .map(Some)
        .map_err(|e| ConfigError::InvalidVar {
            name,
            value,
            reason: e.to_string(),
        })
}
