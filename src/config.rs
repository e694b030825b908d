//! Configuration - Suite settings and harness options
//!
//! TigerStyle: Defaults in code, overrides from the environment, bounds
//! checked at load.
//!
//! | Variable                       | Meaning                          |
//! |--------------------------------|----------------------------------|
//! | `STORECHECK_MUST_MERGE`        | backend merges on save           |
//! | `STORECHECK_POLL_INTERVAL_MS`  | shutdown poll interval           |
//! | `STORECHECK_RETRY_LIMIT`       | shutdown polls before giving up  |
//! | `STORECHECK_SUITES`            | comma-separated suites to run    |

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::shutdown::ShutdownPolicy;
use crate::storage::Value;
use crate::suites::SuiteKind;
use crate::{SHUTDOWN_POLL_INTERVAL_MS_MAX, SHUTDOWN_RETRY_COUNT_MAX};

pub const ENV_MUST_MERGE: &str = "STORECHECK_MUST_MERGE";
pub const ENV_POLL_INTERVAL_MS: &str = "STORECHECK_POLL_INTERVAL_MS";
pub const ENV_RETRY_LIMIT: &str = "STORECHECK_RETRY_LIMIT";
pub const ENV_SUITES: &str = "STORECHECK_SUITES";

// =============================================================================
// Suite Settings
// =============================================================================

/// Options every suite receives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteSettings {
    /// The backend preserves stored fields missing from a re-save.
    #[serde(default)]
    pub must_merge: bool,
    /// Queries issued by the raw query suite.
    #[serde(default)]
    pub raw_queries: RawQueries,
}

impl SuiteSettings {
    #[must_use]
    pub fn merging() -> Self {
        Self {
            must_merge: true,
            ..Self::default()
        }
    }
}

/// Backend-native queries for the `product` namespace, ordered by price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawQueries {
    /// Plain query text
    pub text: String,
    /// Query text with `?` placeholders
    pub parameterized: String,
    /// Values bound to the placeholders in order
    pub params: Vec<Value>,
}

impl Default for RawQueries {
    fn default() -> Self {
        Self {
            text: "SELECT * FROM product ORDER BY price".to_string(),
            parameterized: "SELECT * FROM product WHERE price >= ? AND price <= ? ORDER BY price"
                .to_string(),
            params: vec![Value::from(0), Value::from(1000)],
        }
    }
}

// =============================================================================
// Harness Config
// =============================================================================

/// Everything the binary needs besides the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    pub settings: SuiteSettings,
    pub shutdown: ShutdownPolicy,
    /// Suites to run, in order
    pub suites: Vec<SuiteKind>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            settings: SuiteSettings::default(),
            shutdown: ShutdownPolicy::default(),
            suites: SuiteKind::all().to_vec(),
        }
    }
}

impl HarnessConfig {
    /// Defaults overridden by `STORECHECK_*` variables.
    ///
    /// # Errors
    /// `ConfigError` for unparseable or out-of-range values.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each variable.
    ///
    /// # Errors
    /// `ConfigError` for unparseable or out-of-range values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MUST_MERGE) {
            config.settings.must_merge = parse_bool(ENV_MUST_MERGE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_POLL_INTERVAL_MS) {
            let ms = parse_bounded(ENV_POLL_INTERVAL_MS, &raw, SHUTDOWN_POLL_INTERVAL_MS_MAX)?;
            config.shutdown.poll_interval = Duration::from_millis(ms);
        }
        if let Some(raw) = lookup(ENV_RETRY_LIMIT) {
            let limit = parse_bounded(ENV_RETRY_LIMIT, &raw, u64::from(SHUTDOWN_RETRY_COUNT_MAX))?;
            config.shutdown.retry_limit = u32::try_from(limit).unwrap_or(SHUTDOWN_RETRY_COUNT_MAX);
        }
        if let Some(raw) = lookup(ENV_SUITES) {
            config.suites = parse_suites(&raw)?;
        }

        Ok(config)
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected a boolean".to_string(),
        }),
    }
}

fn parse_bounded(key: &'static str, raw: &str, max: u64) -> Result<u64, ConfigError> {
    let value: u64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: format!("{e}"),
    })?;
    if value > max {
        return Err(ConfigError::OutOfRange { key, value, max });
    }
    Ok(value)
}

fn parse_suites(raw: &str) -> Result<Vec<SuiteKind>, ConfigError> {
    let suites = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            name.parse::<SuiteKind>().map_err(|reason| ConfigError::Invalid {
                key: ENV_SUITES,
                value: name.to_string(),
                reason,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if suites.is_empty() {
        return Err(ConfigError::Invalid {
            key: ENV_SUITES,
            value: raw.to_string(),
            reason: "no suites named".to_string(),
        });
    }
    Ok(suites)
}

// =============================================================================
// Errors
// =============================================================================

/// Configuration-related errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}={value}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{key}={value} exceeds maximum {max}")]
    OutOfRange { key: &'static str, value: u64, max: u64 },
}

// =============================================================================
// Tests
// =============================================================================
