// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

pub mod log_level;

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::config::log_level::LogLevel;

pub const DEFAULT_ENDPOINT: &str = "https://log-api.newrelic.com/log/v1";
const DEFAULT_FLUSH_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MAX_RECORDS: usize = 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Neither NR_LICENSE_KEY nor NR_API_KEY is set")]
    MissingKey,
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Credential sent with every request. A license key takes precedence over
/// an insert (API) key when both are configured.
#[derive(Clone, PartialEq, Eq)]
pub enum ApiKey {
    License(String),
    Insert(String),
}

impl ApiKey {
    /// Lowercase header name carrying the key.
    #[must_use]
    pub fn header_name(&self) -> &'static str {
        match self {
            ApiKey::License(_) => "x-license-key",
            ApiKey::Insert(_) => "x-insert-key",
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            ApiKey::License(key) | ApiKey::Insert(key) => key,
        }
    }
}

// Keys never reach the logs.
impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey({})", self.header_name())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub api_key: Option<ApiKey>,
    pub proxy: Option<String>,
    pub ignore_system_proxy: bool,
    pub ca_bundle_file: Option<PathBuf>,
    pub ca_bundle_dir: Option<PathBuf>,
    /// Timeout for each delivery request
    pub flush_timeout: Duration,
    /// How many events are normalized and packaged together
    pub max_records: usize,
    /// When set, units are written here instead of being delivered
    pub output_dir: Option<PathBuf>,
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            proxy: None,
            ignore_system_proxy: false,
            ca_bundle_file: None,
            ca_bundle_dir: None,
            flush_timeout: Duration::from_secs(DEFAULT_FLUSH_TIMEOUT_SECS),
            max_records: DEFAULT_MAX_RECORDS,
            output_dir: None,
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Reads the configuration from `NR_*` environment variables.
    ///
    /// A credential is only required when units are delivered, that is when
    /// `NR_OUTPUT_DIR` is unset.
    pub fn new() -> Result<Config, ConfigError> {
        let api_key = non_empty_var("NR_LICENSE_KEY")
            .map(ApiKey::License)
            .or_else(|| non_empty_var("NR_API_KEY").map(ApiKey::Insert));
        let output_dir = non_empty_var("NR_OUTPUT_DIR").map(PathBuf::from);

        if api_key.is_none() && output_dir.is_none() {
            return Err(ConfigError::MissingKey);
        }

        let flush_timeout = parse_var("NR_FLUSH_TIMEOUT")?
            .map_or(Duration::from_secs(DEFAULT_FLUSH_TIMEOUT_SECS), Duration::from_secs);

        let max_records = match parse_var::<usize>("NR_MAX_RECORDS")? {
            Some(0) => {
                return Err(ConfigError::InvalidValue {
                    name: "NR_MAX_RECORDS",
                    value: "0".to_string(),
                })
            }
            Some(n) => n,
            None => DEFAULT_MAX_RECORDS,
        };

        let log_level = match non_empty_var("NR_LOG_LEVEL") {
            Some(value) => LogLevel::from_str(&value).unwrap_or_else(|e| {
                warn!("{e}, using default");
                LogLevel::default()
            }),
            None => LogLevel::default(),
        };

        let ignore_system_proxy = non_empty_var("NR_IGNORE_SYSTEM_PROXY")
            .map(|val| val.to_lowercase() == "true")
            .unwrap_or(false);

        Ok(Config {
            endpoint: non_empty_var("NR_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            api_key,
            proxy: non_empty_var("NR_PROXY"),
            ignore_system_proxy,
            ca_bundle_file: non_empty_var("NR_CA_BUNDLE_FILE").map(PathBuf::from),
            ca_bundle_dir: non_empty_var("NR_CA_BUNDLE_DIR").map(PathBuf::from),
            flush_timeout,
            max_records,
            output_dir,
            log_level,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|val| !val.trim().is_empty())
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match non_empty_var(name) {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        None => Ok(None),
    }
}
