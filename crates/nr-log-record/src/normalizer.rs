// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Conversion of raw collector records into canonical records.
//!
//! Normalization steps, in order:
//!
//! 1. **Flatten types**: keys become strings, byte values become strings,
//!    nested maps are normalized recursively. Other values are copied as-is.
//! 2. **Timestamp**: recognized timestamps are attached as `timestamp`
//!    (milliseconds since the epoch). Unrecognized ones are ignored.
//! 3. **Rename**: `log` is moved to `message`.
//! 4. **Plugin metadata**: `plugin` is set to `{type, version, source}`,
//!    replacing whatever the record carried under that key.
//!
//! # Key coercion
//!
//! | Raw key                    | Canonical key                  |
//! |----------------------------|--------------------------------|
//! | string                     | unchanged                      |
//! | bytes                      | lossy UTF-8 string             |
//! | number, boolean            | JSON rendering (`42`, `true`)  |
//! | map, array, null           | entry skipped                  |

use std::env;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::constants::{DEFAULT_SOURCE, PLUGIN_TYPE, SOURCE_ENV_VAR};
use crate::record::{CanonicalRecord, RawRecord, RawValue, Timestamp};

/// The `plugin` object attached to every canonical record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginDescriptor {
    #[serde(rename = "type")]
    pub plugin_type: String,
    pub version: String,
    pub source: String,
}

impl PluginDescriptor {
    #[must_use]
    pub fn new(version: impl Into<String>, source: impl Into<String>) -> Self {
        PluginDescriptor {
            plugin_type: PLUGIN_TYPE.to_string(),
            version: version.into(),
            source: source.into(),
        }
    }

    /// Reads the source from the `SOURCE` environment variable, falling back
    /// to `BARE-METAL`.
    #[must_use]
    pub fn from_env(version: impl Into<String>) -> Self {
        let source = env::var(SOURCE_ENV_VAR).unwrap_or_else(|_| DEFAULT_SOURCE.to_string());
        Self::new(version, source)
    }

    fn to_value(&self) -> Value {
        let mut plugin = Map::new();
        plugin.insert("type".to_string(), Value::from(self.plugin_type.as_str()));
        plugin.insert("version".to_string(), Value::from(self.version.as_str()));
        plugin.insert("source".to_string(), Value::from(self.source.as_str()));
        Value::Object(plugin)
    }
}

/// Turns [`RawRecord`]s into [`CanonicalRecord`]s.
///
/// The plugin descriptor is captured at construction, so a normalizer never
/// reads the environment while processing records.
#[derive(Debug, Clone)]
pub struct Normalizer {
    plugin: PluginDescriptor,
}

impl Normalizer {
    #[must_use]
    pub fn new(plugin_version: impl Into<String>, source: impl Into<String>) -> Self {
        Normalizer {
            plugin: PluginDescriptor::new(plugin_version, source),
        }
    }

    #[must_use]
    pub fn from_env(plugin_version: impl Into<String>) -> Self {
        Normalizer {
            plugin: PluginDescriptor::from_env(plugin_version),
        }
    }

    #[must_use]
    pub fn plugin(&self) -> &PluginDescriptor {
        &self.plugin
    }

    /// Normalizes one record. Never fails.
    #[must_use]
    pub fn normalize(&self, raw: &RawRecord, timestamp: &Timestamp) -> CanonicalRecord {
        let mut record = parse_record(raw);

        if let Some(millis) = timestamp.as_millis() {
            record.insert("timestamp".to_string(), Value::from(millis));
        }

        if let Some(message) = record.remove("log") {
            record.insert("message".to_string(), message);
        }

        record.insert("plugin".to_string(), self.plugin.to_value());
        CanonicalRecord::from(record)
    }
}

/// Normalizes one record, reading `SOURCE` from the environment on every call.
///
/// Prefer a long-lived [`Normalizer`] when processing batches.
#[must_use]
pub fn remap_record(
    raw: &RawRecord,
    timestamp: &Timestamp,
    plugin_version: &str,
) -> CanonicalRecord {
    Normalizer::from_env(plugin_version).normalize(raw, timestamp)
}

fn parse_record(raw: &RawRecord) -> Map<String, Value> {
    let mut record = Map::new();
    for (key, value) in raw.iter() {
        let Some(key) = coerce_key(key) else {
            debug!("LOGS | Skipping record entry with unsupported key: {:?}", key);
            continue;
        };
        let value = match value {
            RawValue::String(s) => Value::from(s.as_str()),
            RawValue::Bytes(bytes) => Value::from(String::from_utf8_lossy(bytes).into_owned()),
            RawValue::Map(nested) => Value::Object(parse_record(nested)),
            RawValue::Scalar(scalar) => scalar.clone(),
        };
        record.insert(key, value);
    }
    record
}

fn coerce_key(key: &RawValue) -> Option<String> {
    match key {
        RawValue::String(s) => Some(s.clone()),
        RawValue::Bytes(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        RawValue::Scalar(scalar @ (Value::Number(_) | Value::Bool(_))) => Some(scalar.to_string()),
        RawValue::Scalar(_) | RawValue::Map(_) => None,
    }
}
