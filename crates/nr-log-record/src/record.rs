// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Record types flowing through the log pipeline.
//!
//! ```text
//!   RawRecord + Timestamp ──normalize──> CanonicalRecord ──package──> TransportUnit
//! ```
//!
//! - [`RawRecord`] is what the log collector hands over: loosely typed, keys
//!   are not guaranteed to be strings and values may be raw bytes.
//! - [`CanonicalRecord`] is the string-keyed JSON object sent to the intake.
//! - [`TransportUnit`] is a gzip-compressed JSON array of records.

use std::fmt;
use std::ops::Deref;

use chrono::{DateTime, Utc};
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Serialize;
use serde_json::{Map, Value};

/// A single value of a [`RawRecord`].
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    String(String),
    /// Raw bytes, converted to a (lossy UTF-8) string during normalization.
    Bytes(Vec<u8>),
    /// A nested record.
    Map(RawRecord),
    /// Any other value (numbers, booleans, null, arrays). Copied as-is.
    Scalar(Value),
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::String(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::String(value)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(value: Vec<u8>) -> Self {
        RawValue::Bytes(value)
    }
}

impl From<&[u8]> for RawValue {
    fn from(value: &[u8]) -> Self {
        RawValue::Bytes(value.to_vec())
    }
}

impl From<RawRecord> for RawValue {
    fn from(value: RawRecord) -> Self {
        RawValue::Map(value)
    }
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        RawValue::Scalar(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Scalar(Value::from(value))
    }
}

impl From<u64> for RawValue {
    fn from(value: u64) -> Self {
        RawValue::Scalar(Value::from(value))
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Scalar(Value::from(value))
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Scalar(Value::Bool(value))
    }
}

/// A loosely typed log record as emitted by the log collector.
///
/// Entries keep their insertion order. Keys are [`RawValue`]s because the
/// collector does not guarantee string keys; see
/// [`crate::normalizer::Normalizer`] for how they are coerced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    entries: Vec<(RawValue, RawValue)>,
}

impl RawRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<RawValue>, value: impl Into<RawValue>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Builder-style variant of [`RawRecord::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<RawValue>, value: impl Into<RawValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &(RawValue, RawValue)> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawRecord
where
    K: Into<RawValue>,
    V: Into<RawValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RawRecord {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

struct RawValueVisitor;

impl<'de> Visitor<'de> for RawValueVisitor {
    type Value = RawValue;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a log record value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
        Ok(RawValue::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
        Ok(RawValue::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
        Ok(RawValue::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
        Ok(RawValue::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        Ok(RawValue::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
        Ok(RawValue::String(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Ok(RawValue::from(v))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Self::Value, E> {
        Ok(RawValue::Bytes(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(RawValue::Scalar(Value::Null))
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(RawValue::Scalar(Value::Null))
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        RawValue::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        // Arrays are opaque scalars: their elements are not normalized.
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        Ok(RawValue::Scalar(Value::Array(items)))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> Result<Self::Value, A::Error> {
        RawRecordVisitor.visit_map(map).map(RawValue::Map)
    }
}

impl<'de> Deserialize<'de> for RawValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(RawValueVisitor)
    }
}

struct RawRecordVisitor;

impl<'de> Visitor<'de> for RawRecordVisitor {
    type Value = RawRecord;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a log record map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut record = RawRecord {
            entries: Vec::with_capacity(map.size_hint().unwrap_or(0)),
        };
        while let Some((key, value)) = map.next_entry::<RawValue, RawValue>()? {
            record.entries.push((key, value));
        }
        Ok(record)
    }
}

impl<'de> Deserialize<'de> for RawRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RawRecordVisitor)
    }
}

/// The timestamp the collector attached to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    /// Structured wall-clock time.
    Time(DateTime<Utc>),
    /// Nanoseconds since the Unix epoch.
    Nanos(u64),
    /// Any other shape. No `timestamp` field is attached for it.
    Unrecognized,
}

impl Timestamp {
    /// Milliseconds since the Unix epoch, truncated, or `None` for
    /// [`Timestamp::Unrecognized`].
    #[must_use]
    pub fn as_millis(&self) -> Option<i64> {
        match self {
            Timestamp::Time(time) => Some(
                time.timestamp_nanos_opt()
                    .map_or_else(|| time.timestamp_millis(), |nanos| nanos / 1_000_000),
            ),
            Timestamp::Nanos(nanos) => i64::try_from(nanos / 1_000_000).ok(),
            Timestamp::Unrecognized => None,
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Timestamp::Time(value)
    }
}

impl From<u64> for Timestamp {
    fn from(value: u64) -> Self {
        Timestamp::Nanos(value)
    }
}

/// A normalized log record: a JSON object with string keys.
///
/// Built by [`crate::normalizer::Normalizer`] and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct CanonicalRecord(Map<String, Value>);

impl CanonicalRecord {
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for CanonicalRecord {
    fn from(value: Map<String, Value>) -> Self {
        CanonicalRecord(value)
    }
}

impl From<CanonicalRecord> for Value {
    fn from(value: CanonicalRecord) -> Self {
        Value::Object(value.0)
    }
}

impl Deref for CanonicalRecord {
    type Target = Map<String, Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A gzip-compressed JSON array of records, ready to be sent as-is.
#[derive(Clone, PartialEq, Eq)]
pub struct TransportUnit {
    payload: Vec<u8>,
    record_count: usize,
}

impl TransportUnit {
    pub(crate) fn new(payload: Vec<u8>, record_count: usize) -> Self {
        TransportUnit {
            payload,
            record_count,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.payload
    }

    /// Compressed size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Number of records encoded in this unit.
    #[must_use]
    pub fn record_count(&self) -> usize {
        self.record_count
    }
}

impl fmt::Debug for TransportUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportUnit")
            .field("bytes", &self.payload.len())
            .field("record_count", &self.record_count)
            .finish()
    }
}
