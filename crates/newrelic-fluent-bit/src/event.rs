// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Decoding of input events, one JSON document per line.
//!
//! ```text
//! [1700000000000000000, {"log": "hello"}]      nanosecond counter
//! ["2023-11-14T22:13:20.5Z", {"log": "hello"}] RFC 3339 time
//! [[1700000000000000000, {}], {"log": "hello"}] timestamp with metadata
//! {"log": "hello"}                             no timestamp
//! ```

use chrono::{DateTime, Utc};
use nr_log_record::{RawRecord, Timestamp};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum Event {
    Tagged(Value, RawRecord),
    Bare(RawRecord),
}

/// Decodes one event into its record and timestamp.
pub fn parse_event(line: &str) -> Result<(RawRecord, Timestamp), serde_json::Error> {
    match serde_json::from_str(line)? {
        Event::Tagged(timestamp, record) => Ok((record, to_timestamp(&timestamp))),
        Event::Bare(record) => Ok((record, Timestamp::Unrecognized)),
    }
}

fn to_timestamp(value: &Value) -> Timestamp {
    match value {
        Value::Number(n) => n.as_u64().map_or(Timestamp::Unrecognized, Timestamp::Nanos),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map_or(Timestamp::Unrecognized, |time| {
                Timestamp::Time(time.with_timezone(&Utc))
            }),
        Value::Array(parts) => parts.first().map_or(Timestamp::Unrecognized, to_timestamp),
        _ => Timestamp::Unrecognized,
    }
}
