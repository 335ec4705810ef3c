// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! # New Relic log records
//!
//! Turns Fluent Bit records into payloads for the New Relic Logs API.
//!
//! - [`normalizer`]: converts loosely typed [`RawRecord`]s into
//!   [`CanonicalRecord`]s (string keys, `message`, `timestamp`, `plugin`)
//! - [`packager`]: batches records into gzip-compressed JSON arrays that stay
//!   below [`constants::MAX_PACKET_SIZE`]
//!
//! Both are synchronous and stateless; independent batches can be processed
//! in parallel.
//!
//! ```rust
//! use nr_log_record::{normalizer::Normalizer, packager::package_records};
//! use nr_log_record::{RawRecord, Timestamp};
//!
//! let normalizer = Normalizer::new("1.0.0", "BARE-METAL");
//! let raw = RawRecord::new().with("log", "hello").with("level", "info");
//! let record = normalizer.normalize(&raw, &Timestamp::Nanos(1_700_000_000_000_000_000));
//!
//! let units = package_records(&[record]).expect("records are encodable");
//! assert_eq!(units.len(), 1);
//! ```

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod constants;
pub mod error;
pub mod normalizer;
pub mod packager;
pub mod record;

pub use error::PackageError;
pub use record::{CanonicalRecord, RawRecord, RawValue, Timestamp, TransportUnit};
