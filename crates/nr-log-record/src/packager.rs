// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Packaging of records into size-bounded, gzip-compressed transport units.
//!
//! # Splitting Strategy
//!
//! ```text
//!            [r0 r1 r2 r3 r4 r5]        compressed >= max
//!              /             \
//!        [r0 r1 r2]      [r3 r4 r5]      each half retried
//!           ok            /      \
//!                      [r3]    [r4 r5]
//!                    too big      ok
//!                    dropped
//! ```
//!
//! A batch is encoded as one JSON array and gzipped. If the compressed size
//! is below the limit it becomes a unit. Otherwise it is split at the
//! midpoint and each half is packaged again. A single record that still
//! does not fit is dropped with an error log instead of failing the whole
//! batch, so one pathological record cannot stall the pipeline.
//!
//! Halves are processed from an explicit stack, first half first, so units
//! come out in input order and the call depth stays constant.

use std::fmt;
use std::io::Write;

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use tracing::{debug, error};

use crate::constants::MAX_PACKET_SIZE;
use crate::error::PackageError;
use crate::record::TransportUnit;

/// Packages record batches into transport units below a size limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packager {
    max_packet_size: usize,
}

impl Default for Packager {
    /// Uses the intake limit, [`MAX_PACKET_SIZE`].
    fn default() -> Self {
        Packager {
            max_packet_size: MAX_PACKET_SIZE,
        }
    }
}

impl Packager {
    /// Creates a packager with a custom limit. Every unit it returns is
    /// strictly smaller than `max_packet_size` bytes.
    #[must_use]
    pub fn new(max_packet_size: usize) -> Self {
        Packager { max_packet_size }
    }

    #[must_use]
    pub fn max_packet_size(&self) -> usize {
        self.max_packet_size
    }

    /// Packages `records` into gzip-compressed JSON arrays.
    ///
    /// # Returns
    ///
    /// * `Ok(units)` - Units in input order; empty for an empty input or when
    ///   every record was too large on its own
    /// * `Err` - A record could not be encoded or the compressor failed; no
    ///   units are returned in that case
    pub fn package<T>(&self, records: &[T]) -> Result<Vec<TransportUnit>, PackageError>
    where
        T: Serialize + fmt::Debug,
    {
        let mut units = Vec::new();
        let mut pending: Vec<&[T]> = Vec::new();
        if !records.is_empty() {
            pending.push(records);
        }

        while let Some(batch) = pending.pop() {
            let compressed = as_gzipped_json(batch)?;
            let compressed_size = compressed.len();

            if compressed_size < self.max_packet_size {
                units.push(TransportUnit::new(compressed, batch.len()));
                continue;
            }

            if let [record] = batch {
                error!(
                    "LOGS | Can't compress record below required maximum packet size ({} bytes >= {} bytes), discarding it",
                    compressed_size, self.max_packet_size
                );
                debug!("LOGS | Discarded record: {:?}", record);
                continue;
            }

            debug!(
                "LOGS | {} records compressed to {} bytes, splitting in half and retrying",
                batch.len(),
                compressed_size
            );
            let (first_half, second_half) = batch.split_at(batch.len() / 2);
            pending.push(second_half);
            pending.push(first_half);
        }

        Ok(units)
    }
}

/// Packages `records` with the intake limit. See [`Packager::package`].
pub fn package_records<T>(records: &[T]) -> Result<Vec<TransportUnit>, PackageError>
where
    T: Serialize + fmt::Debug,
{
    Packager::default().package(records)
}

/// Encodes `records` as a JSON array and gzips it.
pub fn as_gzipped_json<T: Serialize>(records: &[T]) -> Result<Vec<u8>, PackageError> {
    let data = serde_json::to_vec(records).map_err(PackageError::Encoding)?;
    write_gzipped(Vec::new(), &data)
}

// The encoder owns `writer`; on error it is dropped before returning.
fn write_gzipped<W: Write>(writer: W, data: &[u8]) -> Result<W, PackageError> {
    let mut encoder = GzEncoder::new(writer, Compression::default());
    encoder.write_all(data).map_err(PackageError::Compression)?;
    encoder.flush().map_err(PackageError::Compression)?;
    encoder.finish().map_err(PackageError::Compression)
}
