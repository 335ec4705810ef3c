// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Helpers shared by the integration tests

use flate2::read::GzDecoder;
use nr_log_record::{CanonicalRecord, TransportUnit};
use std::io::Read;

/// Decompress and decode a transport unit back into records
pub fn decode_unit(unit: &TransportUnit) -> Vec<CanonicalRecord> {
    let mut decoder = GzDecoder::new(unit.as_bytes());
    let mut json = Vec::new();
    decoder
        .read_to_end(&mut json)
        .expect("unit should be valid gzip");
    serde_json::from_slice(&json).expect("unit should hold a JSON array of records")
}

/// Text drawn from a 64 character alphabet; gzip can't shrink it below 3/4
/// of its length.
pub fn pseudo_random_text(seed: u64, len: usize) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            ALPHABET[(state % 64) as usize] as char
        })
        .collect()
}
