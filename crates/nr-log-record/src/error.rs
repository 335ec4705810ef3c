// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

/// Errors returned when packaging records into transport units.
///
/// Both variants abort the whole packaging call; no units are returned.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("Failed to encode records as JSON: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("Failed to gzip encoded records: {0}")]
    Compression(#[source] std::io::Error),
}
