// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Limits and fixed values of the New Relic Logs intake.

/// Maximum compressed size in bytes of a single transport unit.
///
/// The intake rejects payloads of 1MB or more, so every unit must stay
/// strictly below this value. Batches that compress to this size or more
/// are split in half until they fit.
pub const MAX_PACKET_SIZE: usize = 1 << 20;

/// Value of `plugin.type` on every normalized record.
pub const PLUGIN_TYPE: &str = "fluent-bit";

/// Environment variable naming the deployment the plugin runs in.
pub const SOURCE_ENV_VAR: &str = "SOURCE";

/// `plugin.source` used when [`SOURCE_ENV_VAR`] is not set.
pub const DEFAULT_SOURCE: &str = "BARE-METAL";
