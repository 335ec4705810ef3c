// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::process::ExitCode;

use tokio::io::BufReader;
use tracing::{debug, error};

use newrelic_fluent_bit::{
    config::Config,
    flusher::Flusher,
    http::get_client,
    logger,
    pipeline::{Pipeline, Sink},
};
use nr_log_record::{normalizer::Normalizer, packager::Packager};

const PLUGIN_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
pub async fn main() -> ExitCode {
    let config = Config::new();
    let log_level = config
        .as_ref()
        .map(|config| config.log_level)
        .unwrap_or_default();
    if let Err(e) = logger::init(log_level) {
        eprintln!("Failed to initialize logging: {e}");
    }
    debug!("Logging subsystem enabled");

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("Error creating config on plugin startup: {e}");
            return ExitCode::FAILURE;
        }
    };

    let sink = match &config.output_dir {
        Some(dir) => Sink::directory(dir),
        None => {
            let flusher = get_client(&config)
                .map_err(|e| e.to_string())
                .and_then(|client| Flusher::new(client, &config).map_err(|e| e.to_string()));
            match flusher {
                Ok(flusher) => Sink::Endpoint(flusher),
                Err(e) => {
                    error!("Unable to set up delivery to {}: {e}", config.endpoint);
                    return ExitCode::FAILURE;
                }
            }
        }
    };

    let mut pipeline = Pipeline::new(
        Normalizer::from_env(PLUGIN_VERSION),
        Packager::default(),
        sink,
        config.max_records,
    );

    match pipeline.run(BufReader::new(tokio::io::stdin())).await {
        Ok(summary) if summary.failed_units == 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            error!("LOGS | {e}");
            ExitCode::FAILURE
        }
    }
}
