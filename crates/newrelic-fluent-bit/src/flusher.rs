// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Delivery of transport units to the Logs API.
//!
//! Each unit is POSTed exactly once. Units of one flush are sent
//! concurrently and the ones that could not be delivered are handed back to
//! the caller, which decides what to do with them.

use std::time::Instant;

use nr_log_record::TransportUnit;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use reqwest::StatusCode;
use tokio::task::JoinSet;
use tracing::{debug, error, Instrument};

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum FlushError {
    #[error("Cannot deliver units without NR_LICENSE_KEY or NR_API_KEY")]
    MissingKey,
    #[error("Invalid key header value: {0}")]
    InvalidKey(#[from] reqwest::header::InvalidHeaderValue),
}

#[derive(Debug, Clone)]
pub struct Flusher {
    client: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
}

impl Flusher {
    pub fn new(client: reqwest::Client, config: &Config) -> Result<Self, FlushError> {
        let api_key = config.api_key.as_ref().ok_or(FlushError::MissingKey)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        let mut key = HeaderValue::from_str(api_key.value())?;
        key.set_sensitive(true);
        headers.insert(HeaderName::from_static(api_key.header_name()), key);

        Ok(Flusher {
            client,
            endpoint: config.endpoint.clone(),
            headers,
        })
    }

    /// Sends every unit once and returns the ones that failed.
    pub async fn flush(&self, units: Vec<TransportUnit>) -> Vec<TransportUnit> {
        let mut set = JoinSet::new();
        for unit in units {
            if unit.is_empty() {
                continue;
            }
            let request = self
                .client
                .post(&self.endpoint)
                .headers(self.headers.clone())
                .body(unit.as_bytes().to_vec());
            set.spawn(
                async move {
                    let delivered = Self::send(request, unit.record_count()).await;
                    (unit, delivered)
                }
                .in_current_span(),
            );
        }

        let mut failed = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((_, true)) => {}
                Ok((unit, false)) => failed.push(unit),
                Err(e) => error!("LOGS | Failed to join delivery task: {}", e),
            }
        }
        if !failed.is_empty() {
            debug!("LOGS | {} units could not be delivered", failed.len());
        }
        failed
    }

    async fn send(request: reqwest::RequestBuilder, record_count: usize) -> bool {
        let time = Instant::now();
        let response = request.send().await;
        let elapsed = time.elapsed().as_millis();

        match response {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    debug!(
                        "LOGS | Delivered {} records in {} ms",
                        record_count, elapsed
                    );
                    return true;
                }
                if status == StatusCode::FORBIDDEN || status == StatusCode::UNAUTHORIZED {
                    error!("LOGS | Request was rejected ({status}), please verify the license or API key");
                } else {
                    error!(
                        "LOGS | Failed to deliver {} records: status {} after {} ms",
                        record_count, status, elapsed
                    );
                }
                false
            }
            Err(e) => {
                error!(
                    "LOGS | Failed to deliver {} records after {} ms: {}",
                    record_count, elapsed, e
                );
                false
            }
        }
    }
}
