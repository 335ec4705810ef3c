// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client used to deliver transport units.
//!
//! The client routes requests through [`proxy::ProxyResolver`] and trusts the
//! roots returned by [`certs::build_cert_pool`].

pub mod certs;
pub mod proxy;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Proxy;
use rustls::ClientConfig;
use tracing::debug;

use crate::config::Config;
use crate::http::certs::build_cert_pool;
use crate::http::proxy::ProxyResolver;

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("Invalid proxy URL '{url}': {reason}")]
    InvalidProxyUrl { url: String, reason: String },
    #[error("Failed to read certificates from {}: {source}", .path.display())]
    ReadCertificates {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to configure TLS: {0}")]
    Tls(#[from] rustls::Error),
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Builds the delivery client from the plugin configuration.
pub fn get_client(config: &Config) -> Result<reqwest::Client, HttpError> {
    let resolver = ProxyResolver::new(config.ignore_system_proxy, config.proxy.as_deref())?;
    let roots = build_cert_pool(
        config.ca_bundle_file.as_deref(),
        config.ca_bundle_dir.as_deref(),
    )?;
    debug!("HTTP | Trusting {} root certificates", roots.len());

    let tls = ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()?
    .with_root_certificates(roots)
    .with_no_client_auth();

    let client = reqwest::Client::builder()
        .use_preconfigured_tls(tls)
        .timeout(config.flush_timeout)
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        .tcp_keepalive(Some(Duration::from_secs(120)))
        // System proxies are resolved by `ProxyResolver` instead.
        .no_proxy()
        .proxy(Proxy::custom(move |url| resolver.resolve(url)))
        .build()?;
    Ok(client)
}
