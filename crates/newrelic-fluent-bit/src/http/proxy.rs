// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Proxy selection for outgoing requests.
//!
//! A proxy configured for the plugin always wins. Otherwise, unless the system
//! proxy is ignored, `HTTPS_PROXY` is used for https requests and `HTTP_PROXY`
//! for http requests, skipping hosts listed in `NO_PROXY` and loopback hosts.

use std::env;
use std::net::IpAddr;

use reqwest::Url;
use tracing::warn;

use crate::http::HttpError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyResolver {
    configured: Option<Url>,
    system: Option<SystemProxy>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SystemProxy {
    http: Option<Url>,
    https: Option<Url>,
    no_proxy: Vec<String>,
}

impl ProxyResolver {
    /// Reads the system proxy settings from the environment once.
    ///
    /// An invalid `configured_proxy` is an error. Invalid environment proxies
    /// are logged and ignored.
    pub fn new(ignore_system_proxy: bool, configured_proxy: Option<&str>) -> Result<Self, HttpError> {
        Self::with_lookup(ignore_system_proxy, configured_proxy, |name| {
            env::var(name).ok()
        })
    }

    fn with_lookup<F>(
        ignore_system_proxy: bool,
        configured_proxy: Option<&str>,
        lookup: F,
    ) -> Result<Self, HttpError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let configured = configured_proxy
            .filter(|proxy| !proxy.trim().is_empty())
            .map(parse_proxy_url)
            .transpose()?;

        let system = if ignore_system_proxy {
            None
        } else {
            let read = |upper: &str, lower: &str| {
                lookup(upper)
                    .or_else(|| lookup(lower))
                    .filter(|val| !val.trim().is_empty())
            };
            let env_proxy = |upper: &str, lower: &str| {
                read(upper, lower).and_then(|val| match parse_proxy_url(&val) {
                    Ok(url) => Some(url),
                    Err(e) => {
                        warn!("Ignoring {upper}: {e}");
                        None
                    }
                })
            };
            Some(SystemProxy {
                http: env_proxy("HTTP_PROXY", "http_proxy"),
                https: env_proxy("HTTPS_PROXY", "https_proxy"),
                no_proxy: read("NO_PROXY", "no_proxy")
                    .map(|val| parse_no_proxy(&val))
                    .unwrap_or_default(),
            })
        };

        Ok(ProxyResolver { configured, system })
    }

    /// Proxy to use for a request to `url`, if any.
    #[must_use]
    pub fn resolve(&self, url: &Url) -> Option<Url> {
        if let Some(configured) = &self.configured {
            return Some(configured.clone());
        }

        let system = self.system.as_ref()?;
        let host = url.host_str()?;
        if is_loopback(host) || system.bypasses(host) {
            return None;
        }

        match url.scheme() {
            "https" => system.https.clone(),
            "http" => system.http.clone(),
            _ => None,
        }
    }
}

impl SystemProxy {
    fn bypasses(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        self.no_proxy.iter().any(|entry| {
            entry == "*"
                || host == *entry
                || host
                    .strip_suffix(entry.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

fn parse_proxy_url(proxy: &str) -> Result<Url, HttpError> {
    let proxy = proxy.trim();
    let parsed = if proxy.contains("://") {
        Url::parse(proxy)
    } else {
        Url::parse(&format!("http://{proxy}"))
    };
    let url = parsed.map_err(|e| HttpError::InvalidProxyUrl {
        url: proxy.to_string(),
        reason: e.to_string(),
    })?;

    if url.host_str().is_none() {
        return Err(HttpError::InvalidProxyUrl {
            url: proxy.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

// Entries are hosts or domain suffixes; ports and leading dots are dropped.
fn parse_no_proxy(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let entry = entry.trim_start_matches("*.").trim_start_matches('.');
            let host = match entry.rsplit_once(':') {
                Some((host, port)) if port.chars().all(|c| c.is_ascii_digit()) => host,
                _ => entry,
            };
            host.to_lowercase()
        })
        .collect()
}

fn is_loopback(host: &str) -> bool {
    if host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    host.trim_start_matches('[')
        .trim_end_matches(']')
        .parse::<IpAddr>()
        .is_ok_and(|ip| ip.is_loopback())
}
