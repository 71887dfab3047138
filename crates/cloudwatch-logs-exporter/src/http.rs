// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! HTTP client construction.
//!
//! A single `reqwest` client (rustls, pooled connections, optional HTTPS
//! proxy) serves both the log service and the instance metadata lookup.

use std::time::Duration;
use tracing::debug;

use crate::error::ConfigError;

/// Builds the HTTP client shared by the log service client and the
/// instance metadata lookup.
pub fn get_client(
    timeout: Duration,
    https_proxy: Option<&str>,
) -> Result<reqwest::Client, ConfigError> {
    let mut builder = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .pool_idle_timeout(Some(Duration::from_secs(270)))
        // Detect dead connections between flushes
        .tcp_keepalive(Some(Duration::from_secs(120)));

    if let Some(proxy) = https_proxy {
        debug!("CLOUDWATCH | Using HTTPS proxy {proxy}");
        let proxy =
            reqwest::Proxy::https(proxy).map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}
