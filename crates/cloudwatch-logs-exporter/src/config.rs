// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Exporter configuration.
//!
//! Values come from [`ExporterConfig::new`] plus field overrides, or from the
//! environment via [`ExporterConfig::from_env`]. [`ExporterConfig::validate`]
//! runs before an exporter is built.

use std::env;
use std::time::Duration;

use crate::error::ConfigError;
use crate::instance_identity::DEFAULT_METADATA_ENDPOINT;
use crate::sigv4::Credentials;

const DEFAULT_FLUSH_TIMEOUT_SECS: u64 = 5;
const DEFAULT_FLUSH_INTERVAL_SECS: u64 = 10;
const DEFAULT_EXPORT_INTERVAL: usize = 1000;

/// Exporter configuration, supplied once at startup.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Destination log group.
    pub log_group: String,
    /// AWS region, e.g. `eu-west-1`.
    pub region: String,
    /// Destination log stream. When unset, the EC2 instance id is used.
    pub log_stream: Option<String>,
    /// Static credentials. When unset, the standard AWS environment
    /// variables are used.
    pub credentials: Option<Credentials>,
    /// Overrides `https://logs.{region}.amazonaws.com`.
    pub endpoint: Option<String>,
    /// Prepended to every formatted message.
    pub message_prefix: Option<String>,
    /// Per request timeout, in seconds.
    pub flush_timeout: u64,
    /// Interval of the background export service, in seconds.
    pub flush_interval: u64,
    /// Number of buffered records that triggers an early export.
    pub export_interval: usize,
    pub metadata_endpoint: String,
    pub https_proxy: Option<String>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            log_group: String::new(),
            region: String::new(),
            log_stream: None,
            credentials: None,
            endpoint: None,
            message_prefix: None,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT_SECS,
            flush_interval: DEFAULT_FLUSH_INTERVAL_SECS,
            export_interval: DEFAULT_EXPORT_INTERVAL,
            metadata_endpoint: DEFAULT_METADATA_ENDPOINT.to_string(),
            https_proxy: None,
        }
    }
}

impl ExporterConfig {
    #[must_use]
    pub fn new(log_group: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            log_group: log_group.into(),
            region: region.into(),
            ..Default::default()
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|val| !val.trim().is_empty());
        let parse_u64 = |key: &str, default: u64| -> Result<u64, ConfigError> {
            match get(key) {
                Some(val) => val.trim().parse::<u64>().map_err(|_| {
                    ConfigError::InvalidConfig(format!("{key} must be a positive integer, got '{val}'"))
                }),
                None => Ok(default),
            }
        };

        let credentials = match (get("AWS_ACCESS_KEY_ID"), get("AWS_SECRET_ACCESS_KEY")) {
            (Some(access_key_id), Some(secret_access_key)) => Some(Credentials {
                access_key_id,
                secret_access_key,
                session_token: get("AWS_SESSION_TOKEN"),
            }),
            _ => None,
        };

        let config = Self {
            log_group: get("CLOUDWATCH_LOG_GROUP").unwrap_or_default(),
            region: get("AWS_REGION")
                .or_else(|| get("AWS_DEFAULT_REGION"))
                .unwrap_or_default(),
            log_stream: get("CLOUDWATCH_LOG_STREAM"),
            credentials,
            endpoint: get("CLOUDWATCH_LOGS_ENDPOINT"),
            message_prefix: get("CLOUDWATCH_LOG_PREFIX"),
            flush_timeout: parse_u64("CLOUDWATCH_FLUSH_TIMEOUT", DEFAULT_FLUSH_TIMEOUT_SECS)?,
            flush_interval: parse_u64("CLOUDWATCH_FLUSH_INTERVAL", DEFAULT_FLUSH_INTERVAL_SECS)?,
            export_interval: usize::try_from(parse_u64(
                "CLOUDWATCH_EXPORT_INTERVAL",
                DEFAULT_EXPORT_INTERVAL as u64,
            )?)
            .map_err(|e| ConfigError::InvalidConfig(e.to_string()))?,
            metadata_endpoint: get("CLOUDWATCH_METADATA_ENDPOINT")
                .unwrap_or_else(|| DEFAULT_METADATA_ENDPOINT.to_string()),
            https_proxy: get("HTTPS_PROXY").or_else(|| get("https_proxy")),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_group.trim().is_empty() {
            return Err(ConfigError::MissingLogGroup);
        }
        if self.region.trim().is_empty() {
            return Err(ConfigError::MissingRegion);
        }
        if self.log_stream.as_deref().is_some_and(|s| s.trim().is_empty()) {
            return Err(ConfigError::InvalidConfig(
                "log stream name cannot be empty".to_string(),
            ));
        }
        if self.flush_timeout == 0 {
            return Err(ConfigError::InvalidConfig(
                "flush timeout must be greater than 0".to_string(),
            ));
        }
        if self.flush_interval == 0 {
            return Err(ConfigError::InvalidConfig(
                "flush interval must be greater than 0".to_string(),
            ));
        }
        if self.export_interval == 0 {
            return Err(ConfigError::InvalidConfig(
                "export interval must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL of the CloudWatch Logs API for the configured region.
    #[must_use]
    pub fn logs_endpoint(&self) -> String {
        if let Some(endpoint) = &self.endpoint {
            return endpoint.trim_end_matches('/').to_string();
        }
        let suffix = if self.region.starts_with("cn-") {
            "amazonaws.com.cn"
        } else {
            "amazonaws.com"
        };
        format!("https://logs.{}.{suffix}", self.region)
    }

    /// Static credentials if configured, the environment ones otherwise.
    pub fn resolve_credentials(&self) -> Result<Credentials, ConfigError> {
        self.credentials
            .clone()
            .or_else(Credentials::from_env)
            .ok_or(ConfigError::MissingCredentials)
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.flush_timeout)
    }
}
