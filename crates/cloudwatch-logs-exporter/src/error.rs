// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Error taxonomy of the export pipeline.

use crate::record::LogRecord;

/// Errors raised while building an exporter. The exporter must not start.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("A log group must be set")]
    MissingLogGroup,

    #[error("The AWS region must be set")]
    MissingRegion,

    #[error("No log stream name is set and the instance id could not be resolved: {0}")]
    UnresolvableLogStream(String),

    #[error("No static credentials configured and none found in the environment")]
    MissingCredentials,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// A single record could not be turned into an export event.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormatError {
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(f64),

    #[error("missing category")]
    MissingCategory,

    #[error("trace frame {0} has no file")]
    InvalidTraceFrame(usize),
}

/// Outcome of a failed call to the remote log service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The supplied sequence token is not the stream's current one.
    #[error("invalid sequence token (expected {expected:?}): {message}")]
    InvalidSequenceToken {
        expected: Option<String>,
        message: String,
    },

    /// This exact batch was already stored by a previous attempt.
    #[error("data already accepted (next token {expected:?})")]
    DataAlreadyAccepted { expected: Option<String> },

    #[error("resource already exists: {0}")]
    ResourceAlreadyExists(String),

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Non-retryable rejection such as access denied or invalid parameter.
    #[error("{code}: {message}")]
    Service { code: String, message: String },

    /// Network failure, throttling or server side unavailability.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

/// A log group or log stream could not be verified or created.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProvisionError {
    #[error("log group '{name}': {source}")]
    LogGroup {
        name: String,
        #[source]
        source: ApiError,
    },

    #[error("log stream '{group}/{name}': {source}")]
    LogStream {
        group: String,
        name: String,
        #[source]
        source: ApiError,
    },
}

impl ProvisionError {
    #[must_use]
    pub fn api_error(&self) -> &ApiError {
        match self {
            ProvisionError::LogGroup { source, .. } | ProvisionError::LogStream { source, .. } => {
                source
            }
        }
    }
}

/// Failure of one export cycle. The batch was not (fully) delivered.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExportError {
    #[error("provisioning failed: {0}")]
    Provision(ProvisionError),

    /// The append was rejected as stale again after a refresh and retry.
    #[error("sequence token still stale after {attempts} attempts: {source}")]
    StaleToken {
        attempts: u32,
        #[source]
        source: ApiError,
    },

    #[error("transport failure: {0}")]
    Transport(ApiError),

    #[error("append rejected: {0}")]
    Rejected(ApiError),

    /// Some chunks were appended before a later chunk failed. `remaining`
    /// holds the records that were not delivered, in export order.
    #[error("{delivered} events delivered before failure: {source}")]
    Partial {
        delivered: usize,
        remaining: Vec<LogRecord>,
        #[source]
        source: Box<ExportError>,
    },
}

impl ExportError {
    /// Whether the same batch is worth sending again on a later cycle.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ExportError::Transport(_) => true,
            ExportError::Partial { source, .. } => source.is_retryable(),
            _ => false,
        }
    }
}

/// A command could not be completed by the background export service.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ServiceError {
    #[error("export service unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl From<ProvisionError> for ExportError {
    fn from(err: ProvisionError) -> Self {
        if err.api_error().is_transport() {
            ExportError::Transport(err.api_error().clone())
        } else {
            ExportError::Provision(err)
        }
    }
}

impl From<ApiError> for ExportError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Transport(_) => ExportError::Transport(err),
            ApiError::InvalidSequenceToken { .. } => ExportError::StaleToken {
                attempts: 1,
                source: err,
            },
            other => ExportError::Rejected(other),
        }
    }
}
