// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Idempotent creation of the destination log group and log stream.
//!
//! Both checks are describe-then-create. A `ResourceAlreadyExists` answer to
//! the create call means another exporter won the race and is not an error.

use std::sync::Arc;
use tracing::debug;

use crate::api::{LogStream, LogsApi};
use crate::error::{ApiError, ProvisionError};

pub struct ResourceProvisioner<A: ?Sized> {
    api: Arc<A>,
}

impl<A: LogsApi + ?Sized> ResourceProvisioner<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    /// Creates the log group unless a group with exactly this name exists.
    pub async fn ensure_log_group(&self, name: &str) -> Result<(), ProvisionError> {
        let group_error = |source: ApiError| ProvisionError::LogGroup {
            name: name.to_string(),
            source,
        };

        let groups = self
            .api
            .describe_log_groups(name)
            .await
            .map_err(group_error)?;
        if groups.iter().any(|group| group.log_group_name == name) {
            return Ok(());
        }

        debug!("CLOUDWATCH | Creating log group {name}");
        match self.api.create_log_group(name).await {
            Ok(()) => Ok(()),
            Err(ApiError::ResourceAlreadyExists(_)) => {
                debug!("CLOUDWATCH | Log group {name} was created concurrently");
                Ok(())
            }
            Err(e) => Err(group_error(e)),
        }
    }

    /// Creates the log stream unless it exists. Returns whether it existed.
    pub async fn ensure_log_stream(&self, group: &str, stream: &str) -> Result<bool, ProvisionError> {
        Ok(self.ensure_log_stream_metadata(group, stream).await?.is_some())
    }

    /// Like [`Self::ensure_log_stream`], returning the existing stream's
    /// description, or `None` if it had to be created.
    pub async fn ensure_log_stream_metadata(
        &self,
        group: &str,
        stream: &str,
    ) -> Result<Option<LogStream>, ProvisionError> {
        if let Some(existing) = self.find_log_stream(group, stream).await? {
            return Ok(Some(existing));
        }

        debug!("CLOUDWATCH | Creating log stream {group}/{stream}");
        match self.api.create_log_stream(group, stream).await {
            Ok(()) => Ok(None),
            Err(ApiError::ResourceAlreadyExists(_)) => {
                debug!("CLOUDWATCH | Log stream {group}/{stream} was created concurrently");
                // The winner may already have written, so pick up its token
                self.find_log_stream(group, stream).await
            }
            Err(source) => Err(stream_error(group, stream, source)),
        }
    }

    /// Looks up the stream with exactly this name among the prefix matches.
    pub async fn find_log_stream(
        &self,
        group: &str,
        stream: &str,
    ) -> Result<Option<LogStream>, ProvisionError> {
        let streams = self
            .api
            .describe_log_streams(group, stream)
            .await
            .map_err(|source| stream_error(group, stream, source))?;
        Ok(streams
            .into_iter()
            .find(|candidate| candidate.log_stream_name == stream))
    }
}

fn stream_error(group: &str, stream: &str, source: ApiError) -> ProvisionError {
    ProvisionError::LogStream {
        group: group.to_string(),
        name: stream.to_string(),
        source,
    }
}
