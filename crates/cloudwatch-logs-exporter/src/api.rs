// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Downstream operations the exporter needs from the remote log service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::record::ExportRecord;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogGroup {
    pub log_group_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStream {
    pub log_stream_name: String,
    /// Absent for a stream that was never written to.
    #[serde(default)]
    pub upload_sequence_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutLogEventsRequest {
    pub log_events: Vec<ExportRecord>,
    pub log_group_name: String,
    pub log_stream_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutLogEventsResponse {
    #[serde(default)]
    pub next_sequence_token: Option<String>,
    #[serde(default)]
    pub rejected_log_events_info: Option<RejectedLogEventsInfo>,
}

/// Indexes of events the service accepted the call for but discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedLogEventsInfo {
    #[serde(default)]
    pub too_new_log_event_start_index: Option<i64>,
    #[serde(default)]
    pub too_old_log_event_end_index: Option<i64>,
    #[serde(default)]
    pub expired_log_event_end_index: Option<i64>,
}

#[async_trait]
pub trait LogsApi: Send + Sync {
    /// Lists every log group whose name starts with `name_prefix`.
    async fn describe_log_groups(&self, name_prefix: &str) -> Result<Vec<LogGroup>, ApiError>;

    async fn create_log_group(&self, name: &str) -> Result<(), ApiError>;

    /// Lists every stream of `group` whose name starts with `name_prefix`.
    async fn describe_log_streams(
        &self,
        group: &str,
        name_prefix: &str,
    ) -> Result<Vec<LogStream>, ApiError>;

    async fn create_log_stream(&self, group: &str, name: &str) -> Result<(), ApiError>;

    /// Appends events; `sequence_token` must match the stream's current one.
    async fn put_log_events(
        &self,
        request: &PutLogEventsRequest,
    ) -> Result<PutLogEventsResponse, ApiError>;
}
