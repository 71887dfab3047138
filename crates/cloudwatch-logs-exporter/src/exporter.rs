// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! The batch exporter: one call per flush cycle of the host logging framework.
//!
//! Each cycle runs the same linear sequence:
//!
//! 1. ensure the log group exists
//! 2. ensure the log stream exists and re-read its sequence token
//! 3. format every record, skipping malformed ones
//! 4. sort events by timestamp (stable)
//! 5. append, chunk by chunk, chaining the returned token
//!
//! If a chunk fails after earlier ones were appended, the error is
//! [`ExportError::Partial`] and carries the records not yet delivered.
//!
//! A stale token rejection triggers one refresh of step 2 and one retry of
//! the chunk. Nothing is locked remotely; concurrent writers to the same
//! stream are handled by this refresh-then-append-then-retry discipline.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::{LogsApi, PutLogEventsRequest};
use crate::batch::{sort_events, split_batches, BatchLimits};
use crate::client::HttpLogsClient;
use crate::config::ExporterConfig;
use crate::error::{ApiError, ConfigError, ExportError};
use crate::formatter::MessageFormatter;
use crate::http::get_client;
use crate::instance_identity::resolve_log_stream;
use crate::provisioner::ResourceProvisioner;
use crate::record::{ExportRecord, LogRecord};
use crate::sequence::SequenceTracker;

/// Attempts per chunk: the first append plus one retry after a stale token.
const MAX_APPEND_ATTEMPTS: u32 = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportOutcome {
    /// Events appended to the stream.
    pub delivered: usize,
    /// Malformed records that were dropped.
    pub skipped: usize,
}

/// Entry point invoked by a host logging framework once per flush cycle.
#[async_trait]
pub trait LogTarget: Send {
    async fn export(&mut self, records: &[LogRecord]) -> Result<ExportOutcome, ExportError>;
}

pub struct LogExporter<A: ?Sized> {
    api: Arc<A>,
    provisioner: ResourceProvisioner<A>,
    tracker: SequenceTracker,
    formatter: MessageFormatter,
    log_group: String,
    log_stream: String,
    limits: BatchLimits,
}

impl LogExporter<HttpLogsClient> {
    /// Builds an exporter talking to CloudWatch Logs.
    ///
    /// Resolves the stream name from instance metadata when none is configured.
    pub async fn from_config(config: &ExporterConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let credentials = config.resolve_credentials()?;
        let client = get_client(config.timeout(), config.https_proxy.as_deref())?;
        let log_stream = resolve_log_stream(config, &client).await?;
        let api = HttpLogsClient::new(
            client,
            &config.logs_endpoint(),
            &config.region,
            credentials,
        )?;
        debug!(
            "CLOUDWATCH | Exporting to {}/{} in {}",
            config.log_group, log_stream, config.region
        );
        Ok(Self::new(
            Arc::new(api),
            config.log_group.clone(),
            log_stream,
            config.message_prefix.clone(),
        ))
    }
}

impl<A: LogsApi + ?Sized> LogExporter<A> {
    pub fn new(
        api: Arc<A>,
        log_group: String,
        log_stream: String,
        message_prefix: Option<String>,
    ) -> Self {
        Self {
            provisioner: ResourceProvisioner::new(Arc::clone(&api)),
            api,
            tracker: SequenceTracker::new(),
            formatter: MessageFormatter::new(message_prefix),
            log_group,
            log_stream,
            limits: BatchLimits::default(),
        }
    }

    #[must_use]
    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    #[must_use]
    pub fn log_group(&self) -> &str {
        &self.log_group
    }

    #[must_use]
    pub fn log_stream(&self) -> &str {
        &self.log_stream
    }

    /// Token returned by the last append. Advisory only, the next export
    /// re-reads it from the service.
    #[must_use]
    pub fn last_sequence_token(&self) -> Option<&str> {
        self.tracker.token()
    }

    pub async fn export_records(
        &mut self,
        records: &[LogRecord],
    ) -> Result<ExportOutcome, ExportError> {
        if records.is_empty() {
            return Ok(ExportOutcome::default());
        }

        self.provisioner.ensure_log_group(&self.log_group).await?;
        self.tracker
            .refresh(&self.provisioner, &self.log_group, &self.log_stream)
            .await?;

        let mut indexed = Vec::with_capacity(records.len());
        let mut skipped = 0;
        for (index, record) in records.iter().enumerate() {
            match self.formatter.format(record) {
                Ok(event) => indexed.push((index, event)),
                Err(e) => {
                    warn!("CLOUDWATCH | Skipping malformed log record: {e}");
                    skipped += 1;
                }
            }
        }

        sort_events(&mut indexed);
        let (sources, events): (Vec<usize>, Vec<ExportRecord>) = indexed.into_iter().unzip();
        let mut delivered = 0;
        for chunk in split_batches(events, self.limits) {
            let len = chunk.len();
            if let Err(source) = self.append(chunk).await {
                if delivered == 0 {
                    return Err(source);
                }
                // Earlier chunks are stored remotely, only the rest is pending
                let remaining = sources[delivered..]
                    .iter()
                    .map(|&index| records[index].clone())
                    .collect();
                return Err(ExportError::Partial {
                    delivered,
                    remaining,
                    source: Box::new(source),
                });
            }
            delivered += len;
        }

        debug!(
            "CLOUDWATCH | Exported {delivered} events to {}/{} ({skipped} skipped)",
            self.log_group, self.log_stream
        );
        Ok(ExportOutcome { delivered, skipped })
    }

    async fn append(&mut self, events: Vec<ExportRecord>) -> Result<(), ExportError> {
        let mut request = PutLogEventsRequest {
            log_events: events,
            log_group_name: self.log_group.clone(),
            log_stream_name: self.log_stream.clone(),
            sequence_token: self.tracker.token().map(str::to_string),
        };

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.api.put_log_events(&request).await {
                Ok(response) => {
                    if let Some(rejected) = response.rejected_log_events_info {
                        warn!("CLOUDWATCH | Some log events were rejected: {rejected:?}");
                    }
                    self.tracker.update(response.next_sequence_token);
                    return Ok(());
                }
                Err(ApiError::DataAlreadyAccepted { expected }) => {
                    debug!("CLOUDWATCH | Batch was already accepted by a previous attempt");
                    self.tracker.update(expected);
                    return Ok(());
                }
                Err(source @ ApiError::InvalidSequenceToken { .. }) => {
                    if attempts >= MAX_APPEND_ATTEMPTS {
                        return Err(ExportError::StaleToken { attempts, source });
                    }
                    debug!("CLOUDWATCH | Sequence token is stale, refreshing: {source}");
                    request.sequence_token = self
                        .tracker
                        .refresh(&self.provisioner, &self.log_group, &self.log_stream)
                        .await?;
                }
                Err(e) => return Err(ExportError::from(e)),
            }
        }
    }
}

#[async_trait]
impl<A: LogsApi + ?Sized> LogTarget for LogExporter<A> {
    async fn export(&mut self, records: &[LogRecord]) -> Result<ExportOutcome, ExportError> {
        self.export_records(records).await
    }
}
