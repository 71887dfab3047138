// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Background export service for hosts without their own flush policy.
//!
//! Producers hold a cloneable [`ExporterHandle`] and push records through a
//! channel. A single [`ExporterService`] task owns the buffer and the
//! [`LogTarget`], and exports:
//!
//! - every `flush_interval`,
//! - as soon as `export_interval` records are buffered,
//! - on an explicit [`ExporterHandle::flush`],
//! - one last time on shutdown.
//!
//! Export failures are reported through `tracing` and never reach producers,
//! except as the result of an explicit flush. After a transient failure the
//! undelivered records wait for the next tick or explicit flush; the buffer
//! size no longer triggers exports until a flush succeeds.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, warn};

use crate::config::ExporterConfig;
use crate::error::{ExportError, ServiceError};
use crate::exporter::{ExportOutcome, LogTarget};
use crate::record::LogRecord;

/// Maximum number of records kept in memory, oldest evicted first.
pub const MAX_BUFFERED_RECORDS: usize = 50_000;

/// Lower bound for the flush interval, `tokio` rejects a zero period.
const MIN_FLUSH_INTERVAL: Duration = Duration::from_millis(1);

type FlushResponder = oneshot::Sender<Result<ExportOutcome, ExportError>>;

#[derive(Debug)]
pub enum ExporterCommand {
    Log(Vec<LogRecord>),
    Flush(FlushResponder),
    /// Flushes what is buffered, then stops the service.
    Shutdown(FlushResponder),
}

#[derive(Clone, Debug)]
pub struct ExporterHandle {
    tx: mpsc::UnboundedSender<ExporterCommand>,
}

impl ExporterHandle {
    /// Buffers a record without waiting for the export.
    pub fn log(&self, record: LogRecord) -> Result<(), ServiceError> {
        self.log_batch(vec![record])
    }

    pub fn log_batch(&self, records: Vec<LogRecord>) -> Result<(), ServiceError> {
        self.tx
            .send(ExporterCommand::Log(records))
            .map_err(|e| ServiceError::Unavailable(e.to_string()))
    }

    /// Exports everything buffered so far and waits for the outcome.
    pub async fn flush(&self) -> Result<ExportOutcome, ServiceError> {
        self.request(ExporterCommand::Flush).await
    }

    /// Flushes and stops the service.
    pub async fn shutdown(&self) -> Result<ExportOutcome, ServiceError> {
        self.request(ExporterCommand::Shutdown).await
    }

    async fn request(
        &self,
        command: fn(FlushResponder) -> ExporterCommand,
    ) -> Result<ExportOutcome, ServiceError> {
        let (response_tx, response_rx) = oneshot::channel();
        self.tx
            .send(command(response_tx))
            .map_err(|e| ServiceError::Unavailable(format!("Failed to send command: {e}")))?;
        let result = response_rx.await.map_err(|e| {
            ServiceError::Unavailable(format!("Failed to receive flush response: {e}"))
        })?;
        Ok(result?)
    }
}

pub struct ExporterService<T> {
    target: T,
    rx: mpsc::UnboundedReceiver<ExporterCommand>,
    buffer: VecDeque<LogRecord>,
    flush_interval: Duration,
    export_interval: usize,
    max_buffered: usize,
    /// Set after a transient export failure, cleared by the next success.
    retry_pending: bool,
}

impl<T: LogTarget> ExporterService<T> {
    #[must_use]
    pub fn new(
        target: T,
        flush_interval: Duration,
        export_interval: usize,
    ) -> (Self, ExporterHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let service = Self {
            target,
            rx,
            buffer: VecDeque::new(),
            flush_interval: flush_interval.max(MIN_FLUSH_INTERVAL),
            export_interval: export_interval.max(1),
            max_buffered: MAX_BUFFERED_RECORDS,
            retry_pending: false,
        };
        (service, ExporterHandle { tx })
    }

    #[must_use]
    pub fn from_config(target: T, config: &ExporterConfig) -> (Self, ExporterHandle) {
        Self::new(
            target,
            Duration::from_secs(config.flush_interval),
            config.export_interval,
        )
    }

    #[must_use]
    pub fn with_max_buffered(mut self, max_buffered: usize) -> Self {
        self.max_buffered = max_buffered.max(1);
        self
    }

    /// Processes commands until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        debug!("CLOUDWATCH | Export service started");

        let mut ticker = tokio::time::interval(self.flush_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                command = self.rx.recv() => match command {
                    Some(ExporterCommand::Log(records)) => {
                        self.buffer_records(records);
                        let full = self.buffer.len() >= self.export_interval;
                        if full && !self.retry_pending {
                            let _ = self.flush().await;
                        }
                    }
                    Some(ExporterCommand::Flush(response_tx)) => {
                        let result = self.flush().await;
                        if response_tx.send(result).is_err() {
                            error!("CLOUDWATCH | Failed to send flush response - receiver dropped");
                        }
                    }
                    Some(ExporterCommand::Shutdown(response_tx)) => {
                        let result = self.flush().await;
                        let _ = response_tx.send(result);
                        break;
                    }
                    None => {
                        let _ = self.flush().await;
                        break;
                    }
                },
                _ = ticker.tick() => {
                    let _ = self.flush().await;
                }
            }
        }

        debug!("CLOUDWATCH | Export service stopped");
    }

    fn buffer_records(&mut self, records: Vec<LogRecord>) {
        self.buffer.extend(records);
        self.evict_overflow();
    }

    fn evict_overflow(&mut self) {
        let overflow = self.buffer.len().saturating_sub(self.max_buffered);
        if overflow > 0 {
            warn!("CLOUDWATCH | Export buffer full, dropping {overflow} oldest log records");
            self.buffer.drain(..overflow);
        }
    }

    async fn flush(&mut self) -> Result<ExportOutcome, ExportError> {
        if self.buffer.is_empty() {
            return Ok(ExportOutcome::default());
        }

        let records: Vec<LogRecord> = self.buffer.drain(..).collect();
        match self.target.export(&records).await {
            Ok(outcome) => {
                self.retry_pending = false;
                Ok(outcome)
            }
            Err(e) if e.is_retryable() => {
                let pending = match &e {
                    ExportError::Partial { remaining, .. } => remaining.clone(),
                    _ => records,
                };
                error!(
                    "CLOUDWATCH | Failed to export {} log records, will retry on next flush: {e}",
                    pending.len()
                );
                self.buffer.extend(pending);
                self.evict_overflow();
                self.retry_pending = true;
                Err(e)
            }
            Err(e) => {
                self.retry_pending = false;
                error!(
                    "CLOUDWATCH | Failed to export {} log records, dropping them: {e}",
                    records.len()
                );
                Err(e)
            }
        }
    }
}
