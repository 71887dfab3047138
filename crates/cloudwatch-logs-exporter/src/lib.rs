// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batched, ordered log export to CloudWatch Logs.
//!
//! The pipeline accepts unordered batches of [`record::LogRecord`]s from a host
//! logging framework and appends them to a log group / log stream pair:
//!
//! ```text
//!   LogRecord batch
//!        │
//!        v
//!   ┌──────────────────┐
//!   │ Ensure log group │ (describe, create if missing)
//!   └────────┬─────────┘
//!            v
//!   ┌──────────────────┐
//!   │ Ensure stream +  │ (describe, create if missing,
//!   │ refresh token    │  read upload sequence token)
//!   └────────┬─────────┘
//!            v
//!   ┌──────────────────┐
//!   │ Format + sort    │ (stable, by timestamp)
//!   └────────┬─────────┘
//!            v
//!   ┌──────────────────┐
//!   │ PutLogEvents     │ (retry once on stale token)
//!   └──────────────────┘
//! ```
//!
//! - **[`exporter`]**: the batch exporter and the [`exporter::LogTarget`] trait
//! - **[`provisioner`]**: idempotent log group / log stream creation
//! - **[`sequence`]**: per-cycle sequence token tracking
//! - **[`formatter`]**: record to export event conversion
//! - **[`service`]**: background buffering service driven by a flush interval
//! - **[`client`]**: signed HTTP implementation of [`api::LogsApi`]

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod api;
pub mod batch;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod exporter;
pub mod formatter;
pub mod http;
pub mod instance_identity;
pub mod provisioner;
pub mod record;
pub mod sequence;
pub mod service;
pub mod sigv4;

pub use exporter::{ExportOutcome, LogExporter, LogTarget};
pub use record::{ErrorValue, ExportRecord, Level, LogMessage, LogRecord, TraceFrame};
