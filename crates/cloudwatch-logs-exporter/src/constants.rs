// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CloudWatch Logs `PutLogEvents` limits.
//!
//! A single append must stay under all of these at once. The exporter splits
//! larger batches into consecutive chunks (see [`crate::batch`]).

/// Maximum number of events in one `PutLogEvents` call.
pub const MAX_BATCH_EVENTS: usize = 10_000;

/// Maximum payload size of one `PutLogEvents` call, in bytes.
///
/// Computed as the sum of all UTF-8 message lengths plus
/// [`EVENT_OVERHEAD_BYTES`] for each event.
pub const MAX_BATCH_SIZE_BYTES: usize = 1_048_576;

/// Fixed per-event overhead counted against [`MAX_BATCH_SIZE_BYTES`].
pub const EVENT_OVERHEAD_BYTES: usize = 26;

/// Maximum size of a single event, overhead included.
pub const MAX_EVENT_SIZE_BYTES: usize = 262_144;

/// Maximum UTF-8 length of a single message before truncation.
pub const MAX_MESSAGE_BYTES: usize = MAX_EVENT_SIZE_BYTES - EVENT_OVERHEAD_BYTES;

/// Events in one append may not span more than 24 hours.
pub const MAX_BATCH_SPAN_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// API version prefix used in the `X-Amz-Target` header.
pub const TARGET_PREFIX: &str = "Logs_20140328";

/// Signing name of the service for SigV4.
pub const SERVICE_NAME: &str = "logs";

/// Content type of the AWS JSON 1.1 protocol.
pub const CONTENT_TYPE: &str = "application/x-amz-json-1.1";
