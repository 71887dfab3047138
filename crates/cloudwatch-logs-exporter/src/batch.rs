// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Ordering and chunking of export events.
//!
//! The service rejects an append whose events are not in chronological
//! order, so events are sorted (stable, equal timestamps keep their input
//! order) and then cut into consecutive chunks that each respect the
//! `PutLogEvents` count, size and time span limits.

use crate::constants;
use crate::record::ExportRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_events: usize,
    pub max_bytes: usize,
    pub max_span_millis: i64,
}

impl Default for BatchLimits {
    fn default() -> Self {
        Self {
            max_events: constants::MAX_BATCH_EVENTS,
            max_bytes: constants::MAX_BATCH_SIZE_BYTES,
            max_span_millis: constants::MAX_BATCH_SPAN_MILLIS,
        }
    }
}

/// Sorts `(record index, event)` pairs by timestamp ascending, keeping
/// input order for ties.
pub fn sort_events(events: &mut [(usize, ExportRecord)]) {
    events.sort_by_key(|(_, event)| event.timestamp);
}

fn event_size(event: &ExportRecord) -> usize {
    event.message.len() + constants::EVENT_OVERHEAD_BYTES
}

/// Splits sorted events into chunks within `limits`, preserving order.
#[must_use]
pub fn split_batches(events: Vec<ExportRecord>, limits: BatchLimits) -> Vec<Vec<ExportRecord>> {
    let mut batches = Vec::new();
    let mut current: Vec<ExportRecord> = Vec::new();
    let mut current_bytes = 0;

    for event in events {
        let size = event_size(&event);
        let too_many = current.len() >= limits.max_events;
        let too_big = current_bytes + size > limits.max_bytes;
        let too_long = current
            .first()
            .is_some_and(|first| event.timestamp - first.timestamp > limits.max_span_millis);

        if !current.is_empty() && (too_many || too_big || too_long) {
            batches.push(std::mem::take(&mut current));
            current_bytes = 0;
        }
        current_bytes += size;
        current.push(event);
    }

    if !current.is_empty() {
        batches.push(current);
    }
    batches
}
