// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Conversion of [`LogRecord`]s into [`ExportRecord`]s.
//!
//! The message body is `"{prefix}[{level}][{category}] {text}"`, followed by one
//! indented `in {file}:{line}` line per trace frame.

use tracing::warn;

use crate::constants::MAX_MESSAGE_BYTES;
use crate::error::FormatError;
use crate::record::{ExportRecord, LogMessage, LogRecord};

const TRACE_INDENT: &str = "\n    ";

#[derive(Debug, Clone, Default)]
pub struct MessageFormatter {
    prefix: String,
}

impl MessageFormatter {
    #[must_use]
    pub fn new(prefix: Option<String>) -> Self {
        Self {
            prefix: prefix.unwrap_or_default(),
        }
    }

    pub fn format(&self, record: &LogRecord) -> Result<ExportRecord, FormatError> {
        let timestamp = timestamp_millis(record.timestamp)?;

        if record.category.trim().is_empty() {
            return Err(FormatError::MissingCategory);
        }
        if let Some(index) = record.trace.iter().position(|frame| frame.file.is_empty()) {
            return Err(FormatError::InvalidTraceFrame(index));
        }

        let prefix = record.prefix.as_deref().unwrap_or(&self.prefix);
        let mut message = format!(
            "{prefix}[{}][{}] {}",
            record.level,
            record.category,
            render_text(&record.message)
        );

        if !record.trace.is_empty() {
            let traces = record
                .trace
                .iter()
                .map(|frame| format!("in {}:{}", frame.file, frame.line))
                .collect::<Vec<String>>();
            message.push_str(TRACE_INDENT);
            message.push_str(&traces.join(TRACE_INDENT));
        }

        Ok(ExportRecord {
            timestamp,
            message: truncate_message(message),
        })
    }
}

fn timestamp_millis(seconds: f64) -> Result<i64, FormatError> {
    let millis = seconds * 1000.0;
    if !millis.is_finite() || millis < 0.0 || millis >= i64::MAX as f64 {
        return Err(FormatError::InvalidTimestamp(seconds));
    }
    Ok(millis as i64)
}

fn render_text(message: &LogMessage) -> String {
    match message {
        LogMessage::Text(text) => text.clone(),
        LogMessage::Error(err) => err.to_string(),
        LogMessage::Structured(value) => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
    }
}

fn truncate_message(mut message: String) -> String {
    if message.len() <= MAX_MESSAGE_BYTES {
        return message;
    }
    let mut cut = MAX_MESSAGE_BYTES;
    while !message.is_char_boundary(cut) {
        cut -= 1;
    }
    warn!(
        "CLOUDWATCH | Truncating log message from {} to {} bytes",
        message.len(),
        cut
    );
    message.truncate(cut);
    message
}
