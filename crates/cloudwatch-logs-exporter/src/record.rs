// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Input records handed over by the host logging framework, and the events
//! derived from them.

use serde::Serialize;
use std::fmt;

/// Severity of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Error,
    Warning,
    Info,
    Trace,
    Profile,
    ProfileBegin,
    ProfileEnd,
}

impl Level {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Info => "info",
            Level::Trace => "trace",
            Level::Profile => "profile",
            Level::ProfileBegin => "profile begin",
            Level::ProfileEnd => "profile end",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error value carried as a log message.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    pub kind: String,
    pub message: String,
    /// `(file, line)` where the error was raised, if known.
    pub location: Option<(String, u32)>,
    pub stack: Vec<String>,
}

impl ErrorValue {
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            location: None,
            stack: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_location(mut self, file: impl Into<String>, line: u32) -> Self {
        self.location = Some((file.into(), line));
        self
    }

    #[must_use]
    pub fn with_stack(mut self, stack: Vec<String>) -> Self {
        self.stack = stack;
        self
    }

    /// Captures an error and its `source()` chain.
    pub fn from_error<E: std::error::Error + ?Sized>(err: &E) -> Self {
        let mut stack = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            stack.push(format!("Caused by: {cause}"));
            source = cause.source();
        }
        Self {
            kind: short_type_name(std::any::type_name::<E>()).to_string(),
            message: err.to_string(),
            location: None,
            stack,
        }
    }
}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some((file, line)) = &self.location {
            write!(f, " in {file}:{line}")?;
        }
        if !self.stack.is_empty() {
            f.write_str("\nStack trace:")?;
            for (i, frame) in self.stack.iter().enumerate() {
                write!(f, "\n#{i} {frame}")?;
            }
        }
        Ok(())
    }
}

/// Payload of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum LogMessage {
    Text(String),
    Error(ErrorValue),
    Structured(serde_json::Value),
}

impl From<&str> for LogMessage {
    fn from(text: &str) -> Self {
        LogMessage::Text(text.to_string())
    }
}

impl From<String> for LogMessage {
    fn from(text: String) -> Self {
        LogMessage::Text(text)
    }
}

impl From<ErrorValue> for LogMessage {
    fn from(err: ErrorValue) -> Self {
        LogMessage::Error(err)
    }
}

impl From<serde_json::Value> for LogMessage {
    fn from(value: serde_json::Value) -> Self {
        LogMessage::Structured(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    pub file: String,
    pub line: u32,
}

impl TraceFrame {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

/// A raw record from the host logging framework. Immutable once exported.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub message: LogMessage,
    pub level: Level,
    pub category: String,
    /// Unix time in seconds, fractional part allowed.
    pub timestamp: f64,
    pub trace: Vec<TraceFrame>,
    /// Overrides the exporter's configured message prefix.
    pub prefix: Option<String>,
}

impl LogRecord {
    #[must_use]
    pub fn new(
        message: impl Into<LogMessage>,
        level: Level,
        category: impl Into<String>,
        timestamp: f64,
    ) -> Self {
        Self {
            message: message.into(),
            level,
            category: category.into(),
            timestamp,
            trace: Vec::new(),
            prefix: None,
        }
    }

    #[must_use]
    pub fn with_trace(mut self, trace: Vec<TraceFrame>) -> Self {
        self.trace = trace;
        self
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// One event of a `PutLogEvents` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRecord {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub message: String,
}
