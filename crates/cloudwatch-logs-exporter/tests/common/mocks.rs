// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory CloudWatch Logs used by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use cloudwatch_logs_exporter::api::{
    LogGroup, LogStream, LogsApi, PutLogEventsRequest, PutLogEventsResponse,
};
use cloudwatch_logs_exporter::error::ApiError;
use cloudwatch_logs_exporter::record::ExportRecord;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    DescribeLogGroups(String),
    CreateLogGroup(String),
    DescribeLogStreams(String, String),
    CreateLogStream(String, String),
    PutLogEvents(PutLogEventsRequest),
}

#[derive(Debug, Default)]
struct Stream {
    token: Option<String>,
    events: Vec<ExportRecord>,
}

#[derive(Debug, Default)]
struct State {
    groups: BTreeMap<String, BTreeMap<String, Stream>>,
    calls: Vec<Call>,
    issued_tokens: u64,
    put_failures: VecDeque<ApiError>,
    /// Failures keyed by the 1-based number of the put call they answer.
    scheduled_put_failures: BTreeMap<usize, ApiError>,
    puts_seen: usize,
    create_group_failures: VecDeque<ApiError>,
    /// Tokens reported by the next describe calls instead of the real one.
    stale_describe_tokens: VecDeque<String>,
    /// Number of upcoming stream describes that report nothing.
    blind_stream_describes: usize,
    /// Number of upcoming group describes that report nothing.
    blind_group_describes: usize,
}

/// Mock log service that keeps groups, streams and events in memory and
/// enforces sequence tokens the way the real service does.
#[derive(Debug, Default)]
pub struct InMemoryLogs {
    state: Mutex<State>,
}

impl InMemoryLogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(self, group: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .groups
            .entry(group.to_string())
            .or_default();
        self
    }

    pub fn with_stream(self, group: &str, stream: &str, token: Option<&str>) -> Self {
        self.state
            .lock()
            .unwrap()
            .groups
            .entry(group.to_string())
            .or_default()
            .insert(
                stream.to_string(),
                Stream {
                    token: token.map(str::to_string),
                    events: Vec::new(),
                },
            );
        self
    }

    /// Simulates another writer appending to the stream.
    pub fn advance_token(&self, group: &str, stream: &str, token: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(s) = state
            .groups
            .get_mut(group)
            .and_then(|streams| streams.get_mut(stream))
        {
            s.token = Some(token.to_string());
        }
    }

    pub fn fail_next_put(&self, err: ApiError) {
        self.state.lock().unwrap().put_failures.push_back(err);
    }

    /// Fails the `nth` put call overall, counting from 1.
    pub fn fail_put_number(&self, nth: usize, err: ApiError) {
        self.state
            .lock()
            .unwrap()
            .scheduled_put_failures
            .insert(nth, err);
    }

    pub fn fail_next_create_group(&self, err: ApiError) {
        self.state.lock().unwrap().create_group_failures.push_back(err);
    }

    pub fn report_stale_token_once(&self, token: &str) {
        self.state
            .lock()
            .unwrap()
            .stale_describe_tokens
            .push_back(token.to_string());
    }

    pub fn hide_streams_once(&self) {
        self.state.lock().unwrap().blind_stream_describes += 1;
    }

    pub fn hide_groups_once(&self) {
        self.state.lock().unwrap().blind_group_describes += 1;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn puts(&self) -> Vec<PutLogEventsRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::PutLogEvents(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| matches(call)).count()
    }

    pub fn events(&self, group: &str, stream: &str) -> Vec<ExportRecord> {
        self.state
            .lock()
            .unwrap()
            .groups
            .get(group)
            .and_then(|streams| streams.get(stream))
            .map(|s| s.events.clone())
            .unwrap_or_default()
    }

    pub fn token(&self, group: &str, stream: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .groups
            .get(group)
            .and_then(|streams| streams.get(stream))
            .and_then(|s| s.token.clone())
    }
}

#[async_trait]
impl LogsApi for InMemoryLogs {
    async fn describe_log_groups(&self, name_prefix: &str) -> Result<Vec<LogGroup>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::DescribeLogGroups(name_prefix.to_string()));
        if state.blind_group_describes > 0 {
            state.blind_group_describes -= 1;
            return Ok(Vec::new());
        }
        Ok(state
            .groups
            .keys()
            .filter(|name| name.starts_with(name_prefix))
            .map(|name| LogGroup {
                log_group_name: name.clone(),
            })
            .collect())
    }

    async fn create_log_group(&self, name: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateLogGroup(name.to_string()));
        if let Some(err) = state.create_group_failures.pop_front() {
            return Err(err);
        }
        if state.groups.contains_key(name) {
            return Err(ApiError::ResourceAlreadyExists(format!(
                "The specified log group already exists: {name}"
            )));
        }
        state.groups.insert(name.to_string(), BTreeMap::new());
        Ok(())
    }

    async fn describe_log_streams(
        &self,
        group: &str,
        name_prefix: &str,
    ) -> Result<Vec<LogStream>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DescribeLogStreams(
            group.to_string(),
            name_prefix.to_string(),
        ));
        if state.blind_stream_describes > 0 {
            state.blind_stream_describes -= 1;
            return Ok(Vec::new());
        }
        let stale = state.stale_describe_tokens.pop_front();
        let Some(streams) = state.groups.get(group) else {
            return Err(ApiError::ResourceNotFound(format!(
                "The specified log group does not exist: {group}"
            )));
        };
        Ok(streams
            .iter()
            .filter(|(name, _)| name.starts_with(name_prefix))
            .map(|(name, s)| LogStream {
                log_stream_name: name.clone(),
                upload_sequence_token: if name == name_prefix && stale.is_some() {
                    stale.clone()
                } else {
                    s.token.clone()
                },
            })
            .collect())
    }

    async fn create_log_stream(&self, group: &str, name: &str) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(Call::CreateLogStream(group.to_string(), name.to_string()));
        let Some(streams) = state.groups.get_mut(group) else {
            return Err(ApiError::ResourceNotFound(format!(
                "The specified log group does not exist: {group}"
            )));
        };
        if streams.contains_key(name) {
            return Err(ApiError::ResourceAlreadyExists(format!(
                "The specified log stream already exists: {name}"
            )));
        }
        streams.insert(name.to_string(), Stream::default());
        Ok(())
    }

    async fn put_log_events(
        &self,
        request: &PutLogEventsRequest,
    ) -> Result<PutLogEventsResponse, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::PutLogEvents(request.clone()));
        state.puts_seen += 1;
        let nth = state.puts_seen;
        if let Some(err) = state.scheduled_put_failures.remove(&nth) {
            return Err(err);
        }
        if let Some(err) = state.put_failures.pop_front() {
            return Err(err);
        }

        let next = format!("token-{}", state.issued_tokens + 1);
        let stream = state
            .groups
            .get_mut(&request.log_group_name)
            .and_then(|streams| streams.get_mut(&request.log_stream_name))
            .ok_or_else(|| {
                ApiError::ResourceNotFound(format!(
                    "The specified log stream does not exist: {}",
                    request.log_stream_name
                ))
            })?;

        if stream.token != request.sequence_token {
            return Err(ApiError::InvalidSequenceToken {
                expected: stream.token.clone(),
                message: "The given sequenceToken is invalid.".to_string(),
            });
        }
        if request
            .log_events
            .windows(2)
            .any(|pair| pair[0].timestamp > pair[1].timestamp)
        {
            return Err(ApiError::Service {
                code: "InvalidParameterException".to_string(),
                message: "Log events in a single PutLogEvents request must be in chronological order."
                    .to_string(),
            });
        }

        stream.events.extend(request.log_events.iter().cloned());
        stream.token = Some(next.clone());
        state.issued_tokens += 1;
        Ok(PutLogEventsResponse {
            next_sequence_token: Some(next),
            rejected_log_events_info: None,
        })
    }
}
