// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! CloudWatch Logs client speaking the AWS JSON 1.1 protocol over `reqwest`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::api::{LogGroup, LogStream, LogsApi, PutLogEventsRequest, PutLogEventsResponse};
use crate::constants::{CONTENT_TYPE, SERVICE_NAME, TARGET_PREFIX};
use crate::error::{ApiError, ConfigError};
use crate::sigv4::{Credentials, Signer};

/// Error `__type`s that signal a transient condition.
const TRANSIENT_ERRORS: &[&str] = &[
    "ServiceUnavailableException",
    "ThrottlingException",
    "RequestLimitExceeded",
    "LimitExceededException",
];

#[derive(Debug, Clone)]
pub struct HttpLogsClient {
    client: reqwest::Client,
    endpoint: Url,
    signer: Signer,
}

impl HttpLogsClient {
    pub fn new(
        client: reqwest::Client,
        endpoint: &str,
        region: &str,
        credentials: Credentials,
    ) -> Result<Self, ConfigError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| ConfigError::InvalidConfig(format!("invalid endpoint '{endpoint}': {e}")))?;
        Ok(Self {
            client,
            endpoint,
            signer: Signer::new(credentials, region, SERVICE_NAME),
        })
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &str,
        payload: &serde_json::Value,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_vec(payload).map_err(|e| ApiError::Decode(e.to_string()))?;
        let target = format!("{TARGET_PREFIX}.{operation}");
        let unsigned = [("content-type", CONTENT_TYPE), ("x-amz-target", target.as_str())];

        let mut request = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", CONTENT_TYPE)
            .header("x-amz-target", target.as_str());
        for (name, value) in self
            .signer
            .sign("POST", &self.endpoint, &unsigned, &body, Utc::now())
        {
            request = request.header(name, value);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        if status.is_success() {
            if text.trim().is_empty() {
                return serde_json::from_str("{}").map_err(|e| ApiError::Decode(e.to_string()));
            }
            return serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()));
        }

        debug!("CLOUDWATCH | {operation} failed with {status}: {text}");
        Err(parse_error(status, &text))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type", default)]
    error_type: Option<String>,
    #[serde(alias = "Message", default)]
    message: Option<String>,
    #[serde(rename = "expectedSequenceToken", default)]
    expected_sequence_token: Option<String>,
}

fn parse_error(status: StatusCode, text: &str) -> ApiError {
    let body: ErrorBody = serde_json::from_str(text).unwrap_or_default();
    let code = body
        .error_type
        .as_deref()
        .map(|t| t.rsplit('#').next().unwrap_or(t).to_string())
        .unwrap_or_else(|| status.to_string());
    let message = body.message.unwrap_or_default();

    match code.as_str() {
        "InvalidSequenceTokenException" => ApiError::InvalidSequenceToken {
            expected: body.expected_sequence_token,
            message,
        },
        "DataAlreadyAcceptedException" => ApiError::DataAlreadyAccepted {
            expected: body.expected_sequence_token,
        },
        "ResourceAlreadyExistsException" => ApiError::ResourceAlreadyExists(message),
        "ResourceNotFoundException" => ApiError::ResourceNotFound(message),
        _ if status.is_server_error() || TRANSIENT_ERRORS.contains(&code.as_str()) => {
            ApiError::Transport(format!("{code}: {message}"))
        }
        _ => ApiError::Service { code, message },
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogGroupsResponse {
    #[serde(default)]
    log_groups: Vec<LogGroup>,
    #[serde(default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsResponse {
    #[serde(default)]
    log_streams: Vec<LogStream>,
    #[serde(default)]
    next_token: Option<String>,
}

/// Responses of the create operations carry no fields.
#[derive(Debug, Deserialize)]
struct Empty {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DescribeLogStreamsRequest<'a> {
    log_group_name: &'a str,
    log_stream_name_prefix: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[async_trait]
impl LogsApi for HttpLogsClient {
    async fn describe_log_groups(&self, name_prefix: &str) -> Result<Vec<LogGroup>, ApiError> {
        let mut groups = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let mut payload = json!({ "logGroupNamePrefix": name_prefix });
            if let Some(token) = &next_token {
                payload["nextToken"] = json!(token);
            }
            let page: DescribeLogGroupsResponse = self.call("DescribeLogGroups", &payload).await?;
            groups.extend(page.log_groups);
            match page.next_token {
                Some(token) if next_token.as_ref() != Some(&token) => next_token = Some(token),
                _ => return Ok(groups),
            }
        }
    }

    async fn create_log_group(&self, name: &str) -> Result<(), ApiError> {
        let _: Empty = self
            .call("CreateLogGroup", &json!({ "logGroupName": name }))
            .await?;
        Ok(())
    }

    async fn describe_log_streams(
        &self,
        group: &str,
        name_prefix: &str,
    ) -> Result<Vec<LogStream>, ApiError> {
        let mut streams = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let request = DescribeLogStreamsRequest {
                log_group_name: group,
                log_stream_name_prefix: name_prefix,
                next_token: next_token.as_deref(),
            };
            let payload =
                serde_json::to_value(&request).map_err(|e| ApiError::Decode(e.to_string()))?;
            let page: DescribeLogStreamsResponse =
                self.call("DescribeLogStreams", &payload).await?;
            streams.extend(page.log_streams);
            match page.next_token {
                Some(token) if next_token.as_ref() != Some(&token) => next_token = Some(token),
                _ => return Ok(streams),
            }
        }
    }

    async fn create_log_stream(&self, group: &str, name: &str) -> Result<(), ApiError> {
        let _: Empty = self
            .call(
                "CreateLogStream",
                &json!({ "logGroupName": group, "logStreamName": name }),
            )
            .await?;
        Ok(())
    }

    async fn put_log_events(
        &self,
        request: &PutLogEventsRequest,
    ) -> Result<PutLogEventsResponse, ApiError> {
        let payload =
            serde_json::to_value(request).map_err(|e| ApiError::Decode(e.to_string()))?;
        self.call("PutLogEvents", &payload).await
    }
}
