// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log stream name resolution from the EC2 instance metadata service.

use std::time::Duration;
use tracing::debug;

use crate::config::ExporterConfig;
use crate::error::ConfigError;

pub const DEFAULT_METADATA_ENDPOINT: &str = "http://169.254.169.254";

const TOKEN_PATH: &str = "/latest/api/token";
const INSTANCE_ID_PATH: &str = "/latest/meta-data/instance-id";
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";
const TOKEN_TTL_SECS: &str = "21600";
const METADATA_TIMEOUT: Duration = Duration::from_secs(2);

/// Returns the configured stream name, or the instance id when none is set.
pub async fn resolve_log_stream(
    config: &ExporterConfig,
    client: &reqwest::Client,
) -> Result<String, ConfigError> {
    if let Some(stream) = &config.log_stream {
        return Ok(stream.clone());
    }
    let instance_id = fetch_instance_id(client, &config.metadata_endpoint).await?;
    debug!("CLOUDWATCH | Using instance id {instance_id} as log stream name");
    Ok(instance_id)
}

/// Fetches the instance id, with an IMDSv2 session token when the service
/// hands one out and a plain IMDSv1 request otherwise.
pub async fn fetch_instance_id(
    client: &reqwest::Client,
    endpoint: &str,
) -> Result<String, ConfigError> {
    let endpoint = endpoint.trim_end_matches('/');
    let token = fetch_session_token(client, endpoint).await;

    let mut request = client
        .get(format!("{endpoint}{INSTANCE_ID_PATH}"))
        .timeout(METADATA_TIMEOUT);
    if let Some(token) = &token {
        request = request.header(TOKEN_HEADER, token);
    }

    let response = request
        .send()
        .await
        .map_err(|e| ConfigError::UnresolvableLogStream(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ConfigError::UnresolvableLogStream(format!(
            "instance metadata returned {status}"
        )));
    }

    let instance_id = response
        .text()
        .await
        .map_err(|e| ConfigError::UnresolvableLogStream(e.to_string()))?;
    let instance_id = instance_id.trim();
    if instance_id.is_empty() {
        return Err(ConfigError::UnresolvableLogStream(
            "instance metadata returned an empty instance id".to_string(),
        ));
    }
    Ok(instance_id.to_string())
}

async fn fetch_session_token(client: &reqwest::Client, endpoint: &str) -> Option<String> {
    let response = client
        .put(format!("{endpoint}{TOKEN_PATH}"))
        .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECS)
        .timeout(METADATA_TIMEOUT)
        .send()
        .await;

    match response {
        Ok(resp) if resp.status().is_success() => resp.text().await.ok(),
        Ok(resp) => {
            debug!(
                "CLOUDWATCH | No IMDSv2 token ({}), falling back to IMDSv1",
                resp.status()
            );
            None
        }
        Err(e) => {
            debug!("CLOUDWATCH | No IMDSv2 token ({e}), falling back to IMDSv1");
            None
        }
    }
}
