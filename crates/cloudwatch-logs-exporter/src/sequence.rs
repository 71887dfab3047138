// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Upload sequence token tracking for one destination stream.
//!
//! Any successful append, by any writer, invalidates the current token. The
//! tracker therefore re-reads it from the service at the start of every
//! export cycle; the value kept in between is only advisory.

use tracing::debug;

use crate::api::LogsApi;
use crate::error::ProvisionError;
use crate::provisioner::ResourceProvisioner;

#[derive(Debug, Default)]
pub struct SequenceTracker {
    token: Option<String>,
}

impl SequenceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-reads the stream's token, creating the stream if it is missing.
    ///
    /// A brand-new stream, or one never written to, has no token.
    pub async fn refresh<A: LogsApi + ?Sized>(
        &mut self,
        provisioner: &ResourceProvisioner<A>,
        group: &str,
        stream: &str,
    ) -> Result<Option<String>, ProvisionError> {
        self.token = None;
        let existing = provisioner.ensure_log_stream_metadata(group, stream).await?;
        self.token = existing.and_then(|s| s.upload_sequence_token);
        debug!(
            "CLOUDWATCH | Refreshed sequence token for {group}/{stream}: {:?}",
            self.token
        );
        Ok(self.token.clone())
    }

    /// Records the token returned by a successful append.
    pub fn update(&mut self, next_token: Option<String>) {
        self.token = next_token;
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}
