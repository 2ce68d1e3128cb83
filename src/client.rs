// This file is part of the terraform-provider-podman project
//
// Copyright (C) ANEO, 2024-2024. All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License")
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::time::Duration;

use podman_api::Podman;
use thiserror::Error;
use tracing::debug;

const PING_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The runtime client rejected the connection URI.
    #[error("failed to create podman client: {message}")]
    Connect { message: String },

    /// The endpoint did not answer the ping.
    #[error("podman endpoint '{uri}' did not respond: {message}")]
    Ping { uri: String, message: String },

    /// The endpoint did not answer the ping in time.
    #[error("ping to podman endpoint '{uri}' timed out after {seconds}s")]
    PingTimeout { uri: String, seconds: u64 },
}

/// Handle on the Podman service a configured provider talks to.
#[derive(Debug, Clone)]
pub struct PodmanClient {
    podman: Podman,
    uri: String,
}

impl PodmanClient {
    /// Create a client for the given connection URI without contacting
    /// the endpoint.
    pub fn connect(uri: &str) -> Result<Self, ClientError> {
        let podman = Podman::new(uri).map_err(|err| ClientError::Connect {
            message: err.to_string(),
        })?;

        Ok(Self {
            podman,
            uri: uri.to_string(),
        })
    }

    /// Ping the endpoint to check the service answers.
    pub async fn verify(&self) -> Result<(), ClientError> {
        let timeout = Duration::from_secs(PING_TIMEOUT_SECS);

        tokio::time::timeout(timeout, self.podman.ping())
            .await
            .map_err(|_| ClientError::PingTimeout {
                uri: self.uri.clone(),
                seconds: PING_TIMEOUT_SECS,
            })?
            .map_err(|err| ClientError::Ping {
                uri: self.uri.clone(),
                message: err.to_string(),
            })?;

        Ok(())
    }

    /// Create a client and check the endpoint answers.
    pub async fn connect_and_verify(uri: &str) -> Result<Self, ClientError> {
        let client = Self::connect(uri)?;
        client.verify().await?;
        debug!("connected to podman endpoint {}", uri);
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_accepts_a_unix_uri() {
        assert!(PodmanClient::connect("unix:///run/podman/podman.sock").is_ok());
    }

    #[test]
    fn connect_accepts_a_tcp_uri() {
        assert!(PodmanClient::connect("tcp://127.0.0.1:8080").is_ok());
    }

    #[tokio::test]
    async fn verify_fails_for_a_missing_socket() {
        let client = PodmanClient::connect("unix:///nonexistent/podman.sock").unwrap();
        assert!(matches!(
            client.verify().await,
            Err(ClientError::Ping { .. } | ClientError::PingTimeout { .. })
        ));
    }
}
