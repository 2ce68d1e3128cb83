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

use std::env;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType};
use tf_provider::value::{Value, ValueString};
use tf_provider::{
    map, AttributePath, Block, Description, Diagnostics, Provider, Schema, ValueEmpty,
};

use crate::client::{ClientError, PodmanClient};
use crate::connection::{ConnectionMode, ConnectionSettings, ResolveError};

#[derive(Debug, Default, Clone)]
pub struct PodmanProvider {
    client: Arc<RwLock<Option<PodmanClient>>>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PodmanProviderConfig<'a> {
    pub connection: ValueString<'a>,
    pub identity: ValueString<'a>,
    pub host: ValueString<'a>,
    pub username: ValueString<'a>,
    pub uri: ValueString<'a>,
    pub socket_path: ValueString<'a>,
}

impl From<&PodmanProviderConfig<'_>> for ConnectionSettings {
    fn from(config: &PodmanProviderConfig<'_>) -> Self {
        Self {
            connection: value_or_env(&config.connection, "PODMAN_CONNECTION"),
            identity: value_or_env(&config.identity, "PODMAN_IDENTITY"),
            host: value_or_env(&config.host, "PODMAN_HOST"),
            username: value_or_env(&config.username, "PODMAN_USERNAME"),
            uri: value_or_env(&config.uri, "PODMAN_URI"),
            socket_path: value_or_env(&config.socket_path, "PODMAN_SOCKET_PATH"),
        }
    }
}

/// Environment values apply only when the attribute is unset.
fn value_or_env(value: &ValueString<'_>, var: &str) -> String {
    match value {
        Value::Value(value) => value.to_string(),
        _ => env::var(var).unwrap_or_default(),
    }
}

fn check_known(diags: &mut Diagnostics, config: &PodmanProviderConfig<'_>) -> bool {
    let fields = [
        ("connection", "Unknown Connection", "connection", &config.connection),
        ("identity", "Unknown Identity", "identity", &config.identity),
        ("host", "Unknown Host", "host", &config.host),
        ("username", "Unknown Username", "username", &config.username),
        ("uri", "Unknown URI", "URI", &config.uri),
        ("socket_path", "Unknown Socket Path", "socket path", &config.socket_path),
    ];

    let mut known = true;
    for (attr, summary, noun, value) in fields {
        if value.is_unknown() {
            diags.error(
                summary,
                format!(
                    "The provider cannot determine the {noun} to use. Please specify a valid {noun}."
                ),
                AttributePath::new(attr),
            );
            known = false;
        }
    }
    known
}

fn resolve_failure(settings: &ConnectionSettings, err: &ResolveError) -> (String, String) {
    match err {
        ResolveError::ListConnections { .. } | ResolveError::ConnectionNotFound { .. } => (
            "Unable to Resolve Named Connection".to_string(),
            format!(
                "Failed to resolve connection '{}': {err}",
                settings.connection
            ),
        ),
        ResolveError::MissingIdentity => (
            "Missing SSH Identity for Remote Connection".to_string(),
            "When using host and username for remote connection, an SSH identity (private key) \
             must be provided."
                .to_string(),
        ),
    }
}

fn connect_failure(
    settings: &ConnectionSettings,
    resolved: &str,
    err: &ClientError,
) -> (String, String) {
    match settings.mode() {
        ConnectionMode::Uri(uri) => (
            "Unable to Create Podman Connection from URI".to_string(),
            format!("Failed to connect using URI '{uri}': {err}"),
        ),
        ConnectionMode::Named(name) => (
            "Unable to Create Podman Connection".to_string(),
            format!("Failed to connect using named connection '{name}': {err}"),
        ),
        ConnectionMode::Remote { host, username, .. } => (
            "Unable to Create Remote Podman Connection".to_string(),
            format!("Failed to connect to {username}@{host}: {err}"),
        ),
        ConnectionMode::Local { .. } => {
            let socket_path = resolved.strip_prefix("unix://").unwrap_or(resolved);
            (
                "Unable to Create Local Podman Connection".to_string(),
                format!("Failed to connect to local socket '{socket_path}': {err}"),
            )
        }
    }
}

#[async_trait]
impl Provider for PodmanProvider {
    type Config<'a> = Value<PodmanProviderConfig<'a>>;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(Schema {
            version: 1,
            block: Block {
                description: Description::plain("podman"),
                attributes: map! {
                    "connection" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain(
                            "Name of the Podman connection to use. If not specified, uses the default connection or local socket.",
                        ),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "identity" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain(
                            "Path to SSH private key file for remote connections (e.g., ~/.ssh/id_ed25519).",
                        ),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "host" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain(
                            "Remote host for SSH connection (e.g., 192.168.122.1). Used when creating ad-hoc connections.",
                        ),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "username" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain(
                            "Username for SSH connection to remote Podman host.",
                        ),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "uri" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain(
                            "Full URI for Podman connection (e.g., ssh://user@host/run/user/1000/podman/podman.sock).",
                        ),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                    "socket_path" => Attribute {
                        attr_type: AttributeType::String,
                        description: Description::plain(
                            "Path to Podman socket. Defaults to /run/user/${UID}/podman/podman.sock for rootless or /run/podman/podman.sock for root.",
                        ),
                        constraint: AttributeConstraint::Optional,
                        ..Default::default()
                    },
                },
                ..Default::default()
            },
        })
    }

    async fn validate<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::Config<'a>,
    ) -> Option<()> {
        let config_default = PodmanProviderConfig::default();
        let config = config.as_ref().unwrap_or(&config_default);

        check_known(diags, config);

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        _terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        let config_default = PodmanProviderConfig::default();
        let config = config.as_ref().unwrap_or(&config_default);

        if !check_known(diags, config) {
            return None;
        }

        let settings = ConnectionSettings::from(config);

        let uri = match settings.resolve().await {
            Ok(uri) => uri,
            Err(err) => {
                let (summary, detail) = resolve_failure(&settings, &err);
                diags.error(summary, detail, AttributePath::default());
                return None;
            }
        };

        debug!("resolved podman endpoint {}", uri);

        let client = match PodmanClient::connect_and_verify(&uri).await {
            Ok(client) => client,
            Err(err) => {
                let (summary, detail) = connect_failure(&settings, &uri, &err);
                diags.error(summary, detail, AttributePath::default());
                return None;
            }
        };

        if self.client.read().await.is_some() {
            debug!("replacing a previously configured podman client");
        }
        *self.client.write().await = Some(client);

        Some(())
    }

    fn get_resources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<std::collections::HashMap<String, Box<dyn tf_provider::resource::DynamicResource>>>
    {
        Some(map! {})
    }

    fn get_data_sources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<
        std::collections::HashMap<String, Box<dyn tf_provider::data_source::DynamicDataSource>>,
    > {
        Some(map! {})
    }
}
