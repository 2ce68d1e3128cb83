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

use nix::unistd::getuid;
use thiserror::Error;

pub mod named;

/// Socket used by a rootful Podman service.
pub const ROOT_SOCKET_PATH: &str = "/run/podman/podman.sock";

/// Socket path assumed on the remote host when none is given.
const REMOTE_SOCKET_PATH: &str = "/run/user/1000/podman/podman.sock";

#[derive(Debug, Error)]
pub enum ResolveError {
    /// `podman system connection list` could not be executed or exited
    /// with a failure.
    #[error("failed to list podman connections: {message}")]
    ListConnections { message: String },

    /// No registered connection matches the requested name.
    #[error("connection '{name}' not found")]
    ConnectionNotFound { name: String },

    /// An ad-hoc remote connection was requested without an SSH identity.
    #[error("missing SSH identity for remote connection")]
    MissingIdentity,
}

/// Connection inputs after merging the provider configuration with the
/// `PODMAN_*` environment fallbacks. An empty string means unset.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub connection: String,
    pub identity: String,
    pub host: String,
    pub username: String,
    pub uri: String,
    pub socket_path: String,
}

/// The connection mode selected by the precedence rules.
#[derive(Debug, PartialEq, Eq)]
pub enum ConnectionMode<'a> {
    /// Use the URI verbatim.
    Uri(&'a str),
    /// Resolve a named connection registered with `podman system connection`.
    Named(&'a str),
    /// Build an ssh URI for an ad-hoc remote connection.
    Remote {
        host: &'a str,
        username: &'a str,
        identity: &'a str,
        socket_path: &'a str,
    },
    /// Connect to a local unix socket.
    Local { socket_path: &'a str },
}

impl ConnectionSettings {
    /// Select the connection mode. Priority: explicit URI, then named
    /// connection, then host+username, then the local socket.
    pub fn mode(&self) -> ConnectionMode<'_> {
        if !self.uri.is_empty() {
            ConnectionMode::Uri(&self.uri)
        } else if !self.connection.is_empty() {
            ConnectionMode::Named(&self.connection)
        } else if !self.host.is_empty() && !self.username.is_empty() {
            ConnectionMode::Remote {
                host: &self.host,
                username: &self.username,
                identity: &self.identity,
                socket_path: &self.socket_path,
            }
        } else {
            ConnectionMode::Local {
                socket_path: &self.socket_path,
            }
        }
    }

    /// Produce the single connection URI for these settings, or fail with
    /// the reason the selected mode cannot be used.
    pub async fn resolve(&self) -> Result<String, ResolveError> {
        match self.mode() {
            ConnectionMode::Uri(uri) => Ok(uri.to_string()),
            ConnectionMode::Named(name) => named::connection_uri(name).await,
            ConnectionMode::Remote {
                host,
                username,
                identity,
                socket_path,
            } => {
                if identity.is_empty() {
                    return Err(ResolveError::MissingIdentity);
                }
                let socket_path = if socket_path.is_empty() {
                    REMOTE_SOCKET_PATH
                } else {
                    socket_path
                };
                Ok(format!("ssh://{username}@{host}{socket_path}"))
            }
            ConnectionMode::Local { socket_path } => {
                let socket_path = if socket_path.is_empty() {
                    default_socket_path(getuid().as_raw())
                } else {
                    socket_path.to_string()
                };
                Ok(format!("unix://{socket_path}"))
            }
        }
    }
}

/// Default socket path for the given user: the system socket for root,
/// the per-user runtime socket otherwise.
pub fn default_socket_path(uid: u32) -> String {
    if uid == 0 {
        ROOT_SOCKET_PATH.to_string()
    } else {
        format!("/run/user/{uid}/podman/podman.sock")
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn settings(
        uri: &str,
        connection: &str,
        host: &str,
        username: &str,
        identity: &str,
        socket_path: &str,
    ) -> ConnectionSettings {
        ConnectionSettings {
            connection: connection.to_string(),
            identity: identity.to_string(),
            host: host.to_string(),
            username: username.to_string(),
            uri: uri.to_string(),
            socket_path: socket_path.to_string(),
        }
    }

    #[test]
    fn uri_takes_precedence_over_all_other_modes() {
        let settings = settings(
            "tcp://127.0.0.1:8080",
            "staging",
            "192.168.1.5",
            "alice",
            "/key",
            "/tmp/podman.sock",
        );
        assert_eq!(settings.mode(), ConnectionMode::Uri("tcp://127.0.0.1:8080"));
    }

    #[test]
    fn named_connection_takes_precedence_over_remote_and_local() {
        let settings = settings("", "staging", "192.168.1.5", "alice", "/key", "/tmp/podman.sock");
        assert_eq!(settings.mode(), ConnectionMode::Named("staging"));
    }

    #[test]
    fn host_and_username_select_the_remote_mode() {
        let settings = settings("", "", "192.168.1.5", "alice", "/key", "");
        assert_eq!(
            settings.mode(),
            ConnectionMode::Remote {
                host: "192.168.1.5",
                username: "alice",
                identity: "/key",
                socket_path: "",
            }
        );
    }

    #[test]
    fn host_without_username_falls_back_to_local() {
        let settings = settings("", "", "192.168.1.5", "", "", "/tmp/podman.sock");
        assert_eq!(
            settings.mode(),
            ConnectionMode::Local {
                socket_path: "/tmp/podman.sock",
            }
        );
    }

    #[test]
    fn empty_settings_select_the_local_mode() {
        assert_eq!(
            ConnectionSettings::default().mode(),
            ConnectionMode::Local { socket_path: "" }
        );
    }

    #[tokio::test]
    async fn explicit_uri_resolves_verbatim() {
        let settings = settings("unix:///tmp/podman.sock", "", "", "", "", "");
        assert_eq!(settings.resolve().await.unwrap(), "unix:///tmp/podman.sock");
    }

    #[tokio::test]
    async fn remote_connection_builds_an_ssh_uri() {
        let settings = settings("", "", "192.168.1.5", "alice", "/key", "");
        assert_eq!(
            settings.resolve().await.unwrap(),
            "ssh://alice@192.168.1.5/run/user/1000/podman/podman.sock"
        );
    }

    #[tokio::test]
    async fn remote_connection_honors_an_explicit_socket_path() {
        let settings = settings(
            "",
            "",
            "192.168.1.5",
            "alice",
            "/key",
            "/run/user/42/podman/podman.sock",
        );
        assert_eq!(
            settings.resolve().await.unwrap(),
            "ssh://alice@192.168.1.5/run/user/42/podman/podman.sock"
        );
    }

    #[tokio::test]
    async fn remote_connection_requires_an_identity() {
        let settings = settings("", "", "192.168.1.5", "alice", "", "");
        assert!(matches!(
            settings.resolve().await,
            Err(ResolveError::MissingIdentity)
        ));
    }

    #[tokio::test]
    async fn local_connection_uses_the_explicit_socket_path() {
        let settings = settings("", "", "", "", "", "/tmp/podman.sock");
        assert_eq!(settings.resolve().await.unwrap(), "unix:///tmp/podman.sock");
    }

    #[tokio::test]
    async fn local_connection_defaults_to_the_uid_socket() {
        let expected = format!("unix://{}", default_socket_path(getuid().as_raw()));
        assert_eq!(
            ConnectionSettings::default().resolve().await.unwrap(),
            expected
        );
    }

    #[rstest]
    #[case(0, "/run/podman/podman.sock")]
    #[case(1000, "/run/user/1000/podman/podman.sock")]
    #[case(1001, "/run/user/1001/podman/podman.sock")]
    fn default_socket_path_depends_on_the_uid(#[case] uid: u32, #[case] expected: &str) {
        assert_eq!(default_socket_path(uid), expected);
    }
}
