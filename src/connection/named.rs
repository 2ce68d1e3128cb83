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

use async_process::Command;
use tracing::debug;

use super::ResolveError;

/// Look up the URI of a connection registered with
/// `podman system connection add`.
pub async fn connection_uri(name: &str) -> Result<String, ResolveError> {
    debug!("listing podman system connections to resolve '{}'", name);

    let output = Command::new("podman")
        .args([
            "system",
            "connection",
            "list",
            "--format",
            "{{.Name}} {{.URI}}",
        ])
        .output()
        .await
        .map_err(|err| ResolveError::ListConnections {
            message: err.to_string(),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            output.status.to_string()
        } else {
            stderr.trim().to_string()
        };
        return Err(ResolveError::ListConnections { message });
    }

    lookup(&String::from_utf8_lossy(&output.stdout), name)
}

/// Find `name` in the space-separated `name uri` listing. Only the first
/// space separates the fields; the URI keeps any further spaces.
fn lookup(listing: &str, name: &str) -> Result<String, ResolveError> {
    for line in listing.lines() {
        if let Some((candidate, uri)) = line.trim().split_once(' ') {
            if candidate == name {
                return Ok(uri.to_string());
            }
        }
    }

    Err(ResolveError::ConnectionNotFound {
        name: name.to_string(),
    })
}
