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

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::podman_provider::PodmanProvider;

mod client;
mod connection;
mod podman_provider;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the plugin handshake, so logs must go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tf_provider::serve("podman", PodmanProvider::default()).await
}
