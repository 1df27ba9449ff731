// This file is part of the terraform-provider-mongodbatlas project
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

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "MONGODB_ATLAS_LOG";

/// Filter directives from `MONGODB_ATLAS_LOG`, then `RUST_LOG`, then `info`
pub fn filter_directives(env: impl Fn(&str) -> Option<String>) -> String {
    [LOG_ENV, EnvFilter::DEFAULT_ENV]
        .into_iter()
        .filter_map(env)
        .find(|directives| !directives.trim().is_empty())
        .unwrap_or_else(|| "info".to_owned())
}

/// Installs the global subscriber.
///
/// Stdout carries the plugin handshake, so events go to stderr where
/// Terraform picks them up. Returns `false` if a subscriber was already set.
pub fn init() -> bool {
    let directives = filter_directives(|name| std::env::var(name).ok());
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false),
        )
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_variable_first() {
        let env = |name: &str| match name {
            "MONGODB_ATLAS_LOG" => Some("debug".to_owned()),
            "RUST_LOG" => Some("warn".to_owned()),
            _ => None,
        };
        assert_eq!(filter_directives(env), "debug");
    }

    #[test]
    fn rust_log_then_default() {
        let env = |name: &str| (name == "RUST_LOG").then(|| "trace".to_owned());
        assert_eq!(filter_directives(env), "trace");
        assert_eq!(filter_directives(|_| Some(" ".to_owned())), "info");
        assert_eq!(filter_directives(|_| None), "info");
    }
}
