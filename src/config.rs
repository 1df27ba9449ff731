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

//! Provider block and client settings.
//!
//! Each setting is taken from the provider block when set there, then from
//! the environment, then from its default.

use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeConstraint, AttributeType};
use tf_provider::value::{ValueBool, ValueString};
use tf_provider::{Diagnostics, Schema};

use crate::utils::{attribute, known_bool, schema, sensitive_attribute, ValueExt, WithSchema};

pub const DEFAULT_BASE_URL: &str = "https://cloud.mongodb.com/";
pub const GOV_BASE_URL: &str = "https://cloud.mongodbgov.com";

const PUBLIC_KEY_VARS: &[&str] = &["MONGODB_ATLAS_PUBLIC_KEY", "MCLI_PUBLIC_API_KEY"];
const PRIVATE_KEY_VARS: &[&str] = &["MONGODB_ATLAS_PRIVATE_KEY", "MCLI_PRIVATE_API_KEY"];
const BASE_URL_VARS: &[&str] = &["MONGODB_ATLAS_BASE_URL", "MCLI_OPS_MANAGER_URL"];

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig<'a> {
    pub public_key: ValueString<'a>,
    pub private_key: ValueString<'a>,
    pub base_url: ValueString<'a>,
    pub is_mongodbgov_cloud: ValueBool,
}

impl<'a> WithSchema for ProviderConfig<'a> {
    fn schema() -> Schema {
        schema(
            "MongoDB Atlas",
            [
                (
                    "public_key",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::Optional,
                        "MongoDB Atlas Programmatic Public Key",
                    ),
                ),
                (
                    "private_key",
                    sensitive_attribute(
                        AttributeType::String,
                        AttributeConstraint::Optional,
                        "MongoDB Atlas Programmatic Private Key",
                    ),
                ),
                (
                    "base_url",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::Optional,
                        "MongoDB Atlas Base URL",
                    ),
                ),
                (
                    "is_mongodbgov_cloud",
                    attribute(
                        AttributeType::Bool,
                        AttributeConstraint::Optional,
                        "MongoDB Atlas Base URL default to gov",
                    ),
                ),
            ],
        )
    }
}

/// Settings the HTTP transport is built from
#[derive(Default, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub public_key: String,
    pub private_key: String,
    pub base_url: String,
    pub user_agent: String,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    pub fn resolve(
        diags: &mut Diagnostics,
        config: &ProviderConfig<'_>,
        terraform_version: &str,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let lookup = |value: &ValueString<'_>, vars: &[&str]| -> Option<String> {
            value.as_known_str().map(str::to_owned).or_else(|| {
                vars.iter()
                    .filter_map(|var| env(var))
                    .find(|value| !value.is_empty())
            })
        };

        let public_key = lookup(&config.public_key, PUBLIC_KEY_VARS).unwrap_or_default();
        let private_key = lookup(&config.private_key, PRIVATE_KEY_VARS).unwrap_or_default();
        let base_url = lookup(&config.base_url, BASE_URL_VARS).unwrap_or_else(|| {
            if known_bool(&config.is_mongodbgov_cloud) == Some(true) {
                GOV_BASE_URL.to_owned()
            } else {
                DEFAULT_BASE_URL.to_owned()
            }
        });

        if public_key.is_empty() || private_key.is_empty() {
            diags.root_warning(
                "Missing MongoDB Atlas credentials",
                "Set `public_key` and `private_key` in the provider block, or the MONGODB_ATLAS_PUBLIC_KEY and MONGODB_ATLAS_PRIVATE_KEY environment variables. Requests will be sent unauthenticated.",
            );
        }

        Self {
            public_key,
            private_key,
            base_url,
            user_agent: format!(
                "terraform-provider-mongodbatlas/{} terraform/{terraform_version}",
                env!("CARGO_PKG_VERSION")
            ),
        }
    }
}
