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

use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeConstraint, AttributeType};
use tf_provider::value::{ValueBool, ValueList, ValueString};
use tf_provider::Schema;

use crate::client::models::Container;
use crate::regions::atlas_region;
use crate::utils::{
    attribute, opt_bool, opt_string, schema, string_list, string_list_type, ValueExt, WithSchema,
};

mod data_source;
mod resource;

pub use data_source::NetworkContainerDataSource;
pub use resource::NetworkContainerResource;

pub const PROVIDERS: &[&str] = &["AWS", "AZURE", "GCP"];
pub const DEFAULT_PROVIDER: &str = "AWS";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkContainerState<'a> {
    pub id: ValueString<'a>,
    pub project_id: ValueString<'a>,
    pub atlas_cidr_block: ValueString<'a>,
    pub provider_name: ValueString<'a>,
    pub region_name: ValueString<'a>,
    pub region: ValueString<'a>,
    pub regions: ValueList<ValueString<'a>>,
    pub container_id: ValueString<'a>,
    pub azure_subscription_id: ValueString<'a>,
    pub provisioned: ValueBool,
    pub gcp_project_id: ValueString<'a>,
    pub network_name: ValueString<'a>,
    pub vpc_id: ValueString<'a>,
    pub vnet_name: ValueString<'a>,
}

/// Keeps the configured spelling of a region when it names the same region
fn same_region<'a>(configured: &ValueString<'a>, remote: Option<String>) -> ValueString<'a> {
    match (configured.as_known_str().and_then(atlas_region), &remote) {
        (Some(canonical), Some(remote)) if canonical == remote => configured.clone(),
        _ => opt_string(remote),
    }
}

impl<'a> NetworkContainerState<'a> {
    /// Overwrites every remote attribute with the value Atlas reports
    fn apply(&mut self, container: Container) {
        self.container_id = opt_string(container.id);
        if container.provider_name.is_some() {
            self.provider_name = opt_string(container.provider_name);
        }
        if container.atlas_cidr_block.is_some() {
            self.atlas_cidr_block = opt_string(container.atlas_cidr_block);
        }
        self.region_name = same_region(&self.region_name, container.region_name);
        self.region = same_region(&self.region, container.region);
        self.regions = string_list(container.regions);
        self.azure_subscription_id = opt_string(container.azure_subscription_id);
        self.provisioned = opt_bool(container.provisioned);
        self.gcp_project_id = opt_string(container.gcp_project_id);
        self.network_name = opt_string(container.network_name);
        self.vpc_id = opt_string(container.vpc_id);
        self.vnet_name = opt_string(container.vnet_name);
    }
}

impl<'a> WithSchema for NetworkContainerState<'a> {
    fn schema() -> Schema {
        let computed = |attr_type, description| {
            attribute(attr_type, AttributeConstraint::Computed, description)
        };
        schema(
            "Network container of an Atlas project, the VPC hosting its clusters for one cloud provider",
            [
                ("id", computed(AttributeType::String, "Composite identifier of the container")),
                (
                    "project_id",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::Required,
                        "Project the container belongs to",
                    ),
                ),
                (
                    "atlas_cidr_block",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::Required,
                        "CIDR block Atlas uses for the clusters of the container",
                    ),
                ),
                (
                    "provider_name",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::OptionalComputed,
                        "Cloud provider of the container: AWS (default), AZURE or GCP",
                    ),
                ),
                (
                    "region_name",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::OptionalComputed,
                        "AWS region of the container",
                    ),
                ),
                (
                    "region",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::OptionalComputed,
                        "Azure region of the container",
                    ),
                ),
                (
                    "regions",
                    attribute(
                        string_list_type(),
                        AttributeConstraint::OptionalComputed,
                        "GCP regions of the container",
                    ),
                ),
                (
                    "container_id",
                    computed(AttributeType::String, "Atlas identifier of the container"),
                ),
                (
                    "azure_subscription_id",
                    computed(AttributeType::String, "Azure subscription hosting the container"),
                ),
                (
                    "provisioned",
                    computed(AttributeType::Bool, "Whether a cluster is deployed in the container"),
                ),
                (
                    "gcp_project_id",
                    computed(AttributeType::String, "GCP project hosting the container"),
                ),
                (
                    "network_name",
                    computed(AttributeType::String, "Name of the GCP network"),
                ),
                ("vpc_id", computed(AttributeType::String, "Identifier of the AWS VPC")),
                ("vnet_name", computed(AttributeType::String, "Name of the Azure VNet")),
            ],
        )
    }
}
