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

//! Peering connections between an Atlas network container and a VPC/VNet
//! of the user's own cloud account.

use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeConstraint, AttributeType};
use tf_provider::value::ValueString;
use tf_provider::Schema;

use crate::client::models::{Container, Peer};
use crate::client::{ApiError, AtlasClient};
use crate::regions::{container_region_to_peering, peering_region};
use crate::utils::{attribute, opt_string, schema, string, ValueExt, WithSchema};

mod data_source;
mod resource;

pub use data_source::NetworkPeeringDataSource;
pub use resource::NetworkPeeringResource;

pub const PROVIDERS: &[&str] = &["AWS", "AZURE", "GCP"];

/// Attributes a peering request needs for each provider
fn required_fields(provider_name: &str) -> &'static [&'static str] {
    match provider_name {
        "AWS" => &[
            "accepter_region_name",
            "aws_account_id",
            "route_table_cidr_block",
            "vpc_id",
        ],
        "AZURE" => &[
            "azure_directory_id",
            "azure_subscription_id",
            "resource_group_name",
            "vnet_name",
        ],
        "GCP" => &["gcp_project_id", "network_name"],
        _ => &[],
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkPeeringState<'a> {
    pub id: ValueString<'a>,
    pub project_id: ValueString<'a>,
    pub container_id: ValueString<'a>,
    pub provider_name: ValueString<'a>,
    pub accepter_region_name: ValueString<'a>,
    pub aws_account_id: ValueString<'a>,
    pub route_table_cidr_block: ValueString<'a>,
    pub vpc_id: ValueString<'a>,
    pub azure_directory_id: ValueString<'a>,
    pub azure_subscription_id: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub vnet_name: ValueString<'a>,
    pub gcp_project_id: ValueString<'a>,
    pub network_name: ValueString<'a>,
    pub atlas_cidr_block: ValueString<'a>,
    pub peer_id: ValueString<'a>,
    pub connection_id: ValueString<'a>,
    pub error_state_name: ValueString<'a>,
    pub atlas_id: ValueString<'a>,
    pub status_name: ValueString<'a>,
    pub error_state: ValueString<'a>,
    pub status: ValueString<'a>,
    pub error_message: ValueString<'a>,
    pub atlas_gcp_project_id: ValueString<'a>,
    pub atlas_vpc_name: ValueString<'a>,
}

impl<'a> NetworkPeeringState<'a> {
    fn field(&self, name: &str) -> Option<&ValueString<'a>> {
        Some(match name {
            "accepter_region_name" => &self.accepter_region_name,
            "aws_account_id" => &self.aws_account_id,
            "route_table_cidr_block" => &self.route_table_cidr_block,
            "vpc_id" => &self.vpc_id,
            "azure_directory_id" => &self.azure_directory_id,
            "azure_subscription_id" => &self.azure_subscription_id,
            "resource_group_name" => &self.resource_group_name,
            "vnet_name" => &self.vnet_name,
            "gcp_project_id" => &self.gcp_project_id,
            "network_name" => &self.network_name,
            _ => return None,
        })
    }

    /// Provider attributes that are neither configured nor still to be computed
    fn missing_fields(&self, provider_name: &str) -> Vec<&'static str> {
        required_fields(provider_name)
            .iter()
            .copied()
            .filter(|name| !self.field(name).is_some_and(|value| value.is_set()))
            .collect()
    }

    /// Computed attributes that follow the lifecycle of the connection
    fn status_mut(&mut self) -> [&mut ValueString<'a>; 6] {
        [
            &mut self.connection_id,
            &mut self.error_state_name,
            &mut self.status_name,
            &mut self.error_state,
            &mut self.status,
            &mut self.error_message,
        ]
    }

    /// Overwrites every remote attribute with the value Atlas reports
    fn apply(&mut self, peer: Peer, container: Option<Container>) {
        if let Some(provider_name) = peer.provider_name.filter(|p| !p.is_empty()) {
            self.provider_name = string(provider_name);
        }
        if self.container_id.is_null() {
            self.container_id = opt_string(peer.container_id);
        }

        // Atlas omits the accepter region when it is the region of the container
        let accepter = peer
            .accepter_region_name
            .filter(|region| !region.is_empty())
            .or_else(|| {
                container
                    .as_ref()
                    .and_then(|c| c.region_name.as_deref())
                    .map(container_region_to_peering)
            });
        self.accepter_region_name = match (&accepter, self.accepter_region_name.as_known_str()) {
            (Some(remote), Some(configured))
                if peering_region(configured).as_deref() == Some(remote.as_str()) =>
            {
                self.accepter_region_name.clone()
            }
            _ => opt_string(accepter),
        };

        self.aws_account_id = opt_string(peer.aws_account_id);
        self.route_table_cidr_block = opt_string(peer.route_table_cidr_block);
        self.vpc_id = opt_string(peer.vpc_id);
        self.azure_directory_id = opt_string(peer.azure_directory_id);
        self.azure_subscription_id = opt_string(peer.azure_subscription_id);
        self.resource_group_name = opt_string(peer.resource_group_name);
        self.vnet_name = opt_string(peer.vnet_name);
        self.gcp_project_id = opt_string(peer.gcp_project_id);
        self.network_name = opt_string(peer.network_name);
        if peer.atlas_cidr_block.is_some() || self.atlas_cidr_block.is_unknown() {
            self.atlas_cidr_block = opt_string(peer.atlas_cidr_block);
        }

        self.peer_id = opt_string(peer.id.clone());
        self.atlas_id = opt_string(peer.id);
        self.connection_id = opt_string(peer.connection_id);
        self.error_state_name = opt_string(peer.error_state_name);
        self.status_name = opt_string(peer.status_name);
        self.error_state = opt_string(peer.error_state);
        self.status = opt_string(peer.status);
        self.error_message = opt_string(peer.error_message);

        let (gcp_project_id, vpc_name) = match container {
            Some(container) if self.provider_name.as_known_str() == Some("GCP") => {
                (container.gcp_project_id, container.network_name)
            }
            _ => (None, None),
        };
        self.atlas_gcp_project_id = opt_string(gcp_project_id);
        self.atlas_vpc_name = opt_string(vpc_name);
    }
}

/// Fetches a peer along with the container details its state is built from
async fn fetch(
    client: &AtlasClient,
    project_id: &str,
    peer_id: &str,
    provider_name: &str,
) -> Result<(Peer, Option<Container>), ApiError> {
    let peer = client.get_peer(project_id, peer_id).await?;
    let container = peer_container(client, project_id, &peer, provider_name).await?;
    Ok((peer, container))
}

/// The container is needed for GCP peers, and for AWS peers whose accepter
/// region Atlas left out
async fn peer_container(
    client: &AtlasClient,
    project_id: &str,
    peer: &Peer,
    provider_name: &str,
) -> Result<Option<Container>, ApiError> {
    let needs_container = match provider_name {
        "GCP" => true,
        "AWS" => peer
            .accepter_region_name
            .as_deref()
            .map_or(true, str::is_empty),
        _ => false,
    };
    match (needs_container, peer.container_id.as_deref()) {
        (true, Some(container_id)) => Ok(Some(client.get_container(project_id, container_id).await?)),
        _ => Ok(None),
    }
}

impl<'a> WithSchema for NetworkPeeringState<'a> {
    fn schema() -> Schema {
        let required = |description| {
            attribute(AttributeType::String, AttributeConstraint::Required, description)
        };
        let optional = |description| {
            attribute(
                AttributeType::String,
                AttributeConstraint::OptionalComputed,
                description,
            )
        };
        let computed = |description| {
            attribute(AttributeType::String, AttributeConstraint::Computed, description)
        };
        schema(
            "Network peering connection between an Atlas container and a cloud provider network",
            [
                ("id", computed("Composite identifier of the peering connection")),
                ("project_id", required("Project the peering belongs to")),
                (
                    "container_id",
                    required("Atlas network container, or the id of a network container resource"),
                ),
                ("provider_name", required("Cloud provider of the peering: AWS, AZURE or GCP")),
                ("accepter_region_name", optional("AWS region of the peer VPC")),
                ("aws_account_id", optional("AWS account owning the peer VPC")),
                ("route_table_cidr_block", optional("CIDR block of the peer VPC")),
                ("vpc_id", optional("Identifier of the peer VPC")),
                ("azure_directory_id", optional("Azure AD directory of the peer VNet")),
                ("azure_subscription_id", optional("Azure subscription of the peer VNet")),
                ("resource_group_name", optional("Azure resource group of the peer VNet")),
                ("vnet_name", optional("Name of the peer VNet")),
                ("gcp_project_id", optional("GCP project of the peer network")),
                ("network_name", optional("Name of the peer GCP network")),
                ("atlas_cidr_block", optional("CIDR block of the Atlas side")),
                ("peer_id", computed("Atlas identifier of the peering connection")),
                ("connection_id", computed("AWS peering connection identifier")),
                ("error_state_name", computed("Error state of an AWS peering")),
                ("atlas_id", computed("Atlas identifier of the peering connection")),
                ("status_name", computed("Status of an AWS peering")),
                ("error_state", computed("Error state of an Azure or GCP peering")),
                ("status", computed("Status of an Azure or GCP peering")),
                ("error_message", computed("Error reported by Atlas")),
                ("atlas_gcp_project_id", computed("GCP project hosting the Atlas side")),
                ("atlas_vpc_name", computed("Name of the Atlas side GCP network")),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use tf_provider::value::Value;

    use super::*;

    #[test]
    fn missing_fields_per_provider() {
        let state = NetworkPeeringState {
            accepter_region_name: string("us-east-1"),
            aws_account_id: string("123456789012"),
            vpc_id: Value::Unknown,
            route_table_cidr_block: string(""),
            ..Default::default()
        };
        assert_eq!(state.missing_fields("AWS"), ["route_table_cidr_block"]);
        assert_eq!(state.missing_fields("GCP"), ["gcp_project_id", "network_name"]);
        assert!(state.missing_fields("OTHER").is_empty());
    }

    #[test]
    fn accepter_region_from_container() {
        let mut state = NetworkPeeringState {
            provider_name: string("AWS"),
            ..Default::default()
        };
        state.apply(
            Peer {
                id: Some("peer-1".into()),
                status_name: Some("AVAILABLE".into()),
                ..Default::default()
            },
            Some(Container {
                region_name: Some("EU_WEST_1".into()),
                ..Default::default()
            }),
        );
        assert_eq!(state.accepter_region_name, string("eu-west-1"));
        assert_eq!(state.peer_id, string("peer-1"));
        assert_eq!(state.atlas_id, string("peer-1"));
        assert!(state.atlas_gcp_project_id.is_null());
    }

    #[test]
    fn gcp_peering_exposes_atlas_network() {
        let mut state = NetworkPeeringState {
            provider_name: string("GCP"),
            ..Default::default()
        };
        state.apply(
            Peer {
                id: Some("peer-1".into()),
                container_id: Some("c1".into()),
                status: Some("WAITING_FOR_USER".into()),
                ..Default::default()
            },
            Some(Container {
                gcp_project_id: Some("atlas-gcp".into()),
                network_name: Some("nt-atlas".into()),
                ..Default::default()
            }),
        );
        assert_eq!(state.container_id, string("c1"));
        assert_eq!(state.atlas_gcp_project_id, string("atlas-gcp"));
        assert_eq!(state.atlas_vpc_name, string("nt-atlas"));
        assert_eq!(state.status, string("WAITING_FOR_USER"));
    }
}
