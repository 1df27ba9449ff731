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

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeConstraint, AttributeType};
use tf_provider::value::ValueString;
use tf_provider::{DataSource, Diagnostics, Schema, ValueEmpty};

use crate::client::ClientHandle;
use crate::utils::{attribute, report, schema, string, ValueExt, WithSchema};

use super::{peer_container, NetworkPeeringState};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkPeeringDataSourceState<'a> {
    pub project_id: ValueString<'a>,
    pub peering_id: ValueString<'a>,
    pub container_id: ValueString<'a>,
    pub provider_name: ValueString<'a>,
    pub accepter_region_name: ValueString<'a>,
    pub aws_account_id: ValueString<'a>,
    pub route_table_cidr_block: ValueString<'a>,
    pub vpc_id: ValueString<'a>,
    pub connection_id: ValueString<'a>,
    pub error_state_name: ValueString<'a>,
    pub status_name: ValueString<'a>,
    pub atlas_cidr_block: ValueString<'a>,
    pub azure_directory_id: ValueString<'a>,
    pub azure_subscription_id: ValueString<'a>,
    pub resource_group_name: ValueString<'a>,
    pub vnet_name: ValueString<'a>,
    pub error_state: ValueString<'a>,
    pub status: ValueString<'a>,
    pub gcp_project_id: ValueString<'a>,
    pub network_name: ValueString<'a>,
    pub error_message: ValueString<'a>,
    pub atlas_gcp_project_id: ValueString<'a>,
    pub atlas_vpc_name: ValueString<'a>,
}

impl<'a> From<NetworkPeeringState<'a>> for NetworkPeeringDataSourceState<'a> {
    fn from(peering: NetworkPeeringState<'a>) -> Self {
        Self {
            project_id: peering.project_id,
            peering_id: peering.peer_id,
            container_id: peering.container_id,
            provider_name: peering.provider_name,
            accepter_region_name: peering.accepter_region_name,
            aws_account_id: peering.aws_account_id,
            route_table_cidr_block: peering.route_table_cidr_block,
            vpc_id: peering.vpc_id,
            connection_id: peering.connection_id,
            error_state_name: peering.error_state_name,
            status_name: peering.status_name,
            atlas_cidr_block: peering.atlas_cidr_block,
            azure_directory_id: peering.azure_directory_id,
            azure_subscription_id: peering.azure_subscription_id,
            resource_group_name: peering.resource_group_name,
            vnet_name: peering.vnet_name,
            error_state: peering.error_state,
            status: peering.status,
            gcp_project_id: peering.gcp_project_id,
            network_name: peering.network_name,
            error_message: peering.error_message,
            atlas_gcp_project_id: peering.atlas_gcp_project_id,
            atlas_vpc_name: peering.atlas_vpc_name,
        }
    }
}

impl<'a> WithSchema for NetworkPeeringDataSourceState<'a> {
    fn schema() -> Schema {
        let required = |description| {
            attribute(AttributeType::String, AttributeConstraint::Required, description)
        };
        let computed = |description| {
            attribute(AttributeType::String, AttributeConstraint::Computed, description)
        };
        schema(
            "Reads a network peering connection of an Atlas project",
            [
                ("project_id", required("Project the peering belongs to")),
                ("peering_id", required("Atlas identifier of the peering connection")),
                ("container_id", computed("Atlas network container of the peering")),
                ("provider_name", computed("Cloud provider of the peering")),
                ("accepter_region_name", computed("AWS region of the peer VPC")),
                ("aws_account_id", computed("AWS account owning the peer VPC")),
                ("route_table_cidr_block", computed("CIDR block of the peer VPC")),
                ("vpc_id", computed("Identifier of the peer VPC")),
                ("connection_id", computed("AWS peering connection identifier")),
                ("error_state_name", computed("Error state of an AWS peering")),
                ("status_name", computed("Status of an AWS peering")),
                ("atlas_cidr_block", computed("CIDR block of the Atlas side")),
                ("azure_directory_id", computed("Azure AD directory of the peer VNet")),
                ("azure_subscription_id", computed("Azure subscription of the peer VNet")),
                ("resource_group_name", computed("Azure resource group of the peer VNet")),
                ("vnet_name", computed("Name of the peer VNet")),
                ("error_state", computed("Error state of an Azure or GCP peering")),
                ("status", computed("Status of an Azure or GCP peering")),
                ("gcp_project_id", computed("GCP project of the peer network")),
                ("network_name", computed("Name of the peer GCP network")),
                ("error_message", computed("Error reported by Atlas")),
                ("atlas_gcp_project_id", computed("GCP project hosting the Atlas side")),
                ("atlas_vpc_name", computed("Name of the Atlas side GCP network")),
            ],
        )
    }
}

#[derive(Debug, Default, Clone)]
pub struct NetworkPeeringDataSource {
    client: ClientHandle,
}

impl NetworkPeeringDataSource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for NetworkPeeringDataSource {
    type State<'a> = NetworkPeeringDataSourceState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(NetworkPeeringDataSourceState::schema())
    }

    async fn validate<'a>(&self, _diags: &mut Diagnostics, _config: Self::State<'a>) -> Option<()> {
        Some(())
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let client = self.client.get(diags).await?;
        let project_id = config.project_id.as_str_or_empty();
        let peering_id = config.peering_id.as_str_or_empty();

        let fetched = match client.get_peer(project_id, peering_id).await {
            Ok(peer) => {
                let provider_name = peer.provider_name.clone().unwrap_or_default();
                peer_container(&client, project_id, &peer, &provider_name)
                    .await
                    .map(|container| (peer, provider_name, container))
            }
            Err(err) => Err(err),
        };

        match fetched {
            Ok((peer, provider_name, container)) => {
                let mut state = NetworkPeeringState {
                    project_id: string(project_id),
                    provider_name: string(provider_name),
                    ..Default::default()
                };
                state.apply(peer, container);
                Some(state.into())
            }
            Err(err) => {
                report(diags, format!("error getting network peering `{peering_id}`"), err);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::client::mock::{MockReply, MockTransport};
    use crate::client::AtlasClient;

    #[tokio::test]
    async fn reads_gcp_peering_with_atlas_network() {
        let mock = MockTransport::default();
        mock.on(
            Method::GET,
            "/api/atlas/v1.0/groups/p1/peers/62a1",
            MockReply::Json(json!({
                "id": "62a1",
                "containerId": "c1",
                "providerName": "GCP",
                "gcpProjectId": "customer-project",
                "networkName": "customer-network",
                "status": "AVAILABLE"
            })),
        );
        mock.on(
            Method::GET,
            "/api/atlas/v1.0/groups/p1/containers/c1",
            MockReply::Json(json!({
                "id": "c1",
                "gcpProjectId": "atlas-project",
                "networkName": "nt-atlas"
            })),
        );
        let data_source =
            NetworkPeeringDataSource::new(ClientHandle::with_client(AtlasClient::new(mock)));

        let mut diags = Diagnostics::default();
        let state = data_source
            .read(
                &mut diags,
                NetworkPeeringDataSourceState {
                    project_id: string("p1"),
                    peering_id: string("62a1"),
                    ..Default::default()
                },
                Default::default(),
            )
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(state.peering_id, string("62a1"));
        assert_eq!(state.container_id, string("c1"));
        assert_eq!(state.status, string("AVAILABLE"));
        assert_eq!(state.atlas_gcp_project_id, string("atlas-project"));
        assert_eq!(state.atlas_vpc_name, string("nt-atlas"));
        assert!(state.accepter_region_name.is_null());
    }
}
