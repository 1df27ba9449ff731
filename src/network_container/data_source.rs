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
use tf_provider::value::{ValueBool, ValueList, ValueString};
use tf_provider::{DataSource, Diagnostics, Schema, ValueEmpty};

use crate::client::ClientHandle;
use crate::utils::{attribute, report, schema, string, string_list_type, ValueExt, WithSchema};

use super::NetworkContainerState;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkContainerDataSourceState<'a> {
    pub project_id: ValueString<'a>,
    pub container_id: ValueString<'a>,
    pub atlas_cidr_block: ValueString<'a>,
    pub provider_name: ValueString<'a>,
    pub region_name: ValueString<'a>,
    pub region: ValueString<'a>,
    pub regions: ValueList<ValueString<'a>>,
    pub azure_subscription_id: ValueString<'a>,
    pub provisioned: ValueBool,
    pub gcp_project_id: ValueString<'a>,
    pub network_name: ValueString<'a>,
    pub vpc_id: ValueString<'a>,
    pub vnet_name: ValueString<'a>,
}

impl<'a> From<NetworkContainerState<'a>> for NetworkContainerDataSourceState<'a> {
    fn from(container: NetworkContainerState<'a>) -> Self {
        Self {
            project_id: container.project_id,
            container_id: container.container_id,
            atlas_cidr_block: container.atlas_cidr_block,
            provider_name: container.provider_name,
            region_name: container.region_name,
            region: container.region,
            regions: container.regions,
            azure_subscription_id: container.azure_subscription_id,
            provisioned: container.provisioned,
            gcp_project_id: container.gcp_project_id,
            network_name: container.network_name,
            vpc_id: container.vpc_id,
            vnet_name: container.vnet_name,
        }
    }
}

impl<'a> WithSchema for NetworkContainerDataSourceState<'a> {
    fn schema() -> Schema {
        let required = |description| {
            attribute(AttributeType::String, AttributeConstraint::Required, description)
        };
        let computed = |attr_type, description| {
            attribute(attr_type, AttributeConstraint::Computed, description)
        };
        schema(
            "Reads a network container of an Atlas project",
            [
                ("project_id", required("Project the container belongs to")),
                ("container_id", required("Atlas identifier of the container")),
                ("atlas_cidr_block", computed(AttributeType::String, "CIDR block of the container")),
                ("provider_name", computed(AttributeType::String, "Cloud provider of the container")),
                ("region_name", computed(AttributeType::String, "AWS region of the container")),
                ("region", computed(AttributeType::String, "Azure region of the container")),
                ("regions", computed(string_list_type(), "GCP regions of the container")),
                (
                    "azure_subscription_id",
                    computed(AttributeType::String, "Azure subscription hosting the container"),
                ),
                (
                    "provisioned",
                    computed(AttributeType::Bool, "Whether a cluster is deployed in the container"),
                ),
                ("gcp_project_id", computed(AttributeType::String, "GCP project hosting the container")),
                ("network_name", computed(AttributeType::String, "Name of the GCP network")),
                ("vpc_id", computed(AttributeType::String, "Identifier of the AWS VPC")),
                ("vnet_name", computed(AttributeType::String, "Name of the Azure VNet")),
            ],
        )
    }
}

#[derive(Debug, Default, Clone)]
pub struct NetworkContainerDataSource {
    client: ClientHandle,
}

impl NetworkContainerDataSource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for NetworkContainerDataSource {
    type State<'a> = NetworkContainerDataSourceState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(NetworkContainerDataSourceState::schema())
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
        let container_id = config.container_id.as_str_or_empty();

        match client.get_container(project_id, container_id).await {
            Ok(container) => {
                let mut state = NetworkContainerState {
                    project_id: string(project_id),
                    ..Default::default()
                };
                state.apply(container);
                Some(state.into())
            }
            Err(err) => {
                report(
                    diags,
                    format!("error getting network container `{container_id}`"),
                    err,
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;
    use tf_provider::value::Value;

    use super::*;
    use crate::client::mock::{MockReply, MockTransport};
    use crate::client::AtlasClient;

    #[tokio::test]
    async fn reads_gcp_container() {
        let mock = MockTransport::default();
        mock.on(
            Method::GET,
            "/api/atlas/v1.0/groups/p1/containers/c1",
            MockReply::Json(json!({
                "id": "c1",
                "providerName": "GCP",
                "atlasCidrBlock": "10.8.0.0/18",
                "regions": ["US_EAST_4", "EUROPE_WEST_1"],
                "gcpProjectId": "atlas-gcp",
                "networkName": "nt-1",
                "provisioned": true
            })),
        );
        let data_source =
            NetworkContainerDataSource::new(ClientHandle::with_client(AtlasClient::new(mock)));

        let mut diags = Diagnostics::default();
        let state = data_source
            .read(
                &mut diags,
                NetworkContainerDataSourceState {
                    project_id: string("p1"),
                    container_id: string("c1"),
                    ..Default::default()
                },
                Default::default(),
            )
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(state.provider_name, string("GCP"));
        assert_eq!(
            state.regions,
            Value::Value(vec![string("US_EAST_4"), string("EUROPE_WEST_1")])
        );
        assert_eq!(state.gcp_project_id, string("atlas-gcp"));
        assert_eq!(state.provisioned, Value::Value(true));
        assert!(state.vpc_id.is_null());
    }
}
