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

use tf_provider::{map, Diagnostics, Provider, Schema, ValueEmpty};

use crate::{
    client::{AtlasClient, ClientHandle, HttpTransport},
    config::{ClientConfig, ProviderConfig},
    network_container::{NetworkContainerDataSource, NetworkContainerResource},
    network_peering::{NetworkPeeringDataSource, NetworkPeeringResource},
    privatelink_endpoint::PrivateLinkEndpointResource,
    privatelink_endpoint_serverless::PrivateLinkEndpointServerlessResource,
    privatelink_endpoint_service::PrivateLinkEndpointServiceResource,
    privatelink_endpoint_service_serverless::PrivateLinkEndpointServiceServerlessResource,
    project::{ProjectDataSource, ProjectResource},
    serverless_instance::{ServerlessInstanceDataSource, ServerlessInstanceResource},
    utils::{report, WithSchema},
};

/// The client is shared by every resource, and set once the provider block
/// has been configured.
#[derive(Debug, Default, Clone)]
pub struct AtlasProvider {
    client: ClientHandle,
}

#[async_trait]
impl Provider for AtlasProvider {
    type Config<'a> = ProviderConfig<'a>;
    type MetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ProviderConfig::schema())
    }

    async fn validate<'a>(&self, _diags: &mut Diagnostics, _config: Self::Config<'a>) -> Option<()> {
        Some(())
    }

    async fn configure<'a>(
        &self,
        diags: &mut Diagnostics,
        terraform_version: String,
        config: Self::Config<'a>,
    ) -> Option<()> {
        let client_config = ClientConfig::resolve(diags, &config, &terraform_version, |name| {
            std::env::var(name).ok()
        });
        tracing::info!(base_url = %client_config.base_url, "configuring MongoDB Atlas client");

        match HttpTransport::new(&client_config) {
            Ok(transport) => {
                self.client.set(AtlasClient::new(transport)).await;
                Some(())
            }
            Err(err) => {
                report(diags, "error configuring the MongoDB Atlas client", err);
                None
            }
        }
    }

    fn get_resources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<std::collections::HashMap<String, Box<dyn tf_provider::resource::DynamicResource>>>
    {
        let client = &self.client;
        Some(map! {
            "project" => ProjectResource::new(client.clone()),
            "network_container" => NetworkContainerResource::new(client.clone()),
            "network_peering" => NetworkPeeringResource::new(client.clone()),
            "privatelink_endpoint" => PrivateLinkEndpointResource::new(client.clone()),
            "privatelink_endpoint_service" => PrivateLinkEndpointServiceResource::new(client.clone()),
            "serverless_instance" => ServerlessInstanceResource::new(client.clone()),
            "privatelink_endpoint_serverless" => PrivateLinkEndpointServerlessResource::new(client.clone()),
            "privatelink_endpoint_service_serverless" => PrivateLinkEndpointServiceServerlessResource::new(client.clone()),
        })
    }

    fn get_data_sources(
        &self,
        _diags: &mut Diagnostics,
    ) -> Option<
        std::collections::HashMap<String, Box<dyn tf_provider::data_source::DynamicDataSource>>,
    > {
        let client = &self.client;
        Some(map! {
            "project" => ProjectDataSource::new(client.clone()),
            "network_container" => NetworkContainerDataSource::new(client.clone()),
            "network_peering" => NetworkPeeringDataSource::new(client.clone()),
            "serverless_instance" => ServerlessInstanceDataSource::new(client.clone()),
        })
    }
}
