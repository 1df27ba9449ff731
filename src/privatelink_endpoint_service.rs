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

//! Link between an Atlas private endpoint service and an interface endpoint
//! created in the user's own cloud account.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeConstraint, AttributeType};
use tf_provider::value::{Value, ValueBool, ValueEmpty, ValueString};
use tf_provider::{AttributePath, Diagnostics, Resource, Schema};

use crate::client::models::InterfaceEndpoint;
use crate::client::{ApiError, AtlasClient, ClientHandle};
use crate::poll::StateChangeConf;
use crate::state_id::{decode_state_id, split_import_id, StateId};
use crate::utils::{
    attribute, fill, opt_bool, opt_string, push_if_changed, report, schema, string,
    validate_one_of, ValueExt, WithSchema,
};

pub const PROVIDERS: &[&str] = &["AWS", "AZURE"];

const LINK_CREATED: StateChangeConf = StateChangeConf {
    pending: &[
        "NONE",
        "INITIATING",
        "PENDING_ACCEPTANCE",
        "PENDING",
        "DELETING",
        "VERIFIED",
    ],
    target: &["AVAILABLE", "REJECTED", "DELETED", "FAILED"],
    timeout: Duration::from_secs(60 * 60),
    min_interval: Duration::from_secs(5),
    delay: Duration::from_secs(60),
};

const LINK_DELETED: StateChangeConf = StateChangeConf {
    pending: &["NONE", "PENDING_ACCEPTANCE", "PENDING", "DELETING", "INITIATING"],
    target: &["REJECTED", "DELETED", "FAILED"],
    timeout: Duration::from_secs(60 * 60),
    min_interval: Duration::from_secs(5),
    delay: Duration::from_secs(3),
};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateLinkEndpointServiceState<'a> {
    pub id: ValueString<'a>,
    pub project_id: ValueString<'a>,
    pub private_link_id: ValueString<'a>,
    pub endpoint_service_id: ValueString<'a>,
    pub provider_name: ValueString<'a>,
    pub private_endpoint_ip_address: ValueString<'a>,
    pub interface_endpoint_id: ValueString<'a>,
    pub private_endpoint_connection_name: ValueString<'a>,
    pub private_endpoint_resource_id: ValueString<'a>,
    pub delete_requested: ValueBool,
    pub error_message: ValueString<'a>,
    pub aws_connection_status: ValueString<'a>,
    pub azure_status: ValueString<'a>,
}

impl<'a> PrivateLinkEndpointServiceState<'a> {
    fn apply(&mut self, endpoint: InterfaceEndpoint, provider_name: &str) {
        self.delete_requested = opt_bool(Some(endpoint.delete_requested.unwrap_or_default()));
        self.error_message = opt_string(endpoint.error_message);
        self.aws_connection_status = opt_string(endpoint.aws_connection_status);
        self.azure_status = match provider_name {
            "AZURE" => opt_string(endpoint.azure_status),
            _ => Value::Null,
        };
        self.interface_endpoint_id = opt_string(endpoint.interface_endpoint_id);
        self.private_endpoint_connection_name =
            opt_string(endpoint.private_endpoint_connection_name);
        if endpoint.private_endpoint_ip_address.is_some()
            || !self.private_endpoint_ip_address.is_set()
        {
            self.private_endpoint_ip_address = opt_string(endpoint.private_endpoint_ip_address);
        }
        self.private_endpoint_resource_id = opt_string(endpoint.private_endpoint_resource_id);
    }

    fn computed_mut(&mut self) -> [&mut ValueString<'a>; 6] {
        [
            &mut self.interface_endpoint_id,
            &mut self.private_endpoint_connection_name,
            &mut self.private_endpoint_resource_id,
            &mut self.error_message,
            &mut self.aws_connection_status,
            &mut self.azure_status,
        ]
    }
}

impl<'a> WithSchema for PrivateLinkEndpointServiceState<'a> {
    fn schema() -> Schema {
        let required = |description| {
            attribute(AttributeType::String, AttributeConstraint::Required, description)
        };
        let computed = |attr_type, description| {
            attribute(attr_type, AttributeConstraint::Computed, description)
        };
        schema(
            "Interface endpoint attached to an Atlas private endpoint service",
            [
                ("id", computed(AttributeType::String, "Composite identifier of the link")),
                ("project_id", required("Project of the private endpoint service")),
                (
                    "private_link_id",
                    required("Private endpoint service, or the id of a private endpoint resource"),
                ),
                (
                    "endpoint_service_id",
                    required("Identifier of the interface endpoint in the cloud provider account"),
                ),
                ("provider_name", required("Cloud provider: AWS or AZURE")),
                (
                    "private_endpoint_ip_address",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::OptionalComputed,
                        "Private IP address of the Azure private endpoint",
                    ),
                ),
                (
                    "interface_endpoint_id",
                    computed(AttributeType::String, "Atlas identifier of the interface endpoint"),
                ),
                (
                    "private_endpoint_connection_name",
                    computed(AttributeType::String, "Name of the Azure private endpoint connection"),
                ),
                (
                    "private_endpoint_resource_id",
                    computed(AttributeType::String, "Resource id of the Azure private endpoint"),
                ),
                (
                    "delete_requested",
                    computed(AttributeType::Bool, "Whether Atlas is removing the endpoint"),
                ),
                ("error_message", computed(AttributeType::String, "Error reported by Atlas")),
                (
                    "aws_connection_status",
                    computed(AttributeType::String, "Status of the AWS interface endpoint"),
                ),
                ("azure_status", computed(AttributeType::String, "Status of the Azure private endpoint")),
            ],
        )
    }
}

/// Identifying attributes of a link
struct LinkId<'a> {
    project_id: &'a str,
    private_link_id: &'a str,
    endpoint_service_id: &'a str,
    provider_name: &'a str,
}

impl<'a> LinkId<'a> {
    fn from_state_id(diags: &mut Diagnostics, id: &'a StateId) -> Option<Self> {
        match (
            id.get("project_id"),
            id.get("private_link_id"),
            id.get("endpoint_service_id"),
            id.get("provider_name"),
        ) {
            (Ok(project_id), Ok(private_link_id), Ok(endpoint_service_id), Ok(provider_name)) => {
                Some(Self {
                    project_id,
                    private_link_id,
                    endpoint_service_id,
                    provider_name,
                })
            }
            _ => {
                diags.error_short("Invalid private endpoint link id", AttributePath::new("id"));
                None
            }
        }
    }

    fn encode(&self) -> String {
        StateId::new([
            ("project_id", self.project_id),
            ("private_link_id", self.private_link_id),
            ("endpoint_service_id", self.endpoint_service_id),
            ("provider_name", self.provider_name),
        ])
        .encode()
    }

    async fn get(&self, client: &AtlasClient) -> Result<InterfaceEndpoint, ApiError> {
        client
            .get_interface_endpoint(
                self.project_id,
                self.provider_name,
                self.private_link_id,
                self.endpoint_service_id,
            )
            .await
    }

    async fn status(&self, client: &AtlasClient) -> Result<((), String), ApiError> {
        match self.get(client).await {
            Ok(endpoint) => {
                let status = endpoint.current_status(self.provider_name).to_owned();
                tracing::debug!(endpoint_service_id = self.endpoint_service_id, %status, "interface endpoint status");
                Ok(((), status))
            }
            Err(err) if err.is_not_found() => Ok(((), "DELETED".to_owned())),
            Err(err) => Err(err),
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct PrivateLinkEndpointServiceResource {
    client: ClientHandle,
}

impl PrivateLinkEndpointServiceResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Resource for PrivateLinkEndpointServiceResource {
    type State<'a> = PrivateLinkEndpointServiceState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(PrivateLinkEndpointServiceState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_one_of(diags, "provider_name", &config.provider_name, PROVIDERS);
        if config.provider_name.as_known_str() == Some("AZURE")
            && !config.private_endpoint_ip_address.is_set()
        {
            diags.error(
                "`private_endpoint_ip_address` must be set when `provider_name` is `AZURE`",
                "Azure private endpoints are registered with their private IP address",
                AttributePath::new("private_endpoint_ip_address"),
            );
        }

        if diags.errors.is_empty() {
            Some(())
        } else {
            None
        }
    }

    async fn read<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.client.get(diags).await?;
        let state_id = decode_state_id(diags, &state.id)?;
        let link = LinkId::from_state_id(diags, &state_id)?;

        match link.get(&client).await {
            Ok(endpoint) => {
                let mut state = state;
                state.endpoint_service_id = string(link.endpoint_service_id);
                state.apply(endpoint, link.provider_name);
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                tracing::info!(
                    endpoint_service_id = link.endpoint_service_id,
                    "interface endpoint is gone, removing it from state"
                );
                None
            }
            Err(err) => {
                report(
                    diags,
                    format!(
                        "error getting MongoDB Interface Endpoint Connection ({})",
                        link.endpoint_service_id
                    ),
                    err,
                );
                None
            }
        }
    }

    async fn plan_create<'a>(
        &self,
        _diags: &mut Diagnostics,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let mut state = proposed_state;
        state.id = Value::Unknown;
        state.delete_requested = Value::Unknown;
        for value in state.computed_mut() {
            *value = Value::Unknown;
        }
        if state.private_endpoint_ip_address.is_null() {
            state.private_endpoint_ip_address = Value::Unknown;
        }
        Some((state, Default::default()))
    }

    async fn plan_update<'a>(
        &self,
        _diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        proposed_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(
        Self::State<'a>,
        Self::PrivateState<'a>,
        Vec<AttributePath>,
    )> {
        let mut replace = Vec::new();
        for (name, prior, proposed) in [
            ("project_id", &prior_state.project_id, &proposed_state.project_id),
            ("private_link_id", &prior_state.private_link_id, &proposed_state.private_link_id),
            (
                "endpoint_service_id",
                &prior_state.endpoint_service_id,
                &proposed_state.endpoint_service_id,
            ),
            ("provider_name", &prior_state.provider_name, &proposed_state.provider_name),
            (
                "private_endpoint_ip_address",
                &prior_state.private_endpoint_ip_address,
                &proposed_state.private_endpoint_ip_address,
            ),
        ] {
            push_if_changed(&mut replace, name, prior, proposed);
        }

        let state = PrivateLinkEndpointServiceState {
            project_id: proposed_state.project_id,
            private_link_id: proposed_state.private_link_id,
            endpoint_service_id: proposed_state.endpoint_service_id,
            provider_name: proposed_state.provider_name,
            private_endpoint_ip_address: proposed_state.private_endpoint_ip_address,
            ..prior_state
        };
        Some((state, prior_private_state, replace))
    }

    async fn plan_destroy<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        _prior_private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        Some(())
    }

    async fn create<'a>(
        &self,
        diags: &mut Diagnostics,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.client.get(diags).await?;
        let mut state = planned_state;
        let private_link_id =
            StateId::resolve(state.private_link_id.as_str_or_empty(), "private_link_id");
        let link = LinkId {
            project_id: state.project_id.as_str_or_empty(),
            private_link_id: &private_link_id,
            endpoint_service_id: state.endpoint_service_id.as_str_or_empty(),
            provider_name: state.provider_name.as_str_or_empty(),
        };

        let ip_address = match link.provider_name {
            "AZURE" => match state.private_endpoint_ip_address.as_known_str() {
                Some(ip_address) => Some(ip_address),
                None => {
                    diags.error_short(
                        "`private_endpoint_ip_address` must be set when `provider_name` is `AZURE`",
                        AttributePath::new("private_endpoint_ip_address"),
                    );
                    return None;
                }
            },
            _ => None,
        };

        if let Err(err) = client
            .create_interface_endpoint(
                link.project_id,
                link.provider_name,
                link.private_link_id,
                link.endpoint_service_id,
                ip_address,
            )
            .await
        {
            report(
                diags,
                format!(
                    "error adding MongoDB Private Service Endpoint Connection({}) to a Private Endpoint ({})",
                    link.provider_name, link.private_link_id
                ),
                err,
            );
            return None;
        }

        tracing::info!(
            endpoint_service_id = link.endpoint_service_id,
            "waiting for the interface endpoint to be available"
        );
        let (link_ref, client_ref) = (&link, &client);
        if let Err(err) = LINK_CREATED
            .wait_for(move || link_ref.status(client_ref))
            .await
        {
            report(
                diags,
                format!(
                    "error adding MongoDB Private Service Endpoint Connection({}) to a Private Endpoint ({})",
                    link.endpoint_service_id, link.private_link_id
                ),
                err,
            );
            return None;
        }

        let id = link.encode();
        let provider_name = link.provider_name.to_owned();
        let fetched = link.get(&client).await;
        match fetched {
            Ok(endpoint) => {
                let mut remote = state.clone();
                remote.apply(endpoint, &provider_name);
                state.id = string(id);
                for (slot, value) in state.computed_mut().into_iter().zip(remote.computed_mut()) {
                    fill(slot, value.clone());
                }
                fill(&mut state.delete_requested, remote.delete_requested);
                fill(&mut state.private_endpoint_ip_address, remote.private_endpoint_ip_address);
                Some((state, private_state))
            }
            Err(err) => {
                report(diags, "error getting MongoDB Interface Endpoint Connection", err);
                None
            }
        }
    }

    async fn update<'a>(
        &self,
        _diags: &mut Diagnostics,
        _prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        Some((planned_state, private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let client = self.client.get(diags).await?;
        let state_id = decode_state_id(diags, &state.id)?;
        let link = LinkId::from_state_id(diags, &state_id)?;

        if let Err(err) = client
            .delete_interface_endpoint(
                link.project_id,
                link.provider_name,
                link.private_link_id,
                link.endpoint_service_id,
            )
            .await
        {
            report(
                diags,
                format!(
                    "error deleting MongoDB Interface Endpoint Connection ({})",
                    link.endpoint_service_id
                ),
                err,
            );
            return None;
        }

        let (link_ref, client_ref) = (&link, &client);
        match LINK_DELETED.wait_for(move || link_ref.status(client_ref)).await {
            Ok(()) => Some(()),
            Err(err) => {
                report(
                    diags,
                    format!(
                        "error deleting MongoDB Interface Endpoint Connection ({})",
                        link.endpoint_service_id
                    ),
                    err,
                );
                None
            }
        }
    }

    async fn import<'a>(
        &self,
        diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let client = self.client.get(diags).await?;
        let [project_id, private_link_id, endpoint_service_id, provider_name] =
            match split_import_id::<4>(
                &id,
                "--",
                "{project_id}--{private_link_id}--{endpoint_service_id}--{provider_name}",
            ) {
                Ok(parts) => parts,
                Err(err) => {
                    diags.root_error("Invalid import id", err.to_string());
                    return None;
                }
            };
        let link = LinkId {
            project_id,
            private_link_id,
            endpoint_service_id,
            provider_name,
        };

        let endpoint = match link.get(&client).await {
            Ok(endpoint) => endpoint,
            Err(err) => {
                report(
                    diags,
                    format!("error getting MongoDB Interface Endpoint Connection ({endpoint_service_id})"),
                    err,
                );
                return None;
            }
        };

        let mut state = PrivateLinkEndpointServiceState {
            id: string(link.encode()),
            project_id: string(project_id),
            private_link_id: string(private_link_id),
            endpoint_service_id: string(endpoint_service_id),
            provider_name: string(provider_name),
            ..Default::default()
        };
        state.apply(endpoint, provider_name);
        Some((state, Default::default()))
    }
}
