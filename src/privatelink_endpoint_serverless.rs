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

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeConstraint, AttributeType};
use tf_provider::value::{Value, ValueEmpty, ValueString};
use tf_provider::{AttributePath, Diagnostics, Resource, Schema};

use crate::client::models::ServerlessEndpoint;
use crate::client::{ApiError, AtlasClient, ClientHandle};
use crate::poll::StateChangeConf;
use crate::state_id::{decode_state_id, split_import_id, StateId};
use crate::utils::{
    attribute, fill, opt_string, push_if_changed, report, schema, string, validate_one_of,
    ValueExt, WithSchema,
};

pub const PROVIDERS: &[&str] = &["AWS", "AZURE"];

const ENDPOINT_RESERVED: StateChangeConf = StateChangeConf {
    pending: &["RESERVATION_REQUESTED", "INITIATING", "DELETING"],
    target: &["RESERVED", "FAILED", "DELETED", "AVAILABLE"],
    timeout: Duration::from_secs(2 * 60 * 60),
    min_interval: Duration::from_secs(5),
    delay: Duration::from_secs(3),
};

const ENDPOINT_DELETED: StateChangeConf = StateChangeConf {
    pending: &["DELETING"],
    target: &["DELETED", "FAILED"],
    timeout: Duration::from_secs(2 * 60 * 60),
    min_interval: Duration::from_secs(5),
    delay: Duration::from_secs(3),
};

/// Atlas answers 400 instead of 404 for unknown endpoint ids
pub(crate) fn is_gone(err: &ApiError) -> bool {
    matches!(err.status(), Some(400 | 404))
}

pub(crate) async fn endpoint_status(
    client: &AtlasClient,
    project_id: &str,
    instance_name: &str,
    endpoint_id: &str,
) -> Result<((), String), ApiError> {
    match client
        .get_serverless_endpoint(project_id, instance_name, endpoint_id)
        .await
    {
        Ok(endpoint) => Ok(((), endpoint.status.unwrap_or_default())),
        Err(err) if is_gone(&err) => Ok(((), "DELETED".to_owned())),
        Err(err) => Err(err),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateLinkEndpointServerlessState<'a> {
    pub id: ValueString<'a>,
    pub project_id: ValueString<'a>,
    pub instance_name: ValueString<'a>,
    pub provider_name: ValueString<'a>,
    pub endpoint_id: ValueString<'a>,
    pub endpoint_service_name: ValueString<'a>,
    pub private_link_service_resource_id: ValueString<'a>,
    pub status: ValueString<'a>,
}

impl<'a> PrivateLinkEndpointServerlessState<'a> {
    fn apply(&mut self, endpoint: ServerlessEndpoint) {
        if endpoint.id.is_some() {
            self.endpoint_id = opt_string(endpoint.id);
        }
        self.endpoint_service_name = opt_string(endpoint.endpoint_service_name);
        self.private_link_service_resource_id =
            opt_string(endpoint.private_link_service_resource_id);
        self.status = opt_string(endpoint.status);
    }

    fn computed_mut(&mut self) -> [&mut ValueString<'a>; 4] {
        [
            &mut self.endpoint_id,
            &mut self.endpoint_service_name,
            &mut self.private_link_service_resource_id,
            &mut self.status,
        ]
    }
}

impl<'a> WithSchema for PrivateLinkEndpointServerlessState<'a> {
    fn schema() -> Schema {
        let required = |description| {
            attribute(AttributeType::String, AttributeConstraint::Required, description)
        };
        let computed = |description| {
            attribute(AttributeType::String, AttributeConstraint::Computed, description)
        };
        schema(
            "Private endpoint service reserved for a serverless instance",
            [
                ("id", computed("Composite identifier of the endpoint")),
                ("project_id", required("Project hosting the serverless instance")),
                ("instance_name", required("Name of the serverless instance")),
                ("provider_name", required("Cloud provider: AWS or AZURE")),
                ("endpoint_id", computed("Atlas identifier of the endpoint")),
                (
                    "endpoint_service_name",
                    computed("Name of the AWS PrivateLink endpoint service"),
                ),
                (
                    "private_link_service_resource_id",
                    computed("Resource id of the Azure Private Link service"),
                ),
                ("status", computed("Status of the endpoint")),
            ],
        )
    }
}

#[derive(Debug, Default, Clone)]
pub struct PrivateLinkEndpointServerlessResource {
    client: ClientHandle,
}

impl PrivateLinkEndpointServerlessResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Resource for PrivateLinkEndpointServerlessResource {
    type State<'a> = PrivateLinkEndpointServerlessState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(PrivateLinkEndpointServerlessState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_one_of(diags, "provider_name", &config.provider_name, PROVIDERS);
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
        let id = decode_state_id(diags, &state.id)?;
        let (Ok(project_id), Ok(instance_name), Ok(endpoint_id)) = (
            id.get("project_id"),
            id.get("instance_name"),
            id.get("endpoint_id"),
        ) else {
            diags.error_short("Invalid serverless endpoint id", AttributePath::new("id"));
            return None;
        };

        match client
            .get_serverless_endpoint(project_id, instance_name, endpoint_id)
            .await
        {
            Ok(endpoint) => {
                let mut state = state;
                state.instance_name = string(instance_name);
                state.endpoint_id = string(endpoint_id);
                state.apply(endpoint);
                Some((state, private_state))
            }
            Err(err) if is_gone(&err) => {
                tracing::info!(endpoint_id, "serverless endpoint is gone, removing it from state");
                None
            }
            Err(err) => {
                report(
                    diags,
                    "error getting Serverless private link endpoint information",
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
        for value in state.computed_mut() {
            *value = Value::Unknown;
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
        push_if_changed(&mut replace, "project_id", &prior_state.project_id, &proposed_state.project_id);
        push_if_changed(
            &mut replace,
            "instance_name",
            &prior_state.instance_name,
            &proposed_state.instance_name,
        );
        push_if_changed(
            &mut replace,
            "provider_name",
            &prior_state.provider_name,
            &proposed_state.provider_name,
        );

        let state = PrivateLinkEndpointServerlessState {
            project_id: proposed_state.project_id,
            instance_name: proposed_state.instance_name,
            provider_name: proposed_state.provider_name,
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
        let project_id = state.project_id.as_str_or_empty().to_owned();
        let instance_name = state.instance_name.as_str_or_empty().to_owned();

        let endpoint_id = match client
            .create_serverless_endpoint(&project_id, &instance_name)
            .await
        {
            Ok(ServerlessEndpoint { id: Some(id), .. }) => id,
            Ok(_) => {
                diags.root_error(
                    format!("error adding MongoDB Serverless PrivateLink Endpoint to {instance_name}"),
                    "Atlas did not return the identifier of the new endpoint",
                );
                return None;
            }
            Err(err) => {
                report(
                    diags,
                    format!("error adding MongoDB Serverless PrivateLink Endpoint to {instance_name}"),
                    err,
                );
                return None;
            }
        };

        let client_ref = &client;
        let (project_ref, instance_ref, endpoint_ref) =
            (project_id.as_str(), instance_name.as_str(), endpoint_id.as_str());
        if let Err(err) = ENDPOINT_RESERVED
            .wait_for(move || endpoint_status(client_ref, project_ref, instance_ref, endpoint_ref))
            .await
        {
            report(
                diags,
                format!("error adding MongoDB Serverless PrivateLink Endpoint ({endpoint_id})"),
                err,
            );
            return None;
        }

        let endpoint = match client
            .get_serverless_endpoint(&project_id, &instance_name, &endpoint_id)
            .await
        {
            Ok(endpoint) => endpoint,
            Err(err) => {
                report(
                    diags,
                    "error getting Serverless private link endpoint information",
                    err,
                );
                return None;
            }
        };

        state.id = string(
            StateId::new([
                ("project_id", &project_id),
                ("instance_name", &instance_name),
                ("endpoint_id", &endpoint_id),
            ])
            .encode(),
        );
        let mut remote = state.clone();
        remote.endpoint_id = string(&endpoint_id);
        remote.apply(endpoint);
        for (slot, value) in state.computed_mut().into_iter().zip(remote.computed_mut()) {
            fill(slot, value.clone());
        }
        Some((state, private_state))
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
        let id = decode_state_id(diags, &state.id)?;
        let (Ok(project_id), Ok(instance_name), Ok(endpoint_id)) = (
            id.get("project_id"),
            id.get("instance_name"),
            id.get("endpoint_id"),
        ) else {
            diags.error_short("Invalid serverless endpoint id", AttributePath::new("id"));
            return None;
        };

        match client
            .get_serverless_endpoint(project_id, instance_name, endpoint_id)
            .await
        {
            Ok(_) => (),
            Err(err) if is_gone(&err) => {
                tracing::info!(endpoint_id, "serverless endpoint already deleted");
                return Some(());
            }
            Err(err) => {
                report(
                    diags,
                    "error getting Serverless private link endpoint information",
                    err,
                );
                return None;
            }
        }

        if let Err(err) = client
            .delete_serverless_endpoint(project_id, instance_name, endpoint_id)
            .await
        {
            report(
                diags,
                format!("error deleting serverless private link endpoint({endpoint_id})"),
                err,
            );
            return None;
        }

        let client_ref = &client;
        match ENDPOINT_DELETED
            .wait_for(move || endpoint_status(client_ref, project_id, instance_name, endpoint_id))
            .await
        {
            Ok(()) => Some(()),
            Err(err) => {
                report(
                    diags,
                    format!("error deleting serverless private link endpoint({endpoint_id})"),
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
        let [project_id, instance_name, endpoint_id] = match split_import_id::<3>(
            &id,
            "--",
            "{project_id}--{instance_name}--{endpoint_id}",
        ) {
            Ok(parts) => parts,
            Err(err) => {
                diags.root_error("Invalid import id", err.to_string());
                return None;
            }
        };

        let endpoint = match client
            .get_serverless_endpoint(project_id, instance_name, endpoint_id)
            .await
        {
            Ok(endpoint) => endpoint,
            Err(err) => {
                report(
                    diags,
                    format!(
                        "couldn't import serverless private link endpoint ({endpoint_id}) in project ({project_id})"
                    ),
                    err,
                );
                return None;
            }
        };

        let provider_name = match endpoint.private_link_service_resource_id.as_deref() {
            Some(resource_id) if !resource_id.is_empty() => "AZURE",
            _ => "AWS",
        };
        let mut state = PrivateLinkEndpointServerlessState {
            id: string(
                StateId::new([
                    ("project_id", project_id),
                    ("instance_name", instance_name),
                    ("endpoint_id", endpoint_id),
                ])
                .encode(),
            ),
            project_id: string(project_id),
            instance_name: string(instance_name),
            provider_name: string(provider_name),
            endpoint_id: string(endpoint_id),
            ..Default::default()
        };
        state.apply(endpoint);
        Some((state, Default::default()))
    }
}
