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
use tf_provider::value::{Value, ValueEmpty, ValueList, ValueString};
use tf_provider::{AttributePath, Diagnostics, Resource, Schema};

use crate::client::models::PrivateEndpoint;
use crate::client::{ApiError, AtlasClient, ClientHandle};
use crate::poll::StateChangeConf;
use crate::state_id::{decode_state_id, StateId, StateIdError};
use crate::utils::{
    attribute, fill, opt_string, push_if_changed, report, schema, string, string_list,
    string_list_type, validate_one_of, ValueExt, WithSchema,
};

pub const PROVIDERS: &[&str] = &["AWS", "AZURE", "GCP"];

const IMPORT_FORMAT: &str = "{project_id}-{private_link_id}-{provider_name}-{region}";

const ENDPOINT_CREATED: StateChangeConf = StateChangeConf {
    pending: &["INITIATING", "DELETING"],
    target: &["WAITING_FOR_USER", "FAILED", "DELETED", "AVAILABLE"],
    timeout: Duration::from_secs(60 * 60),
    min_interval: Duration::from_secs(5),
    delay: Duration::from_secs(3),
};

const ENDPOINT_DELETED: StateChangeConf = StateChangeConf {
    pending: &["DELETING"],
    target: &["DELETED", "FAILED"],
    timeout: Duration::from_secs(60 * 60),
    min_interval: Duration::from_secs(5),
    delay: Duration::from_secs(3),
};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateLinkEndpointState<'a> {
    pub id: ValueString<'a>,
    pub project_id: ValueString<'a>,
    pub provider_name: ValueString<'a>,
    pub region: ValueString<'a>,
    pub private_link_id: ValueString<'a>,
    pub endpoint_service_name: ValueString<'a>,
    pub error_message: ValueString<'a>,
    pub interface_endpoints: ValueList<ValueString<'a>>,
    pub private_endpoints: ValueList<ValueString<'a>>,
    pub private_link_service_name: ValueString<'a>,
    pub private_link_service_resource_id: ValueString<'a>,
    pub status: ValueString<'a>,
    pub endpoint_group_names: ValueList<ValueString<'a>>,
    pub region_name: ValueString<'a>,
    pub service_attachment_names: ValueList<ValueString<'a>>,
}

impl<'a> PrivateLinkEndpointState<'a> {
    fn apply(&mut self, endpoint: PrivateEndpoint) {
        self.private_link_id = opt_string(endpoint.id);
        self.endpoint_service_name = opt_string(endpoint.endpoint_service_name);
        self.error_message = opt_string(endpoint.error_message);
        self.interface_endpoints = string_list(endpoint.interface_endpoints);
        self.private_endpoints = string_list(endpoint.private_endpoints);
        self.private_link_service_name = opt_string(endpoint.private_link_service_name);
        self.private_link_service_resource_id =
            opt_string(endpoint.private_link_service_resource_id);
        self.status = opt_string(endpoint.status);
        self.endpoint_group_names = string_list(endpoint.endpoint_group_names);
        self.region_name = opt_string(endpoint.region_name);
        self.service_attachment_names = string_list(endpoint.service_attachment_names);
    }
}

impl<'a> WithSchema for PrivateLinkEndpointState<'a> {
    fn schema() -> Schema {
        let required = |description| {
            attribute(AttributeType::String, AttributeConstraint::Required, description)
        };
        let computed = |attr_type, description| {
            attribute(attr_type, AttributeConstraint::Computed, description)
        };
        schema(
            "Private endpoint service of an Atlas project in one cloud provider region",
            [
                ("id", computed(AttributeType::String, "Composite identifier of the endpoint service")),
                ("project_id", required("Project the endpoint service belongs to")),
                ("provider_name", required("Cloud provider: AWS, AZURE or GCP")),
                ("region", required("Cloud provider region of the endpoint service")),
                (
                    "private_link_id",
                    computed(AttributeType::String, "Atlas identifier of the endpoint service"),
                ),
                (
                    "endpoint_service_name",
                    computed(AttributeType::String, "Name of the AWS PrivateLink endpoint service"),
                ),
                ("error_message", computed(AttributeType::String, "Error reported by Atlas")),
                (
                    "interface_endpoints",
                    computed(string_list_type(), "AWS interface endpoints attached to the service"),
                ),
                (
                    "private_endpoints",
                    computed(string_list_type(), "Azure private endpoints attached to the service"),
                ),
                (
                    "private_link_service_name",
                    computed(AttributeType::String, "Name of the Azure Private Link Service"),
                ),
                (
                    "private_link_service_resource_id",
                    computed(AttributeType::String, "Resource id of the Azure Private Link Service"),
                ),
                ("status", computed(AttributeType::String, "Status of the endpoint service")),
                (
                    "endpoint_group_names",
                    computed(string_list_type(), "GCP endpoint groups attached to the service"),
                ),
                ("region_name", computed(AttributeType::String, "GCP region of the service")),
                (
                    "service_attachment_names",
                    computed(string_list_type(), "GCP service attachments of the service"),
                ),
            ],
        )
    }
}

async fn endpoint_status(
    client: &AtlasClient,
    project_id: &str,
    provider_name: &str,
    private_link_id: &str,
) -> Result<((), String), ApiError> {
    match client
        .get_private_endpoint(project_id, provider_name, private_link_id)
        .await
    {
        Ok(endpoint) => Ok(((), endpoint.status.unwrap_or_default())),
        Err(err) if err.is_not_found() => Ok(((), "DELETED".to_owned())),
        Err(err) => Err(err),
    }
}

/// `{project_id}-{private_link_id}-{provider_name}-{region}`, the region
/// keeping its own dashes
fn parse_import_id(id: &str) -> Result<(&str, &str, &str, String), StateIdError> {
    let parts: Vec<&str> = id.split('-').collect();
    match parts.as_slice() {
        [project_id, private_link_id, provider_name, region @ ..]
            if (1..=3).contains(&region.len())
                && !parts.iter().any(|part| part.is_empty()) =>
        {
            Ok((*project_id, *private_link_id, *provider_name, region.join("-")))
        }
        _ => Err(StateIdError::ImportFormat(IMPORT_FORMAT)),
    }
}

#[derive(Debug, Default, Clone)]
pub struct PrivateLinkEndpointResource {
    client: ClientHandle,
}

impl PrivateLinkEndpointResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Resource for PrivateLinkEndpointResource {
    type State<'a> = PrivateLinkEndpointState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(PrivateLinkEndpointState::schema())
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
        let (Ok(project_id), Ok(private_link_id), Ok(provider_name), Ok(region)) = (
            id.get("project_id"),
            id.get("private_link_id"),
            id.get("provider_name"),
            id.get("region"),
        ) else {
            diags.error_short("Invalid private endpoint id", AttributePath::new("id"));
            return None;
        };

        match client
            .get_private_endpoint(project_id, provider_name, private_link_id)
            .await
        {
            Ok(endpoint) => {
                let mut state = state;
                state.project_id = string(project_id);
                state.provider_name = string(provider_name);
                state.region = string(region);
                state.apply(endpoint);
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                tracing::info!(private_link_id, "private endpoint is gone, removing it from state");
                None
            }
            Err(err) => {
                report(
                    diags,
                    format!("error getting MongoDB Private Endpoint Connection ({private_link_id})"),
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
        state.private_link_id = Value::Unknown;
        state.endpoint_service_name = Value::Unknown;
        state.error_message = Value::Unknown;
        state.interface_endpoints = Value::Unknown;
        state.private_endpoints = Value::Unknown;
        state.private_link_service_name = Value::Unknown;
        state.private_link_service_resource_id = Value::Unknown;
        state.status = Value::Unknown;
        state.endpoint_group_names = Value::Unknown;
        state.region_name = Value::Unknown;
        state.service_attachment_names = Value::Unknown;
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
            "provider_name",
            &prior_state.provider_name,
            &proposed_state.provider_name,
        );
        push_if_changed(&mut replace, "region", &prior_state.region, &proposed_state.region);

        // every configurable attribute forces a new endpoint
        let state = PrivateLinkEndpointState {
            project_id: proposed_state.project_id,
            provider_name: proposed_state.provider_name,
            region: proposed_state.region,
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
        let provider_name = state.provider_name.as_str_or_empty().to_owned();
        let region = state.region.as_str_or_empty().to_owned();

        let private_link_id = match client
            .create_private_endpoint(&project_id, &provider_name, &region)
            .await
        {
            Ok(endpoint) => endpoint.id,
            Err(err) => {
                report(diags, "error creating MongoDB Private Endpoint Connection", err);
                return None;
            }
        };
        let Some(private_link_id) = private_link_id else {
            diags.root_error(
                "error creating MongoDB Private Endpoint Connection",
                "Atlas did not return the identifier of the new private endpoint service",
            );
            return None;
        };

        tracing::info!(private_link_id, "waiting for the private endpoint service");
        let client_ref = &client;
        let (project_ref, provider_ref, link_ref) = (&*project_id, &*provider_name, &*private_link_id);
        if let Err(err) = ENDPOINT_CREATED
            .wait_for(move || endpoint_status(client_ref, project_ref, provider_ref, link_ref))
            .await
        {
            report(diags, "error creating MongoDB Private Endpoint Connection", err);
            return None;
        }

        state.id = string(
            StateId::new([
                ("private_link_id", private_link_id.as_str()),
                ("project_id", project_id.as_str()),
                ("provider_name", provider_name.as_str()),
                ("region", region.as_str()),
            ])
            .encode(),
        );

        match client
            .get_private_endpoint(&project_id, &provider_name, &private_link_id)
            .await
        {
            Ok(endpoint) => {
                let mut remote = state.clone();
                remote.apply(endpoint);
                fill(&mut state.private_link_id, remote.private_link_id);
                fill(&mut state.endpoint_service_name, remote.endpoint_service_name);
                fill(&mut state.error_message, remote.error_message);
                fill(&mut state.interface_endpoints, remote.interface_endpoints);
                fill(&mut state.private_endpoints, remote.private_endpoints);
                fill(&mut state.private_link_service_name, remote.private_link_service_name);
                fill(
                    &mut state.private_link_service_resource_id,
                    remote.private_link_service_resource_id,
                );
                fill(&mut state.status, remote.status);
                fill(&mut state.endpoint_group_names, remote.endpoint_group_names);
                fill(&mut state.region_name, remote.region_name);
                fill(&mut state.service_attachment_names, remote.service_attachment_names);
                Some((state, private_state))
            }
            Err(err) => {
                report(
                    diags,
                    format!("error getting MongoDB Private Endpoint Connection ({private_link_id})"),
                    err,
                );
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
        let id = decode_state_id(diags, &state.id)?;
        let (Ok(project_id), Ok(private_link_id), Ok(provider_name)) = (
            id.get("project_id"),
            id.get("private_link_id"),
            id.get("provider_name"),
        ) else {
            diags.error_short("Invalid private endpoint id", AttributePath::new("id"));
            return None;
        };

        match client
            .delete_private_endpoint(project_id, provider_name, private_link_id)
            .await
        {
            Ok(()) => (),
            Err(err) if err.is_not_found() => return Some(()),
            Err(err) => {
                report(
                    diags,
                    format!("error deleting MongoDB Private Endpoint Connection ({private_link_id})"),
                    err,
                );
                return None;
            }
        }

        tracing::info!(private_link_id, "waiting for the private endpoint service to be destroyed");
        let client_ref = &client;
        match ENDPOINT_DELETED
            .wait_for(move || endpoint_status(client_ref, project_id, provider_name, private_link_id))
            .await
        {
            Ok(()) => Some(()),
            Err(err) => {
                report(
                    diags,
                    format!("error deleting MongoDB Private Endpoint Connection ({private_link_id})"),
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
        let (project_id, private_link_id, provider_name, region) = match parse_import_id(&id) {
            Ok(parts) => parts,
            Err(err) => {
                diags.root_error("Invalid import id", err.to_string());
                return None;
            }
        };

        let endpoint = match client
            .get_private_endpoint(project_id, provider_name, private_link_id)
            .await
        {
            Ok(endpoint) => endpoint,
            Err(err) => {
                report(
                    diags,
                    format!(
                        "couldn't import private endpoint {private_link_id} in project {project_id} with cloud provider name {provider_name}"
                    ),
                    err,
                );
                return None;
            }
        };

        let mut state = PrivateLinkEndpointState {
            id: string(
                StateId::new([
                    ("private_link_id", private_link_id),
                    ("project_id", project_id),
                    ("provider_name", provider_name),
                    ("region", region.as_str()),
                ])
                .encode(),
            ),
            project_id: string(project_id),
            provider_name: string(provider_name),
            region: string(region),
            ..Default::default()
        };
        state.apply(endpoint);
        Some((state, Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::client::mock::{MockReply, MockTransport};

    const SERVICES: &str = "/api/atlas/v1.0/groups/p1/privateEndpoint/endpointService";
    const SERVICE: &str = "/api/atlas/v1.0/groups/p1/privateEndpoint/AWS/endpointService/pl-1";

    fn resource(mock: &MockTransport) -> PrivateLinkEndpointResource {
        PrivateLinkEndpointResource::new(ClientHandle::with_client(AtlasClient::new(mock.clone())))
    }

    fn config() -> PrivateLinkEndpointState<'static> {
        PrivateLinkEndpointState {
            project_id: string("p1"),
            provider_name: string("AWS"),
            region: string("us-east-1"),
            ..Default::default()
        }
    }

    fn state_id() -> String {
        StateId::new([
            ("private_link_id", "pl-1"),
            ("project_id", "p1"),
            ("provider_name", "AWS"),
            ("region", "us-east-1"),
        ])
        .encode()
    }

    #[tokio::test(start_paused = true)]
    async fn create_waits_for_the_service() {
        let mock = MockTransport::default();
        mock.on(
            Method::POST,
            SERVICES,
            MockReply::Json(json!({"id": "pl-1", "status": "INITIATING"})),
        );
        mock.on(Method::GET, SERVICE, MockReply::Json(json!({"id": "pl-1", "status": "INITIATING"})));
        mock.on(
            Method::GET,
            SERVICE,
            MockReply::Json(json!({
                "id": "pl-1",
                "status": "AVAILABLE",
                "endpointServiceName": "com.amazonaws.vpce.us-east-1.vpce-svc-1",
                "interfaceEndpoints": ["vpce-1"]
            })),
        );
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let (plan, private) = resource
            .plan_create(&mut diags, config(), config(), Default::default())
            .await
            .unwrap();
        let (state, _) = resource
            .create(&mut diags, plan, config(), private, Default::default())
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(state.id, string(state_id()));
        assert_eq!(state.private_link_id, string("pl-1"));
        assert_eq!(state.status, string("AVAILABLE"));
        assert_eq!(state.interface_endpoints, Value::Value(vec![string("vpce-1")]));
        assert_eq!(state.private_endpoints, Value::Value(vec![]));
        assert!(state.private_link_service_name.is_null());
        assert_eq!(
            mock.calls()[0].body,
            Some(json!({"providerName": "AWS", "region": "us-east-1"}))
        );
    }

    #[tokio::test]
    async fn create_without_private_link_id_fails() {
        let mock = MockTransport::default();
        mock.on(Method::POST, SERVICES, MockReply::Json(json!({"status": "INITIATING"})));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let created = resource
            .create(&mut diags, config(), config(), Default::default(), Default::default())
            .await;
        assert!(created.is_none());
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn read_missing_endpoint_removes_it() {
        let mock = MockTransport::default();
        mock.on(Method::GET, SERVICE, MockReply::Status(404));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let state = PrivateLinkEndpointState {
            id: string(state_id()),
            private_link_id: string("pl-1"),
            ..config()
        };
        let read = resource
            .read(&mut diags, state, Default::default(), Default::default())
            .await;
        assert!(read.is_none());
        assert!(diags.errors.is_empty());
        assert_eq!(mock.count(Method::GET, SERVICE), 1);
    }

    #[tokio::test]
    async fn delete_of_missing_service_succeeds() {
        let mock = MockTransport::default();
        mock.on(Method::DELETE, SERVICE, MockReply::Status(404));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let state = PrivateLinkEndpointState {
            id: string(state_id()),
            ..config()
        };
        assert!(resource
            .destroy(&mut diags, state, Default::default())
            .await
            .is_some());
        assert!(diags.errors.is_empty());
        assert_eq!(mock.count(Method::GET, SERVICE), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_is_an_error() {
        let mock = MockTransport::default();
        mock.on(Method::DELETE, SERVICE, MockReply::Json(json!({})));
        mock.on(Method::GET, SERVICE, MockReply::Status(500));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let state = PrivateLinkEndpointState {
            id: string(state_id()),
            ..config()
        };
        assert!(resource
            .destroy(&mut diags, state, Default::default())
            .await
            .is_none());
        assert_eq!(diags.errors.len(), 1);
    }

    #[test]
    fn import_regions_keep_dashes() {
        assert_eq!(
            parse_import_id("p1-pl1-AWS-us-east-1").unwrap(),
            ("p1", "pl1", "AWS", "us-east-1".to_owned())
        );
        assert_eq!(
            parse_import_id("p1-pl1-AZURE-eastus2").unwrap(),
            ("p1", "pl1", "AZURE", "eastus2".to_owned())
        );
        assert_eq!(
            parse_import_id("p1-pl1-AWS").unwrap_err(),
            StateIdError::ImportFormat(IMPORT_FORMAT)
        );
        assert!(parse_import_id("p1-pl1-AWS-a-b-c-d").is_err());
    }
}
