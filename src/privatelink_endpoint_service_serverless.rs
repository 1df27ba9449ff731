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

//! Cloud side of a serverless private endpoint.
//!
//! The endpoint itself is reserved by `privatelink_endpoint_serverless`;
//! this resource records the AWS interface endpoint or Azure private
//! endpoint that connects to it.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeConstraint, AttributeType};
use tf_provider::value::{Value, ValueEmpty, ValueString};
use tf_provider::{AttributePath, Diagnostics, Resource, Schema};

use crate::client::models::ServerlessEndpoint;
use crate::client::{ApiError, AtlasClient, ClientHandle};
use crate::poll::StateChangeConf;
use crate::privatelink_endpoint_serverless::{endpoint_status, is_gone, PROVIDERS};
use crate::state_id::{decode_state_id, split_import_id, StateId};
use crate::utils::{
    attribute, fill, opt_string, push_if_changed, report, schema, string, unknown_if_null,
    validate_one_of, ValueExt, WithSchema,
};

const LINK_CREATED: StateChangeConf = StateChangeConf {
    pending: &["RESERVATION_REQUESTED", "INITIATING", "DELETING"],
    target: &["RESERVED", "FAILED", "DELETED", "AVAILABLE"],
    timeout: Duration::from_secs(2 * 60 * 60),
    min_interval: Duration::from_secs(5),
    delay: Duration::from_secs(5 * 60),
};

const INSTANCES_IDLE: StateChangeConf = StateChangeConf {
    pending: &["REPEATING", "PENDING"],
    target: &["IDLE", "DELETED"],
    timeout: Duration::from_secs(2 * 60 * 60),
    min_interval: Duration::from_secs(5),
    delay: Duration::from_secs(5 * 60),
};

/// `IDLE` once no serverless instance of the project is still applying a change
async fn instances_status(
    client: &AtlasClient,
    project_id: &str,
) -> Result<((), String), ApiError> {
    match client.list_serverless_instances(project_id).await {
        Ok(page) => {
            let busy = page
                .results
                .iter()
                .find(|instance| instance.state_name.as_deref() != Some("IDLE"));
            match busy {
                Some(instance) => {
                    tracing::debug!(
                        name = instance.name.as_deref().unwrap_or_default(),
                        "serverless instance is not idle yet"
                    );
                    Ok(((), "PENDING".to_owned()))
                }
                None => Ok(((), "IDLE".to_owned())),
            }
        }
        Err(ApiError::Transport(reason)) => {
            tracing::debug!(%reason, "serverless instance listing failed, retrying");
            Ok(((), "REPEATING".to_owned()))
        }
        Err(err) if err.is_not_found() => Ok(((), "DELETED".to_owned())),
        Err(err) if err.status() == Some(503) => Ok(((), "PENDING".to_owned())),
        Err(err) => Err(err),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivateLinkEndpointServiceServerlessState<'a> {
    pub id: ValueString<'a>,
    pub project_id: ValueString<'a>,
    pub instance_name: ValueString<'a>,
    pub endpoint_id: ValueString<'a>,
    pub provider_name: ValueString<'a>,
    pub comment: ValueString<'a>,
    pub cloud_provider_endpoint_id: ValueString<'a>,
    pub private_endpoint_ip_address: ValueString<'a>,
    pub private_link_service_resource_id: ValueString<'a>,
    pub status: ValueString<'a>,
}

impl<'a> PrivateLinkEndpointServiceServerlessState<'a> {
    fn apply(&mut self, endpoint: ServerlessEndpoint) {
        if endpoint.id.is_some() {
            self.endpoint_id = opt_string(endpoint.id);
        }
        self.comment = opt_string(endpoint.comment.filter(|comment| !comment.is_empty()));
        self.cloud_provider_endpoint_id = opt_string(endpoint.cloud_provider_endpoint_id);
        self.private_endpoint_ip_address = opt_string(endpoint.private_endpoint_ip_address);
        self.private_link_service_resource_id =
            opt_string(endpoint.private_link_service_resource_id);
        self.status = opt_string(endpoint.status);
    }

    fn computed_mut(&mut self) -> [&mut ValueString<'a>; 4] {
        [
            &mut self.cloud_provider_endpoint_id,
            &mut self.private_endpoint_ip_address,
            &mut self.private_link_service_resource_id,
            &mut self.status,
        ]
    }

    /// Empty comments are sent so that the `create` placeholder is cleared
    fn comment_request(&self) -> ServerlessEndpoint {
        ServerlessEndpoint {
            comment: Some(self.comment.as_str_or_empty().to_owned()),
            provider_name: self.provider_name.as_known_str().map(str::to_owned),
            ..Default::default()
        }
    }

    fn link_request(&self) -> ServerlessEndpoint {
        ServerlessEndpoint {
            cloud_provider_endpoint_id: self
                .cloud_provider_endpoint_id
                .as_known_str()
                .map(str::to_owned),
            private_endpoint_ip_address: self
                .private_endpoint_ip_address
                .as_known_str()
                .map(str::to_owned),
            ..self.comment_request()
        }
    }
}

impl<'a> WithSchema for PrivateLinkEndpointServiceServerlessState<'a> {
    fn schema() -> Schema {
        let required = |description| {
            attribute(AttributeType::String, AttributeConstraint::Required, description)
        };
        let optional_computed = |description| {
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
            "Cloud endpoint linked to a serverless private endpoint",
            [
                ("id", computed("Composite identifier of the link")),
                ("project_id", required("Project hosting the serverless instance")),
                ("instance_name", required("Name of the serverless instance")),
                ("endpoint_id", required("Atlas identifier of the serverless endpoint")),
                ("provider_name", required("Cloud provider: AWS or AZURE")),
                (
                    "comment",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::Optional,
                        "Free-form comment on the endpoint",
                    ),
                ),
                (
                    "cloud_provider_endpoint_id",
                    optional_computed("Identifier of the endpoint on the cloud provider"),
                ),
                (
                    "private_endpoint_ip_address",
                    optional_computed("IP address of the Azure private endpoint"),
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
pub struct PrivateLinkEndpointServiceServerlessResource {
    client: ClientHandle,
}

impl PrivateLinkEndpointServiceServerlessResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

fn link_ids<'s>(diags: &mut Diagnostics, id: &'s StateId) -> Option<(&'s str, &'s str, &'s str)> {
    match (
        id.get("project_id"),
        id.get("instance_name"),
        id.get("endpoint_id"),
    ) {
        (Ok(project_id), Ok(instance_name), Ok(endpoint_id)) => {
            Some((project_id, instance_name, endpoint_id))
        }
        _ => {
            diags.error_short("Invalid serverless endpoint link id", AttributePath::new("id"));
            None
        }
    }
}

#[async_trait]
impl Resource for PrivateLinkEndpointServiceServerlessResource {
    type State<'a> = PrivateLinkEndpointServiceServerlessState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(PrivateLinkEndpointServiceServerlessState::schema())
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
        let (project_id, instance_name, endpoint_id) = link_ids(diags, &id)?;

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
                tracing::info!(endpoint_id, "serverless endpoint is gone, removing its link from state");
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
        state.private_link_service_resource_id = Value::Unknown;
        state.status = Value::Unknown;
        unknown_if_null(&mut state.cloud_provider_endpoint_id);
        unknown_if_null(&mut state.private_endpoint_ip_address);
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
            ("instance_name", &prior_state.instance_name, &proposed_state.instance_name),
            ("endpoint_id", &prior_state.endpoint_id, &proposed_state.endpoint_id),
            ("provider_name", &prior_state.provider_name, &proposed_state.provider_name),
            (
                "cloud_provider_endpoint_id",
                &prior_state.cloud_provider_endpoint_id,
                &proposed_state.cloud_provider_endpoint_id,
            ),
            (
                "private_endpoint_ip_address",
                &prior_state.private_endpoint_ip_address,
                &proposed_state.private_endpoint_ip_address,
            ),
        ] {
            push_if_changed(&mut replace, name, prior, proposed);
        }

        let state = PrivateLinkEndpointServiceServerlessState {
            id: prior_state.id,
            private_link_service_resource_id: prior_state.private_link_service_resource_id,
            status: prior_state.status,
            ..proposed_state
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
        let endpoint_id = state.endpoint_id.as_str_or_empty().to_owned();

        if let Err(err) = client
            .get_serverless_endpoint(&project_id, &instance_name, &endpoint_id)
            .await
        {
            report(
                diags,
                "error getting Serverless PrivateLink Endpoint Information",
                err,
            );
            return None;
        }

        if let Err(err) = client
            .update_serverless_endpoint(&project_id, &instance_name, &endpoint_id, &state.link_request())
            .await
        {
            report(
                diags,
                format!("error adding MongoDB Serverless PrivateLink Endpoint Connection({endpoint_id})"),
                err,
            );
            return None;
        }

        let client_ref = &client;
        let (project_ref, instance_ref, endpoint_ref) =
            (project_id.as_str(), instance_name.as_str(), endpoint_id.as_str());
        if let Err(err) = LINK_CREATED
            .wait_for(move || endpoint_status(client_ref, project_ref, instance_ref, endpoint_ref))
            .await
        {
            report(
                diags,
                format!("error adding MongoDB Serverless PrivateLink Endpoint Connection({endpoint_id})"),
                err,
            );
            return None;
        }

        // the link is in place even if the instances take longer to settle
        if let Err(err) = INSTANCES_IDLE
            .wait_for(move || instances_status(client_ref, project_ref))
            .await
        {
            tracing::warn!(%err, %project_id, "error awaiting serverless instance list status IDLE");
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
        remote.apply(endpoint);
        for (slot, value) in state.computed_mut().into_iter().zip(remote.computed_mut()) {
            fill(slot, value.clone());
        }
        Some((state, private_state))
    }

    async fn update<'a>(
        &self,
        diags: &mut Diagnostics,
        prior_state: Self::State<'a>,
        planned_state: Self::State<'a>,
        _config_state: Self::State<'a>,
        private_state: Self::PrivateState<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        if planned_state.comment == prior_state.comment {
            return Some((planned_state, private_state));
        }

        let client = self.client.get(diags).await?;
        let id = decode_state_id(diags, &planned_state.id)?;
        let (project_id, instance_name, endpoint_id) = link_ids(diags, &id)?;

        // every other attribute forces a replacement
        match client
            .update_serverless_endpoint(
                project_id,
                instance_name,
                endpoint_id,
                &planned_state.comment_request(),
            )
            .await
        {
            Ok(_) => Some((planned_state, private_state)),
            Err(err) => {
                report(
                    diags,
                    format!("error updating MongoDB Serverless PrivateLink Endpoint Connection({endpoint_id})"),
                    err,
                );
                None
            }
        }
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let client = self.client.get(diags).await?;
        let id = decode_state_id(diags, &state.id)?;
        let (project_id, instance_name, endpoint_id) = link_ids(diags, &id)?;

        match client
            .get_serverless_endpoint(project_id, instance_name, endpoint_id)
            .await
        {
            Ok(_) => {
                tracing::info!(
                    endpoint_id,
                    "link is released when its serverless private endpoint is deleted"
                );
                Some(())
            }
            Err(err) if is_gone(&err) => Some(()),
            Err(err) => {
                report(
                    diags,
                    format!("error deleting MongoDB Serverless PrivateLink Endpoint Connection({endpoint_id})"),
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
        let mut state = PrivateLinkEndpointServiceServerlessState {
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
            endpoint_id: string(endpoint_id),
            provider_name: string(provider_name),
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

    const ENDPOINT: &str =
        "/api/atlas/v1.0/groups/p1/privateEndpoint/serverless/instance/i1/endpoint/e1";
    const INSTANCES: &str = "/api/atlas/v1.0/groups/p1/serverless";

    fn resource(mock: &MockTransport) -> PrivateLinkEndpointServiceServerlessResource {
        PrivateLinkEndpointServiceServerlessResource::new(ClientHandle::with_client(
            AtlasClient::new(mock.clone()),
        ))
    }

    fn config() -> PrivateLinkEndpointServiceServerlessState<'static> {
        PrivateLinkEndpointServiceServerlessState {
            project_id: string("p1"),
            instance_name: string("i1"),
            endpoint_id: string("e1"),
            provider_name: string("AWS"),
            comment: string("app servers"),
            cloud_provider_endpoint_id: string("vpce-1"),
            ..Default::default()
        }
    }

    fn stored_state() -> PrivateLinkEndpointServiceServerlessState<'static> {
        PrivateLinkEndpointServiceServerlessState {
            id: string(
                StateId::new([
                    ("project_id", "p1"),
                    ("instance_name", "i1"),
                    ("endpoint_id", "e1"),
                ])
                .encode(),
            ),
            status: string("AVAILABLE"),
            ..config()
        }
    }

    fn instances(state_name: &str) -> MockReply {
        MockReply::Json(json!({"results": [{"name": "i1", "stateName": state_name}]}))
    }

    #[tokio::test(start_paused = true)]
    async fn create_links_the_cloud_endpoint() {
        let mock = MockTransport::default();
        mock.on(
            Method::GET,
            ENDPOINT,
            MockReply::Json(json!({"_id": "e1", "status": "RESERVED", "comment": "create"})),
        );
        mock.on(
            Method::GET,
            ENDPOINT,
            MockReply::Json(json!({"_id": "e1", "status": "INITIATING"})),
        );
        mock.on(
            Method::GET,
            ENDPOINT,
            MockReply::Json(json!({
                "_id": "e1",
                "status": "AVAILABLE",
                "comment": "app servers",
                "cloudProviderEndpointId": "vpce-1",
                "providerName": "AWS"
            })),
        );
        mock.on(
            Method::PATCH,
            ENDPOINT,
            MockReply::Json(json!({"_id": "e1", "status": "INITIATING"})),
        );
        mock.on(Method::GET, INSTANCES, instances("UPDATING"));
        mock.on(Method::GET, INSTANCES, instances("IDLE"));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let (plan, private) = resource
            .plan_create(&mut diags, config(), config(), Default::default())
            .await
            .unwrap();
        assert!(plan.status.is_unknown());
        assert!(plan.private_endpoint_ip_address.is_unknown());
        assert_eq!(plan.cloud_provider_endpoint_id, string("vpce-1"));

        let (state, _) = resource
            .create(&mut diags, plan, config(), private, Default::default())
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(state.id, stored_state().id);
        assert_eq!(state.status, string("AVAILABLE"));
        assert!(state.private_endpoint_ip_address.is_null());
        assert!(state.private_link_service_resource_id.is_null());
        assert_eq!(mock.count(Method::GET, INSTANCES), 2);

        let patch = mock
            .calls()
            .into_iter()
            .find(|call| call.method == Method::PATCH)
            .unwrap();
        assert_eq!(
            patch.body,
            Some(json!({
                "comment": "app servers",
                "cloudProviderEndpointId": "vpce-1",
                "providerName": "AWS"
            }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn busy_instances_do_not_fail_the_link() {
        let mock = MockTransport::default();
        mock.on(
            Method::GET,
            ENDPOINT,
            MockReply::Json(json!({"_id": "e1", "status": "AVAILABLE"})),
        );
        mock.on(Method::PATCH, ENDPOINT, MockReply::Json(json!({"_id": "e1"})));
        mock.on(Method::GET, INSTANCES, MockReply::Status(500));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let (plan, private) = resource
            .plan_create(&mut diags, config(), config(), Default::default())
            .await
            .unwrap();
        assert!(resource
            .create(&mut diags, plan, config(), private, Default::default())
            .await
            .is_some());
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn create_requires_a_reserved_endpoint() {
        let mock = MockTransport::default();
        mock.on(Method::GET, ENDPOINT, MockReply::Status(404));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let created = resource
            .create(&mut diags, config(), config(), Default::default(), Default::default())
            .await;
        assert!(created.is_none());
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(mock.count(Method::PATCH, ENDPOINT), 0);
    }

    #[tokio::test]
    async fn only_comment_changes_in_place() {
        let resource = PrivateLinkEndpointServiceServerlessResource::default();

        let mut diags = Diagnostics::default();
        let proposed = PrivateLinkEndpointServiceServerlessState {
            comment: string("renamed"),
            status: Value::Unknown,
            ..stored_state()
        };
        let (plan, _, replace) = resource
            .plan_update(
                &mut diags,
                stored_state(),
                proposed.clone(),
                proposed,
                Default::default(),
                Default::default(),
            )
            .await
            .unwrap();
        assert!(replace.is_empty());
        assert_eq!(plan.status, string("AVAILABLE"));

        let proposed = PrivateLinkEndpointServiceServerlessState {
            cloud_provider_endpoint_id: string("vpce-2"),
            ..stored_state()
        };
        let (_, _, replace) = resource
            .plan_update(
                &mut diags,
                stored_state(),
                proposed.clone(),
                proposed,
                Default::default(),
                Default::default(),
            )
            .await
            .unwrap();
        assert_eq!(replace, [AttributePath::new("cloud_provider_endpoint_id")]);
    }

    #[tokio::test]
    async fn update_patches_the_comment() {
        let mock = MockTransport::default();
        mock.on(Method::PATCH, ENDPOINT, MockReply::Json(json!({"_id": "e1"})));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let planned = PrivateLinkEndpointServiceServerlessState {
            comment: Value::Null,
            ..stored_state()
        };
        let (state, _) = resource
            .update(
                &mut diags,
                stored_state(),
                planned.clone(),
                planned,
                Default::default(),
                Default::default(),
            )
            .await
            .unwrap();
        assert!(state.comment.is_null());
        assert_eq!(
            mock.calls()[0].body,
            Some(json!({"comment": "", "providerName": "AWS"}))
        );
    }

    #[tokio::test]
    async fn read_missing_link_removes_it() {
        let mock = MockTransport::default();
        mock.on(Method::GET, ENDPOINT, MockReply::Status(404));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        assert!(resource
            .read(&mut diags, stored_state(), Default::default(), Default::default())
            .await
            .is_none());
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn delete_leaves_the_endpoint_alone() {
        let mock = MockTransport::default();
        mock.on(
            Method::GET,
            ENDPOINT,
            MockReply::Json(json!({"_id": "e1", "status": "AVAILABLE"})),
        );
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        assert!(resource
            .destroy(&mut diags, stored_state(), Default::default())
            .await
            .is_some());
        assert_eq!(mock.calls().len(), 1);
        assert_eq!(mock.count(Method::DELETE, ENDPOINT), 0);
    }

    #[tokio::test]
    async fn import_reads_the_link() {
        let mock = MockTransport::default();
        mock.on(
            Method::GET,
            ENDPOINT,
            MockReply::Json(json!({
                "_id": "e1",
                "status": "AVAILABLE",
                "comment": "",
                "cloudProviderEndpointId": "vpce-1"
            })),
        );
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .import(&mut diags, "p1--i1--e1".to_owned())
            .await
            .unwrap();
        assert_eq!(state.id, stored_state().id);
        assert_eq!(state.provider_name, string("AWS"));
        assert_eq!(state.cloud_provider_endpoint_id, string("vpce-1"));
        assert!(state.comment.is_null());
    }
}
