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
use tf_provider::value::{Value, ValueEmpty, ValueString};
use tf_provider::{schema::Schema, AttributePath, Diagnostics, Resource};

use crate::client::models::Container;
use crate::client::{ApiError, AtlasClient, ClientHandle};
use crate::poll::StateChangeConf;
use crate::regions::atlas_region;
use crate::state_id::{decode_state_id, split_import_id, StateId};
use crate::utils::{
    fill, known_strings, push_if_changed, report, string, unknown_if_null, validate_one_of,
    ValueExt, WithSchema,
};

use super::{NetworkContainerState, DEFAULT_PROVIDER, PROVIDERS};

const CONTAINER_DELETED: StateChangeConf = StateChangeConf {
    pending: &["provisioned_container"],
    target: &["deleted"],
    timeout: Duration::from_secs(60 * 60),
    min_interval: Duration::from_secs(10),
    delay: Duration::from_secs(2 * 60),
};

#[derive(Debug, Default, Clone)]
pub struct NetworkContainerResource {
    client: ClientHandle,
}

impl NetworkContainerResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

/// Deletes the container as soon as no cluster uses it anymore
async fn delete_when_unused(
    client: &AtlasClient,
    project_id: &str,
    container_id: &str,
) -> Result<((), String), ApiError> {
    let container = match client.get_container(project_id, container_id).await {
        Ok(container) => container,
        Err(err) if err.is_not_found() => return Ok(((), "deleted".to_owned())),
        Err(err) => return Err(err),
    };
    if container.provisioned == Some(true) {
        return Ok(((), "provisioned_container".to_owned()));
    }

    // Atlas answers 409 CONTAINERS_IN_USE while peers are still being removed
    match client.delete_container(project_id, container_id).await {
        Ok(()) => Ok(((), "deleted".to_owned())),
        Err(err) => {
            tracing::debug!(%err, container_id, "container not deleted yet");
            Ok(((), "provisioned_container".to_owned()))
        }
    }
}

impl<'a> NetworkContainerState<'a> {
    fn provider(&self) -> &str {
        self.provider_name.as_known_str().unwrap_or(DEFAULT_PROVIDER)
    }

    /// Request body carrying the region field of the configured provider
    fn request(&self) -> Container {
        let provider = self.provider().to_owned();
        let mut container = Container {
            atlas_cidr_block: self.atlas_cidr_block.as_known_str().map(str::to_owned),
            ..Default::default()
        };
        match provider.as_str() {
            "AWS" => {
                container.region_name = self
                    .region_name
                    .as_known_str()
                    .and_then(atlas_region)
                    .map(str::to_owned)
            }
            "AZURE" => {
                container.region = self
                    .region
                    .as_known_str()
                    .and_then(atlas_region)
                    .map(str::to_owned)
            }
            "GCP" => {
                let regions = known_strings(&self.regions);
                if !regions.is_empty() {
                    container.regions = Some(regions);
                }
            }
            _ => (),
        }
        container.provider_name = Some(provider);
        container
    }
}

fn validate_region(diags: &mut Diagnostics, name: &str, value: &ValueString<'_>, provider: &str) {
    match value {
        Value::Unknown => (),
        Value::Value(region) if !region.is_empty() => {
            if atlas_region(region).is_none() {
                diags.error(
                    format!("Invalid `{name}`"),
                    format!("`{region}` is not a known Atlas region"),
                    AttributePath::new(name.to_owned()),
                );
            }
        }
        _ => {
            diags.error_short(
                format!("`{name}` must be set when `provider_name` is {provider}"),
                AttributePath::new(name.to_owned()),
            );
        }
    }
}

#[async_trait]
impl Resource for NetworkContainerResource {
    type State<'a> = NetworkContainerState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(NetworkContainerState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_one_of(diags, "provider_name", &config.provider_name, PROVIDERS);
        if !config.provider_name.is_unknown() {
            match config.provider() {
                "AWS" => validate_region(diags, "region_name", &config.region_name, "AWS"),
                "AZURE" => validate_region(diags, "region", &config.region, "AZURE"),
                _ => (),
            }
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
        let id = decode_state_id(diags, &state.id)?;
        let (Ok(project_id), Ok(container_id)) = (id.get("project_id"), id.get("container_id"))
        else {
            diags.error_short("Invalid network container id", AttributePath::new("id"));
            return None;
        };

        match client.get_container(project_id, container_id).await {
            Ok(container) => {
                let mut state = state;
                state.project_id = string(project_id);
                state.apply(container);
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                tracing::info!(container_id, "network container is gone, removing it from state");
                None
            }
            Err(err) => {
                report(
                    diags,
                    format!("error reading MongoDB Network Container ({container_id})"),
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
        if state.provider_name.is_null() {
            state.provider_name = string(DEFAULT_PROVIDER);
        }
        state.id = Value::Unknown;
        state.container_id = Value::Unknown;
        unknown_if_null(&mut state.region_name);
        unknown_if_null(&mut state.region);
        unknown_if_null(&mut state.regions);
        unknown_if_null(&mut state.azure_subscription_id);
        unknown_if_null(&mut state.provisioned);
        unknown_if_null(&mut state.gcp_project_id);
        unknown_if_null(&mut state.network_name);
        unknown_if_null(&mut state.vpc_id);
        unknown_if_null(&mut state.vnet_name);
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
        let mut state = proposed_state;
        if state.provider_name.is_null() {
            state.provider_name = string(DEFAULT_PROVIDER);
        }
        state.id = prior_state.id.clone();
        state.container_id = prior_state.container_id.clone();

        let mut replace = Vec::new();
        push_if_changed(&mut replace, "project_id", &prior_state.project_id, &state.project_id);

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

        let created = match client.create_container(&project_id, &state.request()).await {
            Ok(container) => container,
            Err(err) => {
                report(diags, "error creating MongoDB Network Container", err);
                return None;
            }
        };
        let Some(container_id) = created.id else {
            diags.root_error(
                "error creating MongoDB Network Container",
                "Atlas did not return the identifier of the new container",
            );
            return None;
        };
        state.id = string(
            StateId::new([
                ("project_id", project_id.as_str()),
                ("container_id", container_id.as_str()),
            ])
            .encode(),
        );

        let container = match client.get_container(&project_id, &container_id).await {
            Ok(container) => container,
            Err(err) => {
                report(
                    diags,
                    format!("error reading MongoDB Network Container ({container_id})"),
                    err,
                );
                return None;
            }
        };
        let mut remote = state.clone();
        remote.apply(container);
        fill(&mut state.container_id, remote.container_id);
        fill(&mut state.region_name, remote.region_name);
        fill(&mut state.region, remote.region);
        fill(&mut state.regions, remote.regions);
        fill(&mut state.azure_subscription_id, remote.azure_subscription_id);
        fill(&mut state.provisioned, remote.provisioned);
        fill(&mut state.gcp_project_id, remote.gcp_project_id);
        fill(&mut state.network_name, remote.network_name);
        fill(&mut state.vpc_id, remote.vpc_id);
        fill(&mut state.vnet_name, remote.vnet_name);

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
        let client = self.client.get(diags).await?;
        let mut state = planned_state;
        let project_id = state.project_id.as_str_or_empty().to_owned();
        let container_id = state.container_id.as_str_or_empty().to_owned();

        let changed = state.provider_name != prior_state.provider_name
            || state.atlas_cidr_block != prior_state.atlas_cidr_block
            || state.region_name != prior_state.region_name
            || state.region != prior_state.region
            || state.regions != prior_state.regions;
        if changed {
            if let Err(err) = client
                .update_container(&project_id, &container_id, &state.request())
                .await
            {
                report(
                    diags,
                    format!("error updating MongoDB Network Container ({container_id})"),
                    err,
                );
                return None;
            }
        }

        match client.get_container(&project_id, &container_id).await {
            Ok(container) => {
                let mut remote = state.clone();
                remote.apply(container);
                state.provisioned = remote.provisioned;
                fill(&mut state.region_name, remote.region_name);
                fill(&mut state.region, remote.region);
                fill(&mut state.regions, remote.regions);
                Some((state, private_state))
            }
            Err(err) => {
                report(
                    diags,
                    format!("error reading MongoDB Network Container ({container_id})"),
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
        let (Ok(project_id), Ok(container_id)) = (id.get("project_id"), id.get("container_id"))
        else {
            diags.error_short("Invalid network container id", AttributePath::new("id"));
            return None;
        };

        tracing::info!(container_id, "waiting for the network container to be deleted");
        let client = &client;
        match CONTAINER_DELETED
            .wait_for(move || delete_when_unused(client, project_id, container_id))
            .await
        {
            Ok(()) => Some(()),
            Err(err) => {
                report(
                    diags,
                    format!("error deleting MongoDB Network Container ({container_id})"),
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
        let [project_id, container_id] =
            match split_import_id::<2>(&id, "-", "{project_id}-{container_id}") {
                Ok(parts) => parts,
                Err(err) => {
                    diags.root_error("Invalid import id", err.to_string());
                    return None;
                }
            };

        let container = match client.get_container(project_id, container_id).await {
            Ok(container) => container,
            Err(err) => {
                report(
                    diags,
                    format!("couldn't import container {container_id} in project {project_id}"),
                    err,
                );
                return None;
            }
        };

        let mut state = NetworkContainerState {
            id: string(
                StateId::new([("project_id", project_id), ("container_id", container_id)])
                    .encode(),
            ),
            project_id: string(project_id),
            ..Default::default()
        };
        state.apply(container);
        Some((state, Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::client::mock::{MockReply, MockTransport};

    const CONTAINER: &str = "/api/atlas/v1.0/groups/p1/containers/c1";

    fn resource(mock: &MockTransport) -> NetworkContainerResource {
        NetworkContainerResource::new(ClientHandle::with_client(AtlasClient::new(mock.clone())))
    }

    fn remote() -> serde_json::Value {
        json!({
            "id": "c1",
            "atlasCidrBlock": "10.8.0.0/21",
            "providerName": "AWS",
            "regionName": "US_EAST_1",
            "provisioned": false,
            "vpcId": "vpc-0123"
        })
    }

    fn state_id() -> String {
        StateId::new([("project_id", "p1"), ("container_id", "c1")]).encode()
    }

    fn config() -> NetworkContainerState<'static> {
        NetworkContainerState {
            project_id: string("p1"),
            atlas_cidr_block: string("10.8.0.0/21"),
            region_name: string("us-east-1"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_without_container_id_fails() {
        let mock = MockTransport::default();
        mock.on(
            Method::POST,
            "/api/atlas/v1.0/groups/p1/containers",
            MockReply::Json(json!({"atlasCidrBlock": "10.8.0.0/21"})),
        );
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
    async fn create_then_read() {
        let mock = MockTransport::default();
        mock.on(
            Method::POST,
            "/api/atlas/v1.0/groups/p1/containers",
            MockReply::Json(remote()),
        );
        mock.on(Method::GET, CONTAINER, MockReply::Json(remote()));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let (plan, private) = resource
            .plan_create(&mut diags, config(), config(), Default::default())
            .await
            .unwrap();
        assert_eq!(plan.provider_name, string("AWS"));
        assert!(plan.vpc_id.is_unknown());

        let (state, private) = resource
            .create(&mut diags, plan, config(), private, Default::default())
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(state.id, string(state_id()));
        assert_eq!(state.container_id, string("c1"));
        assert_eq!(state.vpc_id, string("vpc-0123"));
        assert_eq!(state.provisioned, Value::Value(false));
        assert_eq!(state.region_name, string("us-east-1"));
        assert!(state.vnet_name.is_null());

        let post = &mock.calls()[0];
        assert_eq!(
            post.body,
            Some(json!({
                "atlasCidrBlock": "10.8.0.0/21",
                "providerName": "AWS",
                "regionName": "US_EAST_1"
            }))
        );

        let (read, _) = resource
            .read(&mut diags, state.clone(), private, Default::default())
            .await
            .unwrap();
        assert_eq!(read, state);
    }

    #[tokio::test]
    async fn read_missing_container_removes_it() {
        let mock = MockTransport::default();
        mock.on(Method::GET, CONTAINER, MockReply::Status(404));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let state = NetworkContainerState {
            id: string(state_id()),
            ..config()
        };
        let read = resource
            .read(&mut diags, state, Default::default(), Default::default())
            .await;
        assert!(read.is_none());
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn region_required_for_provider() {
        let resource = NetworkContainerResource::default();

        let mut diags = Diagnostics::default();
        let aws = NetworkContainerState {
            region_name: Value::Null,
            ..config()
        };
        assert!(resource.validate(&mut diags, aws).await.is_none());
        assert_eq!(diags.errors.len(), 1);

        let mut diags = Diagnostics::default();
        let azure = NetworkContainerState {
            provider_name: string("AZURE"),
            region: string("atlantis"),
            ..config()
        };
        assert!(resource.validate(&mut diags, azure).await.is_none());

        let mut diags = Diagnostics::default();
        let gcp = NetworkContainerState {
            provider_name: string("GCP"),
            region_name: Value::Null,
            ..config()
        };
        assert!(resource.validate(&mut diags, gcp).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn delete_retries_until_unused() {
        let mock = MockTransport::default();
        mock.on(
            Method::GET,
            CONTAINER,
            MockReply::Json(json!({"id": "c1", "provisioned": true})),
        );
        mock.on(
            Method::GET,
            CONTAINER,
            MockReply::Json(json!({"id": "c1", "provisioned": false})),
        );
        mock.on(Method::DELETE, CONTAINER, MockReply::Status(409));
        mock.on(Method::DELETE, CONTAINER, MockReply::Json(json!(null)));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let state = NetworkContainerState {
            id: string(state_id()),
            ..config()
        };
        resource
            .destroy(&mut diags, state, Default::default())
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(mock.count(Method::GET, CONTAINER), 3);
        assert_eq!(mock.count(Method::DELETE, CONTAINER), 2);
    }

    #[tokio::test]
    async fn import_by_project_and_container() {
        let mock = MockTransport::default();
        mock.on(Method::GET, CONTAINER, MockReply::Json(remote()));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .import(&mut diags, "p1-c1".to_owned())
            .await
            .unwrap();
        assert_eq!(state.id, string(state_id()));
        assert_eq!(state.provider_name, string("AWS"));
        assert_eq!(state.atlas_cidr_block, string("10.8.0.0/21"));

        let mut diags = Diagnostics::default();
        assert!(resource.import(&mut diags, "p1".to_owned()).await.is_none());
        assert_eq!(diags.errors.len(), 1);
    }
}
