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
use tf_provider::value::{Value, ValueEmpty};
use tf_provider::{schema::Schema, AttributePath, Diagnostics, Resource};

use crate::client::models::{Project, ProjectSettings};
use crate::client::{ApiError, AtlasClient, ClientHandle};
use crate::poll::StateChangeConf;
use crate::utils::{
    fill, known_bool, push_if_changed, report, string, unknown_if_null, ValueExt, WithSchema,
};

use super::{ProjectState, DEFAULT_ALERTS_SETTINGS};

const DEPENDENTS_DELETED: StateChangeConf = StateChangeConf {
    pending: &["DELETING", "RETRY"],
    target: &["IDLE"],
    timeout: Duration::from_secs(30 * 60),
    min_interval: Duration::from_secs(30),
    delay: Duration::ZERO,
};

#[derive(Debug, Default, Clone)]
pub struct ProjectResource {
    client: ClientHandle,
}

impl ProjectResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

/// Fetches a project along with its settings
pub(super) async fn fetch(
    client: &AtlasClient,
    project_id: &str,
) -> Result<(Project, ProjectSettings), ApiError> {
    futures::try_join!(
        client.get_project(project_id),
        client.get_project_settings(project_id)
    )
}

/// A project cannot be deleted while its clusters are still being torn down
async fn dependents_status(client: &AtlasClient, project_id: &str) -> Result<((), String), ApiError> {
    match client.list_advanced_clusters(project_id).await {
        Ok(clusters) => {
            let deleting = !clusters.results.is_empty()
                && clusters
                    .results
                    .iter()
                    .all(|cluster| cluster.state_name.as_deref() == Some("DELETING"));
            let status = if deleting { "DELETING" } else { "IDLE" };
            Ok(((), status.to_owned()))
        }
        Err(ApiError::Transport(err)) => {
            tracing::debug!(%err, project_id, "retrying cluster listing");
            Ok(((), "RETRY".to_owned()))
        }
        Err(err) => Err(err),
    }
}

#[async_trait]
impl Resource for ProjectResource {
    type State<'a> = ProjectState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ProjectState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        if let Some(name) = config.name.as_known_str() {
            if name.trim().is_empty() {
                diags.error_short("`name` cannot be blank", AttributePath::new("name"));
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
        let project_id = state.id.as_str_or_empty().to_owned();

        match fetch(&client, &project_id).await {
            Ok((project, settings)) => {
                let mut state = state;
                state.apply(project, &settings);
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                tracing::info!(%project_id, "project is gone, removing it from state");
                None
            }
            Err(err) => {
                report(diags, "error getting project", err);
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
        state.cluster_count = Value::Unknown;
        state.created = Value::Unknown;
        unknown_if_null(&mut state.with_default_alerts_settings);
        for flag in state.flags_mut() {
            unknown_if_null(flag);
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
        let mut state = proposed_state;
        state.id = prior_state.id.clone();
        state.created = prior_state.created.clone();
        state.cluster_count = prior_state.cluster_count.clone();
        for (flag, prior) in state.flags_mut().into_iter().zip(prior_state.flags()) {
            if flag.is_null() {
                *flag = prior.clone();
            }
        }

        let mut replace = Vec::new();
        push_if_changed(&mut replace, "org_id", &prior_state.org_id, &state.org_id);
        push_if_changed(
            &mut replace,
            "project_owner_id",
            &prior_state.project_owner_id,
            &state.project_owner_id,
        );
        push_if_changed(
            &mut replace,
            "region_usage_restrictions",
            &prior_state.region_usage_restrictions,
            &state.region_usage_restrictions,
        );

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

        let request = Project {
            name: state.name.as_known_str().map(str::to_owned),
            org_id: state.org_id.as_known_str().map(str::to_owned),
            with_default_alerts_settings: known_bool(&state.with_default_alerts_settings),
            region_usage_restrictions: state.region_usage_restrictions.as_known_str().map(str::to_owned),
            ..Default::default()
        };
        let project = match client
            .create_project(&request, state.project_owner_id.as_known_str())
            .await
        {
            Ok(project) => project,
            Err(err) => {
                report(diags, "error creating project", err);
                return None;
            }
        };
        let Some(project_id) = project.id.clone() else {
            diags.root_error(
                "error creating project",
                "Atlas did not return the identifier of the new project",
            );
            return None;
        };

        let settings = async {
            let mut settings = client.get_project_settings(&project_id).await?;
            state.merge_settings(&mut settings);
            client.update_project_settings(&project_id, &settings).await
        };
        if let Err(err) = settings.await {
            if let Err(rollback) = client.delete_project(&project_id).await {
                tracing::warn!(%rollback, %project_id, "could not delete project after failed settings update");
            }
            report(diags, "error updating project settings", err);
            return None;
        }

        let (project, settings) = match fetch(&client, &project_id).await {
            Ok(fetched) => fetched,
            Err(err) => {
                report(diags, "error getting project", err);
                return None;
            }
        };

        let mut remote = state.clone();
        remote.apply(project, &settings);
        state.id = string(project_id);
        fill(&mut state.cluster_count, remote.cluster_count.clone());
        fill(&mut state.created, remote.created.clone());
        fill(
            &mut state.with_default_alerts_settings,
            Value::Value(
                known_bool(&remote.with_default_alerts_settings).unwrap_or(DEFAULT_ALERTS_SETTINGS),
            ),
        );
        for (flag, remote) in state.flags_mut().into_iter().zip(remote.flags()) {
            fill(flag, remote.clone());
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
        let client = self.client.get(diags).await?;
        let mut state = planned_state;
        let project_id = state.id.as_str_or_empty().to_owned();

        if state.name != prior_state.name {
            if let Err(err) = client
                .rename_project(&project_id, state.name.as_str_or_empty())
                .await
            {
                report(diags, "error updating project name", err);
                return None;
            }
        }

        if state.settings_changed(&prior_state) {
            let settings = async {
                let mut settings = client.get_project_settings(&project_id).await?;
                state.merge_settings(&mut settings);
                client.update_project_settings(&project_id, &settings).await
            };
            if let Err(err) = settings.await {
                report(diags, "error updating project settings", err);
                return None;
            }
        }

        match fetch(&client, &project_id).await {
            Ok((project, settings)) => {
                let mut remote = state.clone();
                remote.apply(project, &settings);
                // cluster_count was planned from the prior state and refreshes on the next read
                for (flag, remote) in state.flags_mut().into_iter().zip(remote.flags()) {
                    fill(flag, remote.clone());
                }
            }
            Err(err) => {
                report(diags, "error getting project", err);
                return None;
            }
        }

        Some((state, private_state))
    }

    async fn destroy<'a>(
        &self,
        diags: &mut Diagnostics,
        state: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<()> {
        let client = self.client.get(diags).await?;
        let project_id = state.id.as_str_or_empty();

        tracing::info!(project_id, "waiting for the project clusters to be deleted");
        let client_ref = &client;
        if let Err(err) = DEPENDENTS_DELETED
            .wait_for(move || dependents_status(client_ref, project_id))
            .await
        {
            tracing::warn!(%err, project_id, "could not wait for the project clusters, deleting anyway");
        }

        if let Err(err) = client.delete_project(project_id).await {
            report(diags, "error deleting project", err);
            return None;
        }
        Some(())
    }

    async fn import<'a>(
        &self,
        _diags: &mut Diagnostics,
        id: String,
    ) -> Option<(Self::State<'a>, Self::PrivateState<'a>)> {
        let state = ProjectState {
            id: string(id),
            ..Default::default()
        };
        Some((state, Default::default()))
    }
}

#[cfg(test)]
mod tests {
    use reqwest::Method;
    use serde_json::json;

    use super::*;
    use crate::client::mock::{MockReply, MockTransport};

    const PROJECT: &str = "/api/atlas/v1.0/groups/p1";
    const SETTINGS: &str = "/api/atlas/v1.0/groups/p1/settings";
    const CLUSTERS: &str = "/api/atlas/v1.5/groups/p1/clusters";

    fn resource(mock: &MockTransport) -> ProjectResource {
        ProjectResource::new(ClientHandle::with_client(AtlasClient::new(mock.clone())))
    }

    fn remote_project() -> serde_json::Value {
        json!({
            "id": "p1",
            "name": "analytics",
            "orgId": "o1",
            "clusterCount": 0,
            "created": "2024-03-01T10:00:00Z"
        })
    }

    fn remote_settings() -> serde_json::Value {
        json!({
            "isCollectDatabaseSpecificsStatisticsEnabled": true,
            "isDataExplorerEnabled": false,
            "isExtendedStorageSizesEnabled": false,
            "isPerformanceAdvisorEnabled": true,
            "isRealtimePerformancePanelEnabled": true,
            "isSchemaAdvisorEnabled": true
        })
    }

    fn planned() -> ProjectState<'static> {
        ProjectState {
            name: string("analytics"),
            org_id: string("o1"),
            is_data_explorer_enabled: Value::Value(false),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn create_fills_computed_attributes() {
        let mock = MockTransport::default();
        mock.on(
            Method::POST,
            "/api/atlas/v1.0/groups",
            MockReply::Json(remote_project()),
        );
        mock.on(Method::GET, SETTINGS, MockReply::Json(json!({"isDataExplorerEnabled": true})));
        mock.on(Method::GET, SETTINGS, MockReply::Json(remote_settings()));
        mock.on(Method::PATCH, SETTINGS, MockReply::Json(remote_settings()));
        mock.on(Method::GET, PROJECT, MockReply::Json(remote_project()));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let (plan, private) = resource
            .plan_create(&mut diags, planned(), planned(), Default::default())
            .await
            .unwrap();
        assert!(plan.id.is_unknown());
        assert!(plan.is_schema_advisor_enabled.is_unknown());

        let (state, _) = resource
            .create(&mut diags, plan, planned(), private, Default::default())
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(state.id, string("p1"));
        assert_eq!(state.cluster_count, Value::Value(0));
        assert_eq!(state.created, string("2024-03-01T10:00:00Z"));
        assert_eq!(state.with_default_alerts_settings, Value::Value(true));
        assert_eq!(state.is_data_explorer_enabled, Value::Value(false));
        assert_eq!(state.is_schema_advisor_enabled, Value::Value(true));

        let patch = mock
            .calls()
            .into_iter()
            .find(|call| call.method == Method::PATCH)
            .unwrap();
        assert_eq!(patch.body, Some(json!({"isDataExplorerEnabled": false})));
    }

    #[tokio::test]
    async fn failed_settings_roll_back_project() {
        let mock = MockTransport::default();
        mock.on(
            Method::POST,
            "/api/atlas/v1.0/groups",
            MockReply::Json(remote_project()),
        );
        mock.on(Method::GET, SETTINGS, MockReply::Json(json!({})));
        mock.on(Method::PATCH, SETTINGS, MockReply::Status(400));
        mock.on(Method::DELETE, PROJECT, MockReply::Json(json!(null)));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let created = resource
            .create(&mut diags, planned(), planned(), Default::default(), Default::default())
            .await;
        assert!(created.is_none());
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(mock.count(Method::DELETE, PROJECT), 1);
    }

    #[tokio::test]
    async fn read_missing_project_removes_it() {
        let mock = MockTransport::default();
        mock.on(Method::GET, PROJECT, MockReply::Status(404));
        mock.on(Method::GET, SETTINGS, MockReply::Status(404));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let state = ProjectState {
            id: string("p1"),
            ..planned()
        };
        let read = resource
            .read(&mut diags, state, Default::default(), Default::default())
            .await;
        assert!(read.is_none());
        assert!(diags.errors.is_empty());
    }

    #[tokio::test]
    async fn read_refreshes_remote_attributes() {
        let mock = MockTransport::default();
        mock.on(Method::GET, PROJECT, MockReply::Json(remote_project()));
        mock.on(Method::GET, SETTINGS, MockReply::Json(remote_settings()));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let (state, _) = resource
            .read(
                &mut diags,
                ProjectState {
                    id: string("p1"),
                    ..Default::default()
                },
                Default::default(),
                Default::default(),
            )
            .await
            .unwrap();
        assert_eq!(state.name, string("analytics"));
        assert_eq!(state.org_id, string("o1"));
        assert_eq!(state.is_performance_advisor_enabled, Value::Value(true));
    }

    #[tokio::test]
    async fn org_change_requires_replace() {
        let resource = ProjectResource::default();
        let prior = ProjectState {
            id: string("p1"),
            ..planned()
        };
        let proposed = ProjectState {
            org_id: string("o2"),
            name: string("renamed"),
            ..prior.clone()
        };

        let mut diags = Diagnostics::default();
        let (state, _, replace) = resource
            .plan_update(
                &mut diags,
                prior,
                proposed.clone(),
                proposed,
                Default::default(),
                Default::default(),
            )
            .await
            .unwrap();
        assert_eq!(replace.len(), 1);
        assert_eq!(state.id, string("p1"));
    }

    #[tokio::test]
    async fn rename_keeps_planned_cluster_count() {
        let mock = MockTransport::default();
        mock.on(Method::PATCH, PROJECT, MockReply::Json(remote_project()));
        mock.on(
            Method::GET,
            PROJECT,
            MockReply::Json(json!({"id": "p1", "name": "renamed", "orgId": "o1", "clusterCount": 2})),
        );
        mock.on(Method::GET, SETTINGS, MockReply::Json(remote_settings()));
        let resource = resource(&mock);

        let prior = ProjectState {
            id: string("p1"),
            cluster_count: Value::Value(0),
            created: string("2024-03-01T10:00:00Z"),
            ..planned()
        };
        let proposed = ProjectState {
            name: string("renamed"),
            cluster_count: Value::Null,
            ..prior.clone()
        };

        let mut diags = Diagnostics::default();
        let (plan, private, replace) = resource
            .plan_update(
                &mut diags,
                prior.clone(),
                proposed.clone(),
                proposed.clone(),
                Default::default(),
                Default::default(),
            )
            .await
            .unwrap();
        assert!(replace.is_empty());
        assert_eq!(plan.cluster_count, Value::Value(0));

        let (state, _) = resource
            .update(&mut diags, prior, plan, proposed, private, Default::default())
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(state.name, string("renamed"));
        assert_eq!(state.cluster_count, Value::Value(0));
        assert_eq!(mock.count(Method::PATCH, PROJECT), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_waits_for_clusters() {
        let mock = MockTransport::default();
        mock.on(
            Method::GET,
            CLUSTERS,
            MockReply::Json(json!({"results": [{"name": "c", "stateName": "DELETING"}]})),
        );
        mock.on(Method::GET, CLUSTERS, MockReply::Transport("connection reset"));
        mock.on(Method::GET, CLUSTERS, MockReply::Json(json!({"results": []})));
        mock.on(Method::DELETE, PROJECT, MockReply::Json(json!(null)));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let state = ProjectState {
            id: string("p1"),
            ..planned()
        };
        resource
            .destroy(&mut diags, state, Default::default())
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(mock.count(Method::GET, CLUSTERS), 3);
        assert_eq!(mock.count(Method::DELETE, PROJECT), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn delete_proceeds_when_listing_fails() {
        let mock = MockTransport::default();
        mock.on(Method::GET, CLUSTERS, MockReply::Status(500));
        mock.on(Method::DELETE, PROJECT, MockReply::Json(json!(null)));
        let resource = resource(&mock);

        let mut diags = Diagnostics::default();
        let state = ProjectState {
            id: string("p1"),
            ..planned()
        };
        assert!(resource
            .destroy(&mut diags, state, Default::default())
            .await
            .is_some());
        assert_eq!(mock.count(Method::DELETE, PROJECT), 1);
    }
}
