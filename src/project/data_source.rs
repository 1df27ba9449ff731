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
use tf_provider::value::{ValueBool, ValueNumber, ValueString};
use tf_provider::{AttributePath, DataSource, Diagnostics, Schema, ValueEmpty};

use crate::client::ClientHandle;
use crate::utils::{attribute, report, schema, ValueExt, WithSchema};

use super::{flag_attributes, resource::fetch, ProjectState};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDataSourceState<'a> {
    pub project_id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub org_id: ValueString<'a>,
    pub cluster_count: ValueNumber,
    pub created: ValueString<'a>,
    pub region_usage_restrictions: ValueString<'a>,
    pub is_collect_database_specifics_statistics_enabled: ValueBool,
    pub is_data_explorer_enabled: ValueBool,
    pub is_extended_storage_sizes_enabled: ValueBool,
    pub is_performance_advisor_enabled: ValueBool,
    pub is_realtime_performance_panel_enabled: ValueBool,
    pub is_schema_advisor_enabled: ValueBool,
}

impl<'a> From<ProjectState<'a>> for ProjectDataSourceState<'a> {
    fn from(project: ProjectState<'a>) -> Self {
        Self {
            project_id: project.id,
            name: project.name,
            org_id: project.org_id,
            cluster_count: project.cluster_count,
            created: project.created,
            region_usage_restrictions: project.region_usage_restrictions,
            is_collect_database_specifics_statistics_enabled: project
                .is_collect_database_specifics_statistics_enabled,
            is_data_explorer_enabled: project.is_data_explorer_enabled,
            is_extended_storage_sizes_enabled: project.is_extended_storage_sizes_enabled,
            is_performance_advisor_enabled: project.is_performance_advisor_enabled,
            is_realtime_performance_panel_enabled: project.is_realtime_performance_panel_enabled,
            is_schema_advisor_enabled: project.is_schema_advisor_enabled,
        }
    }
}

impl<'a> WithSchema for ProjectDataSourceState<'a> {
    fn schema() -> Schema {
        let [f0, f1, f2, f3, f4, f5] = flag_attributes(AttributeConstraint::Computed);
        let computed = |attr_type, description| {
            attribute(attr_type, AttributeConstraint::Computed, description)
        };
        schema(
            "Looks up an Atlas project by identifier or by name",
            [
                (
                    "project_id",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::OptionalComputed,
                        "Identifier of the project, conflicts with `name`",
                    ),
                ),
                (
                    "name",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::OptionalComputed,
                        "Name of the project, conflicts with `project_id`",
                    ),
                ),
                (
                    "org_id",
                    computed(AttributeType::String, "Organization of the project"),
                ),
                (
                    "cluster_count",
                    computed(AttributeType::Number, "Number of clusters in the project"),
                ),
                (
                    "created",
                    computed(AttributeType::String, "Creation date of the project"),
                ),
                (
                    "region_usage_restrictions",
                    computed(AttributeType::String, "Region restrictions of the project"),
                ),
                f0,
                f1,
                f2,
                f3,
                f4,
                f5,
            ],
        )
    }
}

#[derive(Debug, Default, Clone)]
pub struct ProjectDataSource {
    client: ClientHandle,
}

impl ProjectDataSource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for ProjectDataSource {
    type State<'a> = ProjectDataSourceState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ProjectDataSourceState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        match (config.project_id.is_set(), config.name.is_set()) {
            (true, true) => {
                diags.error(
                    "Conflicting lookup attributes",
                    "Only one of `project_id` and `name` can be set",
                    AttributePath::new("name"),
                );
            }
            (false, false) => {
                diags.root_error(
                    "Missing lookup attribute",
                    "One of `project_id` or `name` must be set",
                );
            }
            _ => (),
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
        config: Self::State<'a>,
        _provider_meta_state: Self::ProviderMetaState<'a>,
    ) -> Option<Self::State<'a>> {
        let client = self.client.get(diags).await?;

        let project_id = match (config.project_id.as_known_str(), config.name.as_known_str()) {
            (Some(project_id), _) => project_id.to_owned(),
            (None, Some(name)) => match client.get_project_by_name(name).await {
                Ok(project) => project.id.unwrap_or_default(),
                Err(err) => {
                    report(diags, format!("error getting project `{name}`"), err);
                    return None;
                }
            },
            (None, None) => {
                diags.root_error(
                    "Missing lookup attribute",
                    "One of `project_id` or `name` must be set",
                );
                return None;
            }
        };

        match fetch(&client, &project_id).await {
            Ok((project, settings)) => {
                let mut state = ProjectState::default();
                state.apply(project, &settings);
                Some(state.into())
            }
            Err(err) => {
                report(diags, format!("error getting project `{project_id}`"), err);
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
    use crate::utils::string;

    fn data_source(mock: &MockTransport) -> ProjectDataSource {
        ProjectDataSource::new(ClientHandle::with_client(AtlasClient::new(mock.clone())))
    }

    #[tokio::test]
    async fn lookup_by_name() {
        let mock = MockTransport::default();
        mock.on(
            Method::GET,
            "/api/atlas/v1.0/groups/byName/analytics",
            MockReply::Json(json!({"id": "p1", "name": "analytics"})),
        );
        mock.on(
            Method::GET,
            "/api/atlas/v1.0/groups/p1",
            MockReply::Json(json!({"id": "p1", "name": "analytics", "orgId": "o1", "clusterCount": 3})),
        );
        mock.on(
            Method::GET,
            "/api/atlas/v1.0/groups/p1/settings",
            MockReply::Json(json!({"isSchemaAdvisorEnabled": true})),
        );

        let mut diags = Diagnostics::default();
        let state = data_source(&mock)
            .read(
                &mut diags,
                ProjectDataSourceState {
                    name: string("analytics"),
                    ..Default::default()
                },
                Default::default(),
            )
            .await
            .unwrap();
        assert_eq!(state.project_id, string("p1"));
        assert_eq!(state.org_id, string("o1"));
        assert_eq!(state.cluster_count, Value::Value(3));
        assert_eq!(state.is_schema_advisor_enabled, Value::Value(true));
    }

    #[tokio::test]
    async fn exactly_one_lookup_attribute() {
        let data_source = ProjectDataSource::default();

        let mut diags = Diagnostics::default();
        let both = ProjectDataSourceState {
            project_id: string("p1"),
            name: string("analytics"),
            ..Default::default()
        };
        assert!(data_source.validate(&mut diags, both).await.is_none());

        let mut diags = Diagnostics::default();
        assert!(data_source
            .validate(&mut diags, Default::default())
            .await
            .is_none());

        let mut diags = Diagnostics::default();
        let by_id = ProjectDataSourceState {
            project_id: string("p1"),
            ..Default::default()
        };
        assert!(data_source.validate(&mut diags, by_id).await.is_some());
    }

    #[tokio::test]
    async fn missing_project_is_an_error() {
        let mock = MockTransport::default();
        mock.on(Method::GET, "/api/atlas/v1.0/groups/p1", MockReply::Status(404));
        mock.on(
            Method::GET,
            "/api/atlas/v1.0/groups/p1/settings",
            MockReply::Status(404),
        );

        let mut diags = Diagnostics::default();
        let state = data_source(&mock)
            .read(
                &mut diags,
                ProjectDataSourceState {
                    project_id: string("p1"),
                    ..Default::default()
                },
                Default::default(),
            )
            .await;
        assert!(state.is_none());
        assert_eq!(diags.errors.len(), 1);
    }
}
