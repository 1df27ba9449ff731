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
use crate::utils::{
    attribute, opt_string, report, schema, string, string_list_type, ValueExt, WithSchema,
};

use super::ServerlessInstanceState;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerlessInstanceDataSourceState<'a> {
    pub id: ValueString<'a>,
    pub project_id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub provider_settings_backing_provider_name: ValueString<'a>,
    pub provider_settings_provider_name: ValueString<'a>,
    pub provider_settings_region_name: ValueString<'a>,
    pub termination_protection_enabled: ValueBool,
    pub continuous_backup_enabled: ValueBool,
    pub connection_strings_standard_srv: ValueString<'a>,
    pub connection_strings_private_endpoint_srv: ValueList<ValueString<'a>>,
    pub create_date: ValueString<'a>,
    pub mongo_db_version: ValueString<'a>,
    pub state_name: ValueString<'a>,
}

impl<'a> From<ServerlessInstanceState<'a>> for ServerlessInstanceDataSourceState<'a> {
    fn from(instance: ServerlessInstanceState<'a>) -> Self {
        Self {
            id: instance.id,
            project_id: instance.project_id,
            name: instance.name,
            provider_settings_backing_provider_name: instance
                .provider_settings_backing_provider_name,
            provider_settings_provider_name: instance.provider_settings_provider_name,
            provider_settings_region_name: instance.provider_settings_region_name,
            termination_protection_enabled: instance.termination_protection_enabled,
            continuous_backup_enabled: instance.continuous_backup_enabled,
            connection_strings_standard_srv: instance.connection_strings_standard_srv,
            connection_strings_private_endpoint_srv: instance
                .connection_strings_private_endpoint_srv,
            create_date: instance.create_date,
            mongo_db_version: instance.mongo_db_version,
            state_name: instance.state_name,
        }
    }
}

impl<'a> WithSchema for ServerlessInstanceDataSourceState<'a> {
    fn schema() -> Schema {
        let required = |description| {
            attribute(AttributeType::String, AttributeConstraint::Required, description)
        };
        let computed = |attr_type, description| {
            attribute(attr_type, AttributeConstraint::Computed, description)
        };
        schema(
            "Reads a serverless instance of an Atlas project",
            [
                ("id", computed(AttributeType::String, "Atlas identifier of the instance")),
                ("project_id", required("Project hosting the instance")),
                ("name", required("Name of the instance")),
                (
                    "provider_settings_backing_provider_name",
                    computed(AttributeType::String, "Cloud provider hosting the instance"),
                ),
                (
                    "provider_settings_provider_name",
                    computed(AttributeType::String, "Provider type"),
                ),
                (
                    "provider_settings_region_name",
                    computed(AttributeType::String, "Region of the backing provider"),
                ),
                (
                    "termination_protection_enabled",
                    computed(AttributeType::Bool, "Whether the instance is protected from deletion"),
                ),
                (
                    "continuous_backup_enabled",
                    computed(AttributeType::Bool, "Whether continuous cloud backups are enabled"),
                ),
                (
                    "connection_strings_standard_srv",
                    computed(AttributeType::String, "Public SRV connection string"),
                ),
                (
                    "connection_strings_private_endpoint_srv",
                    computed(string_list_type(), "SRV connection strings through private endpoints"),
                ),
                ("create_date", computed(AttributeType::String, "Creation date of the instance")),
                (
                    "mongo_db_version",
                    computed(AttributeType::String, "MongoDB version run by the instance"),
                ),
                ("state_name", computed(AttributeType::String, "Current state of the instance")),
            ],
        )
    }
}

#[derive(Debug, Default, Clone)]
pub struct ServerlessInstanceDataSource {
    client: ClientHandle,
}

impl ServerlessInstanceDataSource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for ServerlessInstanceDataSource {
    type State<'a> = ServerlessInstanceDataSourceState<'a>;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ServerlessInstanceDataSourceState::schema())
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
        let name = config.name.as_str_or_empty();

        match client.get_serverless_instance(project_id, name).await {
            Ok(instance) => {
                let id = instance.id.clone();
                let mut state = ServerlessInstanceState {
                    project_id: string(project_id),
                    ..Default::default()
                };
                state.apply(instance);
                state.id = opt_string(id);
                Some(state.into())
            }
            Err(err) => {
                report(diags, format!("error getting serverless instance `{name}`"), err);
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
    async fn reads_instance_with_private_endpoints() {
        let mock = MockTransport::default();
        mock.on(
            Method::GET,
            "/api/atlas/v1.0/groups/p1/serverless/i1",
            MockReply::Json(json!({
                "id": "s1",
                "name": "i1",
                "stateName": "IDLE",
                "connectionStrings": {
                    "standardSrv": "mongodb+srv://i1.mongodb.net",
                    "privateEndpoint": [{"srvConnectionString": "mongodb+srv://i1-pe-0.mongodb.net"}]
                },
                "serverlessBackupOptions": {"serverlessContinuousBackupEnabled": true}
            })),
        );
        let data_source =
            ServerlessInstanceDataSource::new(ClientHandle::with_client(AtlasClient::new(mock)));

        let mut diags = Diagnostics::default();
        let state = data_source
            .read(
                &mut diags,
                ServerlessInstanceDataSourceState {
                    project_id: string("p1"),
                    name: string("i1"),
                    ..Default::default()
                },
                Default::default(),
            )
            .await
            .unwrap();
        assert!(diags.errors.is_empty());
        assert_eq!(state.id, string("s1"));
        assert_eq!(state.state_name, string("IDLE"));
        assert_eq!(state.continuous_backup_enabled, Value::Value(true));
        assert_eq!(
            state.connection_strings_private_endpoint_srv,
            Value::Value(vec![string("mongodb+srv://i1-pe-0.mongodb.net")])
        );
    }

    #[tokio::test]
    async fn missing_instance_is_an_error() {
        let mock = MockTransport::default();
        mock.on(
            Method::GET,
            "/api/atlas/v1.0/groups/p1/serverless/i1",
            MockReply::Status(404),
        );
        let data_source =
            ServerlessInstanceDataSource::new(ClientHandle::with_client(AtlasClient::new(mock)));

        let mut diags = Diagnostics::default();
        let state = ServerlessInstanceDataSourceState {
            project_id: string("p1"),
            name: string("i1"),
            ..Default::default()
        };
        assert!(data_source
            .read(&mut diags, state, Default::default())
            .await
            .is_none());
        assert_eq!(diags.errors.len(), 1);
    }
}
