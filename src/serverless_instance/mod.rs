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

use serde::{Deserialize, Serialize};
use tf_provider::schema::{AttributeConstraint, AttributeType};
use tf_provider::value::{ValueBool, ValueList, ValueString};
use tf_provider::Schema;

use crate::client::models::{ServerlessBackupOptions, ServerlessInstance, ServerlessProviderSettings};
use crate::utils::{
    attribute, known_bool, opt_bool, opt_string, schema, string, string_list, string_list_type,
    ValueExt, WithSchema,
};

mod data_source;
mod resource;

pub use data_source::ServerlessInstanceDataSource;
pub use resource::ServerlessInstanceResource;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerlessInstanceState<'a> {
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

impl<'a> ServerlessInstanceState<'a> {
    /// Body of the creation request; unset flags are sent disabled
    fn request(&self) -> ServerlessInstance {
        ServerlessInstance {
            name: self.name.as_known_str().map(str::to_owned),
            provider_settings: Some(ServerlessProviderSettings {
                backing_provider_name: self
                    .provider_settings_backing_provider_name
                    .as_known_str()
                    .map(str::to_owned),
                provider_name: self
                    .provider_settings_provider_name
                    .as_known_str()
                    .map(str::to_owned),
                region_name: self
                    .provider_settings_region_name
                    .as_known_str()
                    .map(str::to_owned),
            }),
            ..self.update_request()
        }
    }

    fn update_request(&self) -> ServerlessInstance {
        ServerlessInstance {
            termination_protection_enabled: Some(
                known_bool(&self.termination_protection_enabled).unwrap_or_default(),
            ),
            serverless_backup_options: Some(ServerlessBackupOptions {
                serverless_continuous_backup_enabled: Some(
                    known_bool(&self.continuous_backup_enabled).unwrap_or_default(),
                ),
            }),
            ..Default::default()
        }
    }

    fn apply(&mut self, instance: ServerlessInstance) {
        let private_endpoint_srv = instance.private_endpoint_srv();
        if let Some(name) = instance.name {
            self.name = string(name);
        }
        if let Some(settings) = instance.provider_settings {
            self.provider_settings_backing_provider_name =
                opt_string(settings.backing_provider_name);
            self.provider_settings_provider_name = opt_string(settings.provider_name);
            self.provider_settings_region_name = opt_string(settings.region_name);
        }
        let strings = instance.connection_strings.unwrap_or_default();
        self.connection_strings_standard_srv = opt_string(strings.standard_srv);
        self.connection_strings_private_endpoint_srv = string_list(Some(private_endpoint_srv));
        self.create_date = opt_string(instance.create_date);
        self.mongo_db_version = opt_string(instance.mongo_db_version);
        self.state_name = opt_string(instance.state_name);
        self.termination_protection_enabled =
            opt_bool(Some(instance.termination_protection_enabled.unwrap_or_default()));
        self.continuous_backup_enabled = opt_bool(Some(
            instance
                .serverless_backup_options
                .and_then(|options| options.serverless_continuous_backup_enabled)
                .unwrap_or_default(),
        ));
    }
}

impl<'a> WithSchema for ServerlessInstanceState<'a> {
    fn schema() -> Schema {
        let required = |description| {
            attribute(AttributeType::String, AttributeConstraint::Required, description)
        };
        let computed = |description| {
            attribute(AttributeType::String, AttributeConstraint::Computed, description)
        };
        let flag = |description| {
            attribute(AttributeType::Bool, AttributeConstraint::OptionalComputed, description)
        };
        schema(
            "Serverless instance of an Atlas project",
            [
                ("id", computed("Composite identifier of the instance")),
                ("project_id", required("Project hosting the instance")),
                ("name", required("Name of the instance")),
                (
                    "provider_settings_backing_provider_name",
                    required("Cloud provider hosting the instance: AWS, AZURE or GCP"),
                ),
                (
                    "provider_settings_provider_name",
                    required("Provider type, always SERVERLESS"),
                ),
                (
                    "provider_settings_region_name",
                    required("Region of the backing provider"),
                ),
                (
                    "termination_protection_enabled",
                    flag("Prevent the instance from being deleted"),
                ),
                (
                    "continuous_backup_enabled",
                    flag("Enable continuous cloud backups of the instance"),
                ),
                (
                    "connection_strings_standard_srv",
                    computed("Public SRV connection string"),
                ),
                (
                    "connection_strings_private_endpoint_srv",
                    attribute(
                        string_list_type(),
                        AttributeConstraint::Computed,
                        "SRV connection strings through private endpoints",
                    ),
                ),
                ("create_date", computed("Creation date of the instance")),
                ("mongo_db_version", computed("MongoDB version run by the instance")),
                ("state_name", computed("Current state of the instance")),
            ],
        )
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tf_provider::value::Value;

    use super::*;

    #[test]
    fn request_sends_disabled_flags_by_default() {
        let state = ServerlessInstanceState {
            name: string("i1"),
            provider_settings_backing_provider_name: string("AWS"),
            provider_settings_provider_name: string("SERVERLESS"),
            provider_settings_region_name: string("US_EAST_1"),
            termination_protection_enabled: Value::Unknown,
            continuous_backup_enabled: Value::Value(true),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(state.request()).unwrap(),
            json!({
                "name": "i1",
                "providerSettings": {
                    "backingProviderName": "AWS",
                    "providerName": "SERVERLESS",
                    "regionName": "US_EAST_1"
                },
                "terminationProtectionEnabled": false,
                "serverlessBackupOptions": {"serverlessContinuousBackupEnabled": true}
            })
        );
    }

    #[test]
    fn apply_flattens_nested_objects() {
        let mut state = ServerlessInstanceState::default();
        state.apply(
            serde_json::from_value(json!({
                "name": "i1",
                "providerSettings": {"backingProviderName": "GCP", "regionName": "CENTRAL_US"},
                "connectionStrings": {"standardSrv": "mongodb+srv://i1.mongodb.net"},
                "stateName": "IDLE"
            }))
            .unwrap(),
        );
        assert_eq!(state.name, string("i1"));
        assert_eq!(state.provider_settings_backing_provider_name, string("GCP"));
        assert!(state.provider_settings_provider_name.is_null());
        assert_eq!(
            state.connection_strings_standard_srv,
            string("mongodb+srv://i1.mongodb.net")
        );
        assert_eq!(state.connection_strings_private_endpoint_srv, Value::Value(vec![]));
        assert_eq!(state.continuous_backup_enabled, Value::Value(false));
        assert_eq!(state.state_name, string("IDLE"));
    }
}
