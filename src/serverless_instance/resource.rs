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

use crate::client::models::ServerlessInstance;
use crate::client::{ApiError, AtlasClient, ClientHandle};
use crate::poll::StateChangeConf;
use crate::state_id::{decode_state_id, split_import_id, StateId};
use crate::utils::{fill, push_if_changed, report, string, unknown_if_null, ValueExt, WithSchema};

use super::ServerlessInstanceState;

const INSTANCE_READY: StateChangeConf = StateChangeConf {
    pending: &["CREATING", "UPDATING", "REPAIRING", "REPEATING", "PENDING"],
    target: &["IDLE"],
    timeout: Duration::from_secs(3 * 60 * 60),
    min_interval: Duration::from_secs(60),
    delay: Duration::from_secs(3 * 60),
};

const INSTANCE_DELETED: StateChangeConf = StateChangeConf {
    pending: &["IDLE", "CREATING", "UPDATING", "REPAIRING", "DELETING"],
    target: &["DELETED"],
    timeout: Duration::from_secs(3 * 60 * 60),
    min_interval: Duration::from_secs(30),
    delay: Duration::from_secs(60),
};

/// Reports the state of an instance; connection failures and 503 answers
/// are reported as transient states
async fn instance_status(
    client: &AtlasClient,
    project_id: &str,
    name: &str,
) -> Result<((), String), ApiError> {
    match client.get_serverless_instance(project_id, name).await {
        Ok(instance) => Ok(((), instance.state_name.unwrap_or_default())),
        Err(err) if err.is_not_found() => Ok(((), "DELETED".to_owned())),
        Err(err) if err.status() == Some(503) => Ok(((), "PENDING".to_owned())),
        Err(ApiError::Transport(reason)) => {
            tracing::debug!(%reason, "serverless instance refresh failed, retrying");
            Ok(((), "REPEATING".to_owned()))
        }
        Err(err) => Err(err),
    }
}

#[derive(Debug, Default, Clone)]
pub struct ServerlessInstanceResource {
    client: ClientHandle,
}

impl ServerlessInstanceResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

impl<'a> ServerlessInstanceState<'a> {
    fn computed_mut(&mut self) -> [&mut ValueString<'a>; 4] {
        [
            &mut self.connection_strings_standard_srv,
            &mut self.create_date,
            &mut self.mongo_db_version,
            &mut self.state_name,
        ]
    }

    fn flags_changed(&self, other: &Self) -> bool {
        self.termination_protection_enabled != other.termination_protection_enabled
            || self.continuous_backup_enabled != other.continuous_backup_enabled
    }
}

#[async_trait]
impl Resource for ServerlessInstanceResource {
    type State<'a> = ServerlessInstanceState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(ServerlessInstanceState::schema())
    }

    async fn validate<'a>(&self, _diags: &mut Diagnostics, _config: Self::State<'a>) -> Option<()> {
        Some(())
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
        let (Ok(project_id), Ok(name)) = (id.get("project_id"), id.get("name")) else {
            diags.error_short("Invalid serverless instance id", AttributePath::new("id"));
            return None;
        };

        match client.get_serverless_instance(project_id, name).await {
            Ok(instance) => {
                let mut state = state;
                state.project_id = string(project_id);
                state.apply(instance);
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                tracing::info!(name, "serverless instance is gone, removing it from state");
                None
            }
            Err(err) => {
                report(diags, format!("error reading serverless instance ({name})"), err);
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
        state.connection_strings_private_endpoint_srv = Value::Unknown;
        for value in state.computed_mut() {
            *value = Value::Unknown;
        }
        unknown_if_null(&mut state.termination_protection_enabled);
        unknown_if_null(&mut state.continuous_backup_enabled);
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
            ("name", &prior_state.name, &proposed_state.name),
            (
                "provider_settings_backing_provider_name",
                &prior_state.provider_settings_backing_provider_name,
                &proposed_state.provider_settings_backing_provider_name,
            ),
            (
                "provider_settings_provider_name",
                &prior_state.provider_settings_provider_name,
                &proposed_state.provider_settings_provider_name,
            ),
            (
                "provider_settings_region_name",
                &prior_state.provider_settings_region_name,
                &proposed_state.provider_settings_region_name,
            ),
        ] {
            push_if_changed(&mut replace, name, prior, proposed);
        }

        let mut state = proposed_state;
        state.id = prior_state.id.clone();
        state.connection_strings_private_endpoint_srv =
            prior_state.connection_strings_private_endpoint_srv.clone();
        let mut prior = prior_state;
        for (value, previous) in state.computed_mut().into_iter().zip(prior.computed_mut()) {
            *value = previous.clone();
        }
        if state.flags_changed(&prior) {
            state.state_name = Value::Unknown;
        }
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
        let name = state.name.as_str_or_empty().to_owned();

        if let Err(err) = client
            .create_serverless_instance(&project_id, &state.request())
            .await
        {
            report(diags, "error creating serverless instance", err);
            return None;
        }

        tracing::info!(%name, "waiting for the serverless instance to be idle");
        let client_ref = &client;
        let (project_ref, name_ref) = (project_id.as_str(), name.as_str());
        if let Err(err) = INSTANCE_READY
            .wait_for(move || instance_status(client_ref, project_ref, name_ref))
            .await
        {
            report(diags, "error creating MongoDB Serverless Instance", err);
            return None;
        }

        let instance = match client.get_serverless_instance(&project_id, &name).await {
            Ok(instance) => instance,
            Err(err) => {
                report(diags, format!("error reading serverless instance ({name})"), err);
                return None;
            }
        };
        state.id = string(StateId::new([("project_id", &project_id), ("name", &name)]).encode());
        let mut remote = state.clone();
        remote.apply(instance);
        for (slot, value) in state.computed_mut().into_iter().zip(remote.computed_mut()) {
            fill(slot, value.clone());
        }
        fill(
            &mut state.connection_strings_private_endpoint_srv,
            remote.connection_strings_private_endpoint_srv,
        );
        fill(
            &mut state.termination_protection_enabled,
            remote.termination_protection_enabled,
        );
        fill(&mut state.continuous_backup_enabled, remote.continuous_backup_enabled);
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
        let mut state = planned_state;
        if !state.flags_changed(&prior_state) {
            return Some((state, private_state));
        }

        let client = self.client.get(diags).await?;
        let project_id = state.project_id.as_str_or_empty().to_owned();
        let name = state.name.as_str_or_empty().to_owned();

        if let Err(err) = client
            .update_serverless_instance(&project_id, &name, &state.update_request())
            .await
        {
            report(diags, format!("error updating serverless instance ({name})"), err);
            return None;
        }

        let client_ref = &client;
        let (project_ref, name_ref) = (project_id.as_str(), name.as_str());
        if let Err(err) = INSTANCE_READY
            .wait_for(move || instance_status(client_ref, project_ref, name_ref))
            .await
        {
            report(diags, "error updating MongoDB Serverless Instance", err);
            return None;
        }

        match client.get_serverless_instance(&project_id, &name).await {
            Ok(instance) => {
                let mut remote = state.clone();
                remote.apply(instance);
                state.state_name = remote.state_name;
                Some((state, private_state))
            }
            Err(err) => {
                report(diags, format!("error reading serverless instance ({name})"), err);
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
        let (Ok(project_id), Ok(name)) = (id.get("project_id"), id.get("name")) else {
            diags.error_short("Invalid serverless instance id", AttributePath::new("id"));
            return None;
        };

        if let Err(err) = client.delete_serverless_instance(project_id, name).await {
            report(
                diags,
                format!("error deleting MongoDB Serverless Instance ({name})"),
                err,
            );
            return None;
        }

        let client_ref = &client;
        match INSTANCE_DELETED
            .wait_for(move || instance_status(client_ref, project_id, name))
            .await
        {
            Ok(()) => Some(()),
            Err(err) => {
                report(
                    diags,
                    format!("error deleting MongoDB Serverless Instance ({name})"),
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
        let [project_id, name] = match split_import_id::<2>(&id, "-", "{project_id}-{name}") {
            Ok(parts) => parts,
            Err(err) => {
                diags.root_error("Invalid import id", err.to_string());
                return None;
            }
        };

        let instance: ServerlessInstance =
            match client.get_serverless_instance(project_id, name).await {
                Ok(instance) => instance,
                Err(err) => {
                    report(
                        diags,
                        format!("couldn't import serverless instance {name} in project {project_id}"),
                        err,
                    );
                    return None;
                }
            };

        let mut state = ServerlessInstanceState {
            id: string(StateId::new([("project_id", project_id), ("name", name)]).encode()),
            project_id: string(project_id),
            ..Default::default()
        };
        state.apply(instance);
        Some((state, Default::default()))
    }
}
