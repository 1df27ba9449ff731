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

use crate::client::models::Peer;
use crate::client::{ApiError, AtlasClient, ClientHandle};
use crate::poll::StateChangeConf;
use crate::regions::peering_region;
use crate::state_id::{decode_state_id, split_import_id, StateId};
use crate::utils::{
    fill, push_if_changed, report, string, unknown_if_null, validate_one_of, ValueExt, WithSchema,
};

use super::{fetch, required_fields, NetworkPeeringState, PROVIDERS};

/// Provider attributes that identify the peered network
const REPLACED_FIELDS: [&str; 7] = [
    "vpc_id",
    "azure_directory_id",
    "azure_subscription_id",
    "resource_group_name",
    "vnet_name",
    "gcp_project_id",
    "network_name",
];

const PEERING_PENDING: &[&str] = &["INITIATING", "FINALIZING", "ADDING_PEER", "WAITING_FOR_USER"];
const PEERING_READY: &[&str] = &["AVAILABLE", "PENDING_ACCEPTANCE"];

const PEERING_CREATED: StateChangeConf = StateChangeConf {
    pending: PEERING_PENDING,
    target: PEERING_READY,
    timeout: Duration::from_secs(60 * 60),
    min_interval: Duration::from_secs(10),
    delay: Duration::from_secs(30),
};

const PEERING_UPDATED: StateChangeConf = StateChangeConf {
    pending: PEERING_PENDING,
    target: PEERING_READY,
    timeout: Duration::from_secs(60 * 60),
    min_interval: Duration::from_secs(30),
    delay: Duration::from_secs(60),
};

const PEERING_DELETED: StateChangeConf = StateChangeConf {
    pending: &[
        "AVAILABLE",
        "INITIATING",
        "PENDING_ACCEPTANCE",
        "FINALIZING",
        "ADDING_PEER",
        "WAITING_FOR_USER",
        "TERMINATING",
        "DELETING",
    ],
    target: &["DELETED"],
    timeout: Duration::from_secs(60 * 60),
    min_interval: Duration::from_secs(30),
    delay: Duration::from_secs(10),
};

/// Status of a peering connection.
///
/// A connection waiting for the user whose container is provisioned only
/// waits for the user to accept it on the cloud provider side.
async fn peering_status(
    client: &AtlasClient,
    project_id: &str,
    peer_id: &str,
) -> Result<((), String), ApiError> {
    let peer = match client.get_peer(project_id, peer_id).await {
        Ok(peer) => peer,
        Err(err) if err.is_not_found() => return Ok(((), "DELETED".to_owned())),
        Err(err) => return Err(err),
    };
    let status = peer.current_status().to_owned();
    tracing::debug!(peer_id, %status, "network peering status");

    if status == "WAITING_FOR_USER" {
        if let Some(container_id) = peer.container_id.as_deref() {
            let container = client.get_container(project_id, container_id).await?;
            if container.provisioned == Some(true) {
                return Ok(((), "PENDING_ACCEPTANCE".to_owned()));
            }
        }
    }
    Ok(((), status))
}

#[derive(Debug, Default, Clone)]
pub struct NetworkPeeringResource {
    client: ClientHandle,
}

impl NetworkPeeringResource {
    pub fn new(client: ClientHandle) -> Self {
        Self { client }
    }
}

impl<'a> NetworkPeeringState<'a> {
    fn known(&self, name: &str) -> Option<String> {
        self.field(name)
            .and_then(|value| value.as_known_str())
            .map(str::to_owned)
    }

    /// Request body for the provider of the connection
    fn request(&self, provider_name: &str) -> Peer {
        let mut peer = Peer {
            container_id: Some(StateId::resolve(
                self.container_id.as_str_or_empty(),
                "container_id",
            )),
            provider_name: Some(provider_name.to_owned()),
            ..Default::default()
        };
        match provider_name {
            "GCP" => {
                peer.gcp_project_id = self.known("gcp_project_id");
                peer.network_name = self.known("network_name");
            }
            "AZURE" => {
                peer.azure_directory_id = self.known("azure_directory_id");
                peer.azure_subscription_id = self.known("azure_subscription_id");
                peer.resource_group_name = self.known("resource_group_name");
                peer.vnet_name = self.known("vnet_name");
            }
            _ => {
                peer.accepter_region_name = self
                    .accepter_region_name
                    .as_known_str()
                    .and_then(peering_region);
                peer.aws_account_id = self.known("aws_account_id");
                peer.route_table_cidr_block = self.known("route_table_cidr_block");
                peer.vpc_id = self.known("vpc_id");
            }
        }
        peer
    }

    fn inputs_changed(&self, prior: &Self) -> bool {
        PROVIDERS
            .iter()
            .flat_map(|provider| required_fields(provider))
            .any(|name| self.field(name) != prior.field(name))
            || self.atlas_cidr_block != prior.atlas_cidr_block
    }
}

fn missing_field(diags: &mut Diagnostics, name: &str, provider_name: &str) {
    diags.error(
        format!("`{name}` must be set when `provider_name` is `{provider_name}`"),
        format!("`{name}` is required to peer with a {provider_name} network"),
        AttributePath::new(name.to_owned()),
    );
}

#[async_trait]
impl Resource for NetworkPeeringResource {
    type State<'a> = NetworkPeeringState<'a>;
    type PrivateState<'a> = ValueEmpty;
    type ProviderMetaState<'a> = ValueEmpty;

    fn schema(&self, _diags: &mut Diagnostics) -> Option<Schema> {
        Some(NetworkPeeringState::schema())
    }

    async fn validate<'a>(&self, diags: &mut Diagnostics, config: Self::State<'a>) -> Option<()> {
        validate_one_of(diags, "provider_name", &config.provider_name, PROVIDERS);
        if let Some(provider_name) = config.provider_name.as_known_str() {
            for name in config.missing_fields(provider_name) {
                missing_field(diags, name, provider_name);
            }
        }
        if let Some(region) = config.accepter_region_name.as_known_str() {
            if peering_region(region).is_none() {
                diags.error(
                    "Invalid `accepter_region_name`",
                    format!("`{region}` is not a known Atlas region"),
                    AttributePath::new("accepter_region_name"),
                );
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
        let (Ok(project_id), Ok(peer_id), Ok(provider_name)) = (
            id.get("project_id"),
            id.get("peer_id"),
            id.get("provider_name"),
        ) else {
            diags.error_short("Invalid network peering id", AttributePath::new("id"));
            return None;
        };

        match fetch(&client, project_id, peer_id, provider_name).await {
            Ok((peer, container)) => {
                let mut state = state;
                state.project_id = string(project_id);
                state.apply(peer, container);
                Some((state, private_state))
            }
            Err(err) if err.is_not_found() => {
                tracing::info!(peer_id, "network peering is gone, removing it from state");
                None
            }
            Err(err) => {
                report(
                    diags,
                    format!("error reading MongoDB Network Peering Connection ({peer_id})"),
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
        state.peer_id = Value::Unknown;
        state.atlas_id = Value::Unknown;
        for status in state.status_mut() {
            *status = Value::Unknown;
        }
        for value in [
            &mut state.accepter_region_name,
            &mut state.aws_account_id,
            &mut state.route_table_cidr_block,
            &mut state.vpc_id,
            &mut state.azure_directory_id,
            &mut state.azure_subscription_id,
            &mut state.resource_group_name,
            &mut state.vnet_name,
            &mut state.gcp_project_id,
            &mut state.network_name,
            &mut state.atlas_cidr_block,
            &mut state.atlas_gcp_project_id,
            &mut state.atlas_vpc_name,
        ] {
            unknown_if_null(value);
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
        state.peer_id = prior_state.peer_id.clone();
        state.atlas_id = prior_state.atlas_id.clone();
        state.atlas_gcp_project_id = prior_state.atlas_gcp_project_id.clone();
        state.atlas_vpc_name = prior_state.atlas_vpc_name.clone();
        if state.inputs_changed(&prior_state) {
            for status in state.status_mut() {
                *status = Value::Unknown;
            }
        }

        let mut replace = Vec::new();
        push_if_changed(&mut replace, "project_id", &prior_state.project_id, &state.project_id);
        push_if_changed(&mut replace, "container_id", &prior_state.container_id, &state.container_id);
        push_if_changed(&mut replace, "provider_name", &prior_state.provider_name, &state.provider_name);
        for name in REPLACED_FIELDS {
            if let (Some(prior), Some(planned)) = (prior_state.field(name), state.field(name)) {
                push_if_changed(&mut replace, name, prior, planned);
            }
        }
        push_if_changed(
            &mut replace,
            "atlas_cidr_block",
            &prior_state.atlas_cidr_block,
            &state.atlas_cidr_block,
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
        let mut state = planned_state;
        let provider_name = state.provider_name.as_str_or_empty().to_owned();
        let project_id = state.project_id.as_str_or_empty().to_owned();

        // unset optional attributes are unknown in the plan, so only known values count
        let missing: Vec<_> = required_fields(&provider_name)
            .iter()
            .filter(|name| state.known(name).is_none())
            .collect();
        if !missing.is_empty() {
            for name in missing {
                missing_field(diags, name, &provider_name);
            }
            return None;
        }

        let client = self.client.get(diags).await?;
        let request = state.request(&provider_name);
        let peer = match client.create_peer(&project_id, &request).await {
            Ok(peer) => peer,
            Err(err) => {
                report(diags, "error creating MongoDB Network Peering Connection", err);
                return None;
            }
        };
        let Some(peer_id) = peer.id else {
            diags.root_error(
                "error creating MongoDB Network Peering Connection",
                "Atlas did not return the identifier of the new peering connection",
            );
            return None;
        };

        tracing::info!(peer_id, "waiting for the network peering connection to be ready");
        let client_ref = &client;
        let peer_ref = peer_id.as_str();
        let project_ref = project_id.as_str();
        if let Err(err) = PEERING_CREATED
            .wait_for(move || peering_status(client_ref, project_ref, peer_ref))
            .await
        {
            report(diags, "error creating MongoDB Network Peering Connection", err);
            return None;
        }

        state.id = string(
            StateId::new([
                ("project_id", project_id.as_str()),
                ("peer_id", peer_id.as_str()),
                ("provider_name", provider_name.as_str()),
            ])
            .encode(),
        );

        match fetch(&client, &project_id, &peer_id, &provider_name).await {
            Ok((peer, container)) => {
                let mut remote = state.clone();
                remote.apply(peer, container);
                for (slot, value) in state.status_mut().into_iter().zip(remote.status_mut()) {
                    fill(slot, value.clone());
                }
                fill(&mut state.peer_id, remote.peer_id);
                fill(&mut state.atlas_id, remote.atlas_id);
                fill(&mut state.accepter_region_name, remote.accepter_region_name);
                fill(&mut state.aws_account_id, remote.aws_account_id);
                fill(&mut state.route_table_cidr_block, remote.route_table_cidr_block);
                fill(&mut state.vpc_id, remote.vpc_id);
                fill(&mut state.azure_directory_id, remote.azure_directory_id);
                fill(&mut state.azure_subscription_id, remote.azure_subscription_id);
                fill(&mut state.resource_group_name, remote.resource_group_name);
                fill(&mut state.vnet_name, remote.vnet_name);
                fill(&mut state.gcp_project_id, remote.gcp_project_id);
                fill(&mut state.network_name, remote.network_name);
                fill(&mut state.atlas_cidr_block, remote.atlas_cidr_block);
                fill(&mut state.atlas_gcp_project_id, remote.atlas_gcp_project_id);
                fill(&mut state.atlas_vpc_name, remote.atlas_vpc_name);
                Some((state, private_state))
            }
            Err(err) => {
                report(
                    diags,
                    format!("error reading MongoDB Network Peering Connection ({peer_id})"),
                    err,
                );
                None
            }
        }
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
        let id = decode_state_id(diags, &planned_state.id)?;
        let (Ok(project_id), Ok(peer_id), Ok(provider_name)) = (
            id.get("project_id"),
            id.get("peer_id"),
            id.get("provider_name"),
        ) else {
            diags.error_short("Invalid network peering id", AttributePath::new("id"));
            return None;
        };
        let mut state = planned_state;

        if state.inputs_changed(&prior_state) {
            let request = state.request(provider_name);
            if let Err(err) = client.update_peer(project_id, peer_id, &request).await {
                report(
                    diags,
                    format!("error updating MongoDB Network Peering Connection ({peer_id})"),
                    err,
                );
                return None;
            }

            let client_ref = &client;
            if let Err(err) = PEERING_UPDATED
                .wait_for(move || peering_status(client_ref, project_id, peer_id))
                .await
            {
                report(
                    diags,
                    format!("error updating MongoDB Network Peering Connection ({peer_id})"),
                    err,
                );
                return None;
            }
        }

        match fetch(&client, project_id, peer_id, provider_name).await {
            Ok((peer, container)) => {
                let mut remote = state.clone();
                remote.apply(peer, container);
                for (slot, value) in state.status_mut().into_iter().zip(remote.status_mut()) {
                    fill(slot, value.clone());
                }
                Some((state, private_state))
            }
            Err(err) => {
                report(
                    diags,
                    format!("error reading MongoDB Network Peering Connection ({peer_id})"),
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
        let (Ok(project_id), Ok(peer_id)) = (id.get("project_id"), id.get("peer_id")) else {
            diags.error_short("Invalid network peering id", AttributePath::new("id"));
            return None;
        };

        match client.delete_peer(project_id, peer_id).await {
            Ok(()) => (),
            Err(err) if err.is_not_found() => return Some(()),
            Err(err) => {
                report(
                    diags,
                    format!("error deleting MongoDB Network Peering Connection ({peer_id})"),
                    err,
                );
                return None;
            }
        }

        tracing::info!(peer_id, "waiting for the network peering connection to be destroyed");
        let client_ref = &client;
        match PEERING_DELETED
            .wait_for(move || peering_status(client_ref, project_id, peer_id))
            .await
        {
            Ok(()) => Some(()),
            Err(err) => {
                report(
                    diags,
                    format!("error deleting MongoDB Network Peering Connection ({peer_id})"),
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
        let [project_id, peer_id, provider_name] =
            match split_import_id::<3>(&id, "-", "{project_id}-{peer_id}-{provider_name}") {
                Ok(parts) => parts,
                Err(err) => {
                    diags.root_error("Invalid import id", err.to_string());
                    return None;
                }
            };

        let (peer, container) = match fetch(&client, project_id, peer_id, provider_name).await {
            Ok(fetched) => fetched,
            Err(err) => {
                report(
                    diags,
                    format!("couldn't import peer {peer_id} in project {project_id}"),
                    err,
                );
                return None;
            }
        };

        let mut state = NetworkPeeringState {
            id: string(
                StateId::new([
                    ("project_id", project_id),
                    ("peer_id", peer_id),
                    ("provider_name", provider_name),
                ])
                .encode(),
            ),
            project_id: string(project_id),
            provider_name: string(provider_name),
            ..Default::default()
        };
        state.apply(peer, container);
        Some((state, Default::default()))
    }
}
