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

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as Json};
use thiserror::Error;
use tf_provider::Diagnostics;
use tokio::sync::RwLock;
use urlencoding::encode;

mod digest;
mod http;
#[cfg(test)]
pub(crate) mod mock;
pub mod models;

pub use http::HttpTransport;
use models::{
    AdvancedCluster, Container, InterfaceEndpoint, Paginated, Peer, PrivateEndpoint, Project,
    ProjectSettings, ServerlessEndpoint, ServerlessInstance,
};

const API_V1: &str = "/api/atlas/v1.0";
const API_V1_5: &str = "/api/atlas/v1.5";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{method} {path}: HTTP {status} ({error_code}) {detail}")]
    Api {
        method: Method,
        path: String,
        status: u16,
        error_code: String,
        detail: String,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("invalid JSON: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("authentication error: {0}")]
    Auth(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Body Atlas sends along with non-2xx answers
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: String,
    #[serde(default)]
    pub error: u16,
    #[serde(default)]
    pub error_code: String,
    #[serde(default)]
    pub reason: String,
}

/// Sends one request to the Atlas API and returns the decoded JSON answer
///
/// `path` is absolute (`/api/atlas/v1.0/...`) and may carry a query string.
/// An empty answer decodes as `null`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, method: Method, path: &str, body: Option<Json>)
        -> Result<Json, ApiError>;
}

/// Typed operations of the Atlas Admin API
#[derive(Clone)]
pub struct AtlasClient {
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for AtlasClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasClient").finish_non_exhaustive()
    }
}

impl AtlasClient {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: String) -> Result<T, ApiError> {
        let value = self.transport.execute(Method::GET, &path, None).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn send<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: String,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_value(body)?;
        let value = self.transport.execute(method, &path, Some(body)).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn delete(&self, path: String) -> Result<(), ApiError> {
        self.transport.execute(Method::DELETE, &path, None).await?;
        Ok(())
    }

    // Projects

    pub async fn create_project(
        &self,
        project: &Project,
        owner_id: Option<&str>,
    ) -> Result<Project, ApiError> {
        let path = match owner_id {
            Some(owner) => format!("{API_V1}/groups?projectOwnerId={}", encode(owner)),
            None => format!("{API_V1}/groups"),
        };
        self.send(Method::POST, path, project).await
    }

    pub async fn get_project(&self, project_id: &str) -> Result<Project, ApiError> {
        self.get(format!("{API_V1}/groups/{}", encode(project_id)))
            .await
    }

    pub async fn get_project_by_name(&self, name: &str) -> Result<Project, ApiError> {
        self.get(format!("{API_V1}/groups/byName/{}", encode(name)))
            .await
    }

    pub async fn rename_project(&self, project_id: &str, name: &str) -> Result<Project, ApiError> {
        self.send(
            Method::PATCH,
            format!("{API_V1}/groups/{}", encode(project_id)),
            &json!({ "name": name }),
        )
        .await
    }

    pub async fn delete_project(&self, project_id: &str) -> Result<(), ApiError> {
        self.delete(format!("{API_V1}/groups/{}", encode(project_id)))
            .await
    }

    pub async fn get_project_settings(&self, project_id: &str) -> Result<ProjectSettings, ApiError> {
        self.get(format!("{API_V1}/groups/{}/settings", encode(project_id)))
            .await
    }

    pub async fn update_project_settings(
        &self,
        project_id: &str,
        settings: &ProjectSettings,
    ) -> Result<ProjectSettings, ApiError> {
        self.send(
            Method::PATCH,
            format!("{API_V1}/groups/{}/settings", encode(project_id)),
            settings,
        )
        .await
    }

    pub async fn list_advanced_clusters(
        &self,
        project_id: &str,
    ) -> Result<Paginated<AdvancedCluster>, ApiError> {
        self.get(format!("{API_V1_5}/groups/{}/clusters", encode(project_id)))
            .await
    }

    // Network containers

    pub async fn create_container(
        &self,
        project_id: &str,
        container: &Container,
    ) -> Result<Container, ApiError> {
        self.send(
            Method::POST,
            format!("{API_V1}/groups/{}/containers", encode(project_id)),
            container,
        )
        .await
    }

    pub async fn get_container(
        &self,
        project_id: &str,
        container_id: &str,
    ) -> Result<Container, ApiError> {
        self.get(container_path(project_id, container_id)).await
    }

    pub async fn update_container(
        &self,
        project_id: &str,
        container_id: &str,
        container: &Container,
    ) -> Result<Container, ApiError> {
        self.send(
            Method::PATCH,
            container_path(project_id, container_id),
            container,
        )
        .await
    }

    pub async fn delete_container(
        &self,
        project_id: &str,
        container_id: &str,
    ) -> Result<(), ApiError> {
        self.delete(container_path(project_id, container_id)).await
    }

    // Network peering

    pub async fn create_peer(&self, project_id: &str, peer: &Peer) -> Result<Peer, ApiError> {
        self.send(
            Method::POST,
            format!("{API_V1}/groups/{}/peers", encode(project_id)),
            peer,
        )
        .await
    }

    pub async fn get_peer(&self, project_id: &str, peer_id: &str) -> Result<Peer, ApiError> {
        self.get(peer_path(project_id, peer_id)).await
    }

    pub async fn update_peer(
        &self,
        project_id: &str,
        peer_id: &str,
        peer: &Peer,
    ) -> Result<Peer, ApiError> {
        self.send(Method::PATCH, peer_path(project_id, peer_id), peer)
            .await
    }

    pub async fn delete_peer(&self, project_id: &str, peer_id: &str) -> Result<(), ApiError> {
        self.delete(peer_path(project_id, peer_id)).await
    }

    // Private endpoints

    pub async fn create_private_endpoint(
        &self,
        project_id: &str,
        provider_name: &str,
        region: &str,
    ) -> Result<PrivateEndpoint, ApiError> {
        self.send(
            Method::POST,
            format!(
                "{API_V1}/groups/{}/privateEndpoint/endpointService",
                encode(project_id)
            ),
            &json!({ "providerName": provider_name, "region": region }),
        )
        .await
    }

    pub async fn get_private_endpoint(
        &self,
        project_id: &str,
        provider_name: &str,
        private_link_id: &str,
    ) -> Result<PrivateEndpoint, ApiError> {
        self.get(endpoint_service_path(
            project_id,
            provider_name,
            private_link_id,
        ))
        .await
    }

    pub async fn delete_private_endpoint(
        &self,
        project_id: &str,
        provider_name: &str,
        private_link_id: &str,
    ) -> Result<(), ApiError> {
        self.delete(endpoint_service_path(
            project_id,
            provider_name,
            private_link_id,
        ))
        .await
    }

    pub async fn create_interface_endpoint(
        &self,
        project_id: &str,
        provider_name: &str,
        private_link_id: &str,
        endpoint_id: &str,
        ip_address: Option<&str>,
    ) -> Result<InterfaceEndpoint, ApiError> {
        let body = InterfaceEndpoint {
            id: Some(endpoint_id.to_owned()),
            private_endpoint_ip_address: ip_address.map(str::to_owned),
            ..Default::default()
        };
        self.send(
            Method::POST,
            format!(
                "{}/endpoint",
                endpoint_service_path(project_id, provider_name, private_link_id)
            ),
            &body,
        )
        .await
    }

    pub async fn get_interface_endpoint(
        &self,
        project_id: &str,
        provider_name: &str,
        private_link_id: &str,
        endpoint_id: &str,
    ) -> Result<InterfaceEndpoint, ApiError> {
        self.get(interface_endpoint_path(
            project_id,
            provider_name,
            private_link_id,
            endpoint_id,
        ))
        .await
    }

    pub async fn delete_interface_endpoint(
        &self,
        project_id: &str,
        provider_name: &str,
        private_link_id: &str,
        endpoint_id: &str,
    ) -> Result<(), ApiError> {
        self.delete(interface_endpoint_path(
            project_id,
            provider_name,
            private_link_id,
            endpoint_id,
        ))
        .await
    }

    // Serverless instances

    pub async fn create_serverless_instance(
        &self,
        project_id: &str,
        instance: &ServerlessInstance,
    ) -> Result<ServerlessInstance, ApiError> {
        self.send(
            Method::POST,
            format!("{API_V1}/groups/{}/serverless", encode(project_id)),
            instance,
        )
        .await
    }

    pub async fn get_serverless_instance(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<ServerlessInstance, ApiError> {
        self.get(serverless_path(project_id, name)).await
    }

    pub async fn update_serverless_instance(
        &self,
        project_id: &str,
        name: &str,
        instance: &ServerlessInstance,
    ) -> Result<ServerlessInstance, ApiError> {
        self.send(Method::PATCH, serverless_path(project_id, name), instance)
            .await
    }

    pub async fn list_serverless_instances(
        &self,
        project_id: &str,
    ) -> Result<Paginated<ServerlessInstance>, ApiError> {
        self.get(format!("{API_V1}/groups/{}/serverless", encode(project_id)))
            .await
    }

    pub async fn delete_serverless_instance(
        &self,
        project_id: &str,
        name: &str,
    ) -> Result<(), ApiError> {
        self.delete(serverless_path(project_id, name)).await
    }

    // Serverless private endpoints

    pub async fn create_serverless_endpoint(
        &self,
        project_id: &str,
        instance_name: &str,
    ) -> Result<ServerlessEndpoint, ApiError> {
        self.send(
            Method::POST,
            serverless_endpoint_path(project_id, instance_name),
            &json!({ "comment": "create" }),
        )
        .await
    }

    pub async fn get_serverless_endpoint(
        &self,
        project_id: &str,
        instance_name: &str,
        endpoint_id: &str,
    ) -> Result<ServerlessEndpoint, ApiError> {
        self.get(format!(
            "{}/{}",
            serverless_endpoint_path(project_id, instance_name),
            encode(endpoint_id)
        ))
        .await
    }

    /// Links the cloud side of a serverless private endpoint, or edits its comment
    pub async fn update_serverless_endpoint(
        &self,
        project_id: &str,
        instance_name: &str,
        endpoint_id: &str,
        endpoint: &ServerlessEndpoint,
    ) -> Result<ServerlessEndpoint, ApiError> {
        self.send(
            Method::PATCH,
            format!(
                "{}/{}",
                serverless_endpoint_path(project_id, instance_name),
                encode(endpoint_id)
            ),
            endpoint,
        )
        .await
    }

    pub async fn delete_serverless_endpoint(
        &self,
        project_id: &str,
        instance_name: &str,
        endpoint_id: &str,
    ) -> Result<(), ApiError> {
        self.delete(format!(
            "{}/{}",
            serverless_endpoint_path(project_id, instance_name),
            encode(endpoint_id)
        ))
        .await
    }
}

fn container_path(project_id: &str, container_id: &str) -> String {
    format!(
        "{API_V1}/groups/{}/containers/{}",
        encode(project_id),
        encode(container_id)
    )
}

fn peer_path(project_id: &str, peer_id: &str) -> String {
    format!(
        "{API_V1}/groups/{}/peers/{}",
        encode(project_id),
        encode(peer_id)
    )
}

fn endpoint_service_path(project_id: &str, provider_name: &str, private_link_id: &str) -> String {
    format!(
        "{API_V1}/groups/{}/privateEndpoint/{}/endpointService/{}",
        encode(project_id),
        encode(provider_name),
        encode(private_link_id)
    )
}

fn interface_endpoint_path(
    project_id: &str,
    provider_name: &str,
    private_link_id: &str,
    endpoint_id: &str,
) -> String {
    format!(
        "{}/endpoint/{}",
        endpoint_service_path(project_id, provider_name, private_link_id),
        encode(endpoint_id)
    )
}

fn serverless_path(project_id: &str, name: &str) -> String {
    format!(
        "{API_V1}/groups/{}/serverless/{}",
        encode(project_id),
        encode(name)
    )
}

fn serverless_endpoint_path(project_id: &str, instance_name: &str) -> String {
    format!(
        "{API_V1}/groups/{}/privateEndpoint/serverless/instance/{}/endpoint",
        encode(project_id),
        encode(instance_name)
    )
}

/// Client shared by every resource of the provider, set once configured
#[derive(Debug, Default, Clone)]
pub struct ClientHandle(Arc<RwLock<Option<AtlasClient>>>);

impl ClientHandle {
    pub async fn set(&self, client: AtlasClient) {
        *self.0.write().await = Some(client);
    }

    pub async fn get(&self, diags: &mut Diagnostics) -> Option<AtlasClient> {
        let client = self.0.read().await.clone();
        if client.is_none() {
            diags.root_error(
                "Provider is not configured",
                "The MongoDB Atlas client is used before the provider block has been configured.",
            );
        }
        client
    }

    #[cfg(test)]
    pub fn with_client(client: AtlasClient) -> Self {
        Self(Arc::new(RwLock::new(Some(client))))
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{MockReply, MockTransport};
    use super::*;

    #[tokio::test]
    async fn paths_are_encoded() {
        let mock = MockTransport::default();
        mock.on(
            Method::GET,
            "/api/atlas/v1.0/groups/byName/my%20project",
            MockReply::Json(json!({"id": "p1", "name": "my project"})),
        );
        let client = AtlasClient::new(mock.clone());

        let project = client.get_project_by_name("my project").await.unwrap();
        assert_eq!(project.id.as_deref(), Some("p1"));
        assert_eq!(mock.calls().len(), 1);
    }

    #[tokio::test]
    async fn api_errors_keep_status() {
        let mock = MockTransport::default();
        mock.on(
            Method::GET,
            "/api/atlas/v1.0/groups/p1/peers/x",
            MockReply::Status(404),
        );
        let client = AtlasClient::new(mock);

        let err = client.get_peer("p1", "x").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));
        assert!(!ApiError::Transport("reset".into()).is_not_found());
    }

    #[tokio::test]
    async fn owner_id_goes_to_query() {
        let mock = MockTransport::default();
        mock.on(
            Method::POST,
            "/api/atlas/v1.0/groups?projectOwnerId=u1",
            MockReply::Json(json!({"id": "p1"})),
        );
        let client = AtlasClient::new(mock.clone());
        let project = Project {
            name: Some("n".into()),
            org_id: Some("o".into()),
            ..Default::default()
        };

        client.create_project(&project, Some("u1")).await.unwrap();
        let calls = mock.calls();
        assert_eq!(calls[0].body, Some(json!({"name": "n", "orgId": "o"})));
    }

    #[tokio::test]
    async fn unconfigured_handle_reports_error() {
        let mut diags = Diagnostics::default();
        assert!(ClientHandle::default().get(&mut diags).await.is_none());
        assert_eq!(diags.errors.len(), 1);
    }
}
