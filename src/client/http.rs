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

use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value as Json;

use super::digest::{cnonce, Challenge};
use super::{ApiError, ErrorBody, Transport};
use crate::config::ClientConfig;

/// Atlas API over HTTPS with digest authentication
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    public_key: String,
    private_key: String,
    nonce_count: AtomicU32,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(|err| ApiError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            public_key: config.public_key.clone(),
            private_key: config.private_key.clone(),
            nonce_count: AtomicU32::new(0),
        })
    }

    fn request(&self, method: &Method, path: &str, body: Option<&Json>) -> RequestBuilder {
        let request = self
            .client
            .request(method.clone(), format!("{}{path}", self.base_url))
            .header(ACCEPT, "application/json");
        match body {
            Some(body) => request.json(body),
            None => request,
        }
    }

    fn authorization(&self, response: &Response, method: &Method, path: &str) -> Option<String> {
        let header = response
            .headers()
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find(|value| value.trim_start().starts_with("Digest"))?;

        match Challenge::parse(header) {
            Ok(challenge) => {
                let nc = self.nonce_count.fetch_add(1, Ordering::Relaxed) + 1;
                Some(challenge.respond(
                    &self.public_key,
                    &self.private_key,
                    method.as_str(),
                    path,
                    nc,
                    &cnonce(),
                ))
            }
            Err(err) => {
                tracing::warn!(%err, "ignoring malformed digest challenge");
                None
            }
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Json>,
    ) -> Result<Json, ApiError> {
        tracing::debug!(%method, path, "atlas request");

        let mut response = self
            .request(&method, path, body.as_ref())
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::UNAUTHORIZED {
            if let Some(authorization) = self.authorization(&response, &method, path) {
                response = self
                    .request(&method, path, body.as_ref())
                    .header(AUTHORIZATION, authorization)
                    .send()
                    .await
                    .map_err(transport_error)?;
            }
        }

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let error: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
            tracing::debug!(%method, path, status = status.as_u16(), error_code = %error.error_code, "atlas error");
            return Err(ApiError::Api {
                method,
                path: path.to_owned(),
                status: status.as_u16(),
                error_code: error.error_code,
                detail: if error.detail.is_empty() {
                    status.canonical_reason().unwrap_or_default().to_owned()
                } else {
                    error.detail
                },
            });
        }

        if text.trim().is_empty() {
            return Ok(Json::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    ApiError::Transport(err.to_string())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn transport(server: &MockServer) -> HttpTransport {
        HttpTransport::new(&ClientConfig {
            public_key: "public".to_owned(),
            private_key: "private".to_owned(),
            base_url: format!("{}/", server.uri()),
            user_agent: "terraform-provider-mongodbatlas/test".to_owned(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn digest_challenge_is_answered() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/atlas/v1.0/groups/p1"))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "p1"})))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/atlas/v1.0/groups/p1"))
            .respond_with(ResponseTemplate::new(401).insert_header(
                "www-authenticate",
                r#"Digest realm="MMS Public API", nonce="n0", algorithm=MD5, qop="auth""#,
            ))
            .with_priority(2)
            .expect(1)
            .mount(&server)
            .await;

        let answer = transport(&server)
            .execute(Method::GET, "/api/atlas/v1.0/groups/p1", None)
            .await
            .unwrap();
        assert_eq!(answer, json!({"id": "p1"}));

        let requests = server.received_requests().await.unwrap();
        let authorization = requests[1].headers.get("authorization").unwrap();
        let authorization = authorization.to_str().unwrap();
        assert!(authorization.starts_with(r#"Digest username="public", realm="MMS Public API""#));
        assert!(authorization.contains(r#"uri="/api/atlas/v1.0/groups/p1""#));
    }

    #[tokio::test]
    async fn atlas_errors_are_decoded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/atlas/v1.0/groups/p1/peers/x"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "detail": "No peer with ID x exists in group p1.",
                "error": 404,
                "errorCode": "PEER_NOT_FOUND",
                "reason": "Not Found"
            })))
            .mount(&server)
            .await;

        let err = transport(&server)
            .execute(Method::GET, "/api/atlas/v1.0/groups/p1/peers/x", None)
            .await
            .unwrap_err();
        match err {
            ApiError::Api {
                status,
                error_code,
                detail,
                ..
            } => {
                assert_eq!(status, 404);
                assert_eq!(error_code, "PEER_NOT_FOUND");
                assert_eq!(detail, "No peer with ID x exists in group p1.");
            }
            other => panic!("expected an API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn body_and_query_are_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/atlas/v1.0/groups"))
            .and(query_param("projectOwnerId", "u1"))
            .and(body_json(json!({"name": "n"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "p1"})))
            .expect(1)
            .mount(&server)
            .await;

        let answer = transport(&server)
            .execute(
                Method::POST,
                "/api/atlas/v1.0/groups?projectOwnerId=u1",
                Some(json!({"name": "n"})),
            )
            .await
            .unwrap();
        assert_eq!(answer["id"], "p1");
    }

    #[tokio::test]
    async fn empty_answer_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/atlas/v1.0/groups/p1"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;

        let answer = transport(&server)
            .execute(Method::DELETE, "/api/atlas/v1.0/groups/p1", None)
            .await
            .unwrap();
        assert_eq!(answer, Json::Null);
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let transport = HttpTransport::new(&ClientConfig {
            base_url: "http://127.0.0.1:9".to_owned(),
            ..Default::default()
        })
        .unwrap();
        let err = transport
            .execute(Method::GET, "/api/atlas/v1.0/groups/p1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
