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

//! Scripted in-memory transport for resource tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value as Json;

use super::{ApiError, Transport};

#[derive(Debug, Clone)]
pub enum MockReply {
    Json(Json),
    Status(u16),
    Transport(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub method: Method,
    pub path: String,
    pub body: Option<Json>,
}

#[derive(Debug, Default)]
struct Inner {
    routes: HashMap<(Method, String), VecDeque<MockReply>>,
    calls: Vec<MockCall>,
}

/// Answers requests from a route table; the last reply of a route repeats
#[derive(Debug, Default, Clone)]
pub struct MockTransport(Arc<Mutex<Inner>>);

impl MockTransport {
    pub fn on(&self, method: Method, path: &str, reply: MockReply) -> &Self {
        self.0
            .lock()
            .unwrap()
            .routes
            .entry((method, path.to_owned()))
            .or_default()
            .push_back(reply);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.0.lock().unwrap().calls.clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.method == method && call.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Json>,
    ) -> Result<Json, ApiError> {
        let reply = {
            let mut inner = self.0.lock().unwrap();
            inner.calls.push(MockCall {
                method: method.clone(),
                path: path.to_owned(),
                body,
            });
            match inner.routes.get_mut(&(method.clone(), path.to_owned())) {
                Some(replies) if replies.len() > 1 => replies.pop_front(),
                Some(replies) => replies.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(MockReply::Json(value)) => Ok(value),
            Some(MockReply::Status(status)) => Err(ApiError::Api {
                method,
                path: path.to_owned(),
                status,
                error_code: "MOCK".to_owned(),
                detail: format!("mocked HTTP {status}"),
            }),
            Some(MockReply::Transport(reason)) => Err(ApiError::Transport(reason.to_owned())),
            None => Err(ApiError::Api {
                method,
                path: path.to_owned(),
                status: 501,
                error_code: "UNMOCKED".to_owned(),
                detail: "no reply scripted for this route".to_owned(),
            }),
        }
    }
}
