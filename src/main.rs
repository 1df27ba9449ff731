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

use anyhow::Result;
use atlas_provider::AtlasProvider;
use tf_provider::serve;

mod atlas_provider;
mod client;
mod config;
mod logging;
mod network_container;
mod network_peering;
mod poll;
mod privatelink_endpoint;
mod privatelink_endpoint_serverless;
mod privatelink_endpoint_service;
mod privatelink_endpoint_service_serverless;
mod project;
mod regions;
mod serverless_instance;
mod state_id;
mod utils;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();
    serve("mongodbatlas", AtlasProvider::default()).await
}
