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

/// Region names accepted by Atlas network containers, across AWS, Azure and GCP
const ATLAS_REGIONS: &[&str] = &[
    "US_EAST_1",
    "US_EAST_2",
    "US_WEST_1",
    "US_WEST_2",
    "CA_CENTRAL_1",
    "SA_EAST_1",
    "AP_NORTHEAST_1",
    "AP_NORTHEAST_2",
    "AP_SOUTH_1",
    "AP_SOUTHEAST_1",
    "AP_SOUTHEAST_2",
    "EU_CENTRAL_1",
    "EU_NORTH_1",
    "EU_WEST_1",
    "EU_WEST_2",
    "EU_WEST_3",
    "AZURE",
    "AZURE_CHINA",
    "AZURE_GERMANY",
    "US_CENTRAL",
    "US_EAST",
    "US_NORTH_CENTRAL",
    "US_WEST",
    "US_SOUTH_CENTRAL",
    "BRAZIL_SOUTH",
    "CANADA_EAST",
    "CANADA_CENTRAL",
    "EUROPE_NORTH",
    "EUROPE_WEST",
    "UK_SOUTH",
    "UK_WEST",
    "FRANCE_CENTRAL",
    "ASIA_EAST",
    "ASIA_SOUTH_EAST",
    "AUSTRALIA_EAST",
    "AUSTRALIA_SOUTH_EAST",
    "INDIA_CENTRAL",
    "INDIA_SOUTH",
    "INDIA_WEST",
    "JAPAN_EAST",
    "JAPAN_WEST",
    "KOREA_CENTRAL",
    "KOREA_SOUTH",
    "SOUTH_AFRICA_NORTH",
    "UAE_NORTH",
    "CENTRAL_US",
    "EASTERN_US",
    "US_EAST_4",
    "NORTH_AMERICA_NORTHEAST_1",
    "SOUTH_AMERICA_EAST_1",
    "WESTERN_US",
    "EASTERN_ASIA_PACIFIC",
    "ASIA_EAST_2",
    "NORTHEASTERN_ASIA_PACIFIC",
    "ASIA_NORTHEAST_2",
    "SOUTHEASTERN_ASIA_PACIFIC",
    "ASIA_SOUTH_1",
    "AUSTRALIA_SOUTHEAST_1",
    "WESTERN_EUROPE",
    "EUROPE_NORTH_1",
    "EUROPE_WEST_2",
    "EUROPE_WEST_3",
    "EUROPE_WEST_4",
    "EUROPE_WEST_6",
];

/// Canonical Atlas spelling of a region (`us-east-1` -> `US_EAST_1`)
pub fn atlas_region(name: &str) -> Option<&'static str> {
    let wanted = name.replace('-', "_");
    ATLAS_REGIONS
        .iter()
        .copied()
        .find(|region| region.eq_ignore_ascii_case(&wanted))
}

/// Spelling used by AWS peering connections (`US_EAST_1` -> `us-east-1`)
pub fn peering_region(name: &str) -> Option<String> {
    atlas_region(name).map(|region| region.to_ascii_lowercase().replace('_', "-"))
}

/// Container regions are reported in Atlas form; peering expects the AWS form
pub fn container_region_to_peering(name: &str) -> String {
    name.to_ascii_lowercase().replace('_', "-")
}
