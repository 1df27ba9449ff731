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
use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType};
use tf_provider::value::{ValueBool, ValueNumber, ValueString};
use tf_provider::Schema;

use crate::client::models::{Project, ProjectSettings};
use crate::utils::{attribute, known_bool, opt_bool, opt_number, opt_string, schema, WithSchema};

mod data_source;
mod resource;

pub use data_source::ProjectDataSource;
pub use resource::ProjectResource;

/// Default value of `with_default_alerts_settings`
const DEFAULT_ALERTS_SETTINGS: bool = true;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectState<'a> {
    pub id: ValueString<'a>,
    pub name: ValueString<'a>,
    pub org_id: ValueString<'a>,
    pub project_owner_id: ValueString<'a>,
    pub with_default_alerts_settings: ValueBool,
    pub region_usage_restrictions: ValueString<'a>,
    pub cluster_count: ValueNumber,
    pub created: ValueString<'a>,
    pub is_collect_database_specifics_statistics_enabled: ValueBool,
    pub is_data_explorer_enabled: ValueBool,
    pub is_extended_storage_sizes_enabled: ValueBool,
    pub is_performance_advisor_enabled: ValueBool,
    pub is_realtime_performance_panel_enabled: ValueBool,
    pub is_schema_advisor_enabled: ValueBool,
}

/// Settings flags, in the order of the `*_flags` accessors
const FLAGS: [(&str, &str); 6] = [
    (
        "is_collect_database_specifics_statistics_enabled",
        "Collect database specific metrics and statistics",
    ),
    (
        "is_data_explorer_enabled",
        "Enable the Data Explorer for the project",
    ),
    (
        "is_extended_storage_sizes_enabled",
        "Allow extended storage sizes for clusters",
    ),
    (
        "is_performance_advisor_enabled",
        "Enable the Performance Advisor and Profiler",
    ),
    (
        "is_realtime_performance_panel_enabled",
        "Enable the Real Time Performance Panel",
    ),
    ("is_schema_advisor_enabled", "Enable the Schema Advisor"),
];

fn flag_attributes(constraint: AttributeConstraint) -> [(&'static str, Attribute); 6] {
    FLAGS.map(|(name, description)| {
        (
            name,
            attribute(AttributeType::Bool, constraint.clone(), description),
        )
    })
}

fn remote_flags(settings: &ProjectSettings) -> [Option<bool>; 6] {
    [
        settings.is_collect_database_specifics_statistics_enabled,
        settings.is_data_explorer_enabled,
        settings.is_extended_storage_sizes_enabled,
        settings.is_performance_advisor_enabled,
        settings.is_realtime_performance_panel_enabled,
        settings.is_schema_advisor_enabled,
    ]
}

fn remote_flags_mut(settings: &mut ProjectSettings) -> [&mut Option<bool>; 6] {
    [
        &mut settings.is_collect_database_specifics_statistics_enabled,
        &mut settings.is_data_explorer_enabled,
        &mut settings.is_extended_storage_sizes_enabled,
        &mut settings.is_performance_advisor_enabled,
        &mut settings.is_realtime_performance_panel_enabled,
        &mut settings.is_schema_advisor_enabled,
    ]
}

impl<'a> ProjectState<'a> {
    fn flags(&self) -> [&ValueBool; 6] {
        [
            &self.is_collect_database_specifics_statistics_enabled,
            &self.is_data_explorer_enabled,
            &self.is_extended_storage_sizes_enabled,
            &self.is_performance_advisor_enabled,
            &self.is_realtime_performance_panel_enabled,
            &self.is_schema_advisor_enabled,
        ]
    }

    fn flags_mut(&mut self) -> [&mut ValueBool; 6] {
        [
            &mut self.is_collect_database_specifics_statistics_enabled,
            &mut self.is_data_explorer_enabled,
            &mut self.is_extended_storage_sizes_enabled,
            &mut self.is_performance_advisor_enabled,
            &mut self.is_realtime_performance_panel_enabled,
            &mut self.is_schema_advisor_enabled,
        ]
    }

    /// Applies the configured flags on top of the remote settings
    fn merge_settings(&self, settings: &mut ProjectSettings) {
        for (configured, remote) in self.flags().into_iter().zip(remote_flags_mut(settings)) {
            if let Some(value) = known_bool(configured) {
                *remote = Some(value);
            }
        }
    }

    fn settings_changed(&self, other: &Self) -> bool {
        self.flags() != other.flags()
    }

    /// Overwrites every remote attribute with the value Atlas reports
    fn apply(&mut self, project: Project, settings: &ProjectSettings) {
        self.id = opt_string(project.id);
        self.name = opt_string(project.name);
        self.org_id = opt_string(project.org_id);
        self.cluster_count = opt_number(project.cluster_count);
        self.created = opt_string(project.created);
        if project.region_usage_restrictions.is_some() {
            self.region_usage_restrictions = opt_string(project.region_usage_restrictions);
        }
        if project.with_default_alerts_settings.is_some() {
            self.with_default_alerts_settings = opt_bool(project.with_default_alerts_settings);
        }
        for (flag, remote) in self.flags_mut().into_iter().zip(remote_flags(settings)) {
            *flag = opt_bool(remote);
        }
    }
}

impl<'a> WithSchema for ProjectState<'a> {
    fn schema() -> Schema {
        let [f0, f1, f2, f3, f4, f5] = flag_attributes(AttributeConstraint::OptionalComputed);
        schema(
            "An Atlas project, the unit grouping clusters, network settings and access lists",
            [
                (
                    "id",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::Computed,
                        "Unique identifier of the project",
                    ),
                ),
                (
                    "name",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::Required,
                        "Name of the project",
                    ),
                ),
                (
                    "org_id",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::Required,
                        "Organization the project belongs to",
                    ),
                ),
                (
                    "project_owner_id",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::Optional,
                        "Atlas user granted the Project Owner role on creation",
                    ),
                ),
                (
                    "with_default_alerts_settings",
                    attribute(
                        AttributeType::Bool,
                        AttributeConstraint::OptionalComputed,
                        "Create the project with the default alert settings",
                    ),
                ),
                (
                    "region_usage_restrictions",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::Optional,
                        "Restricts the regions of the project, for Atlas for Government",
                    ),
                ),
                (
                    "cluster_count",
                    attribute(
                        AttributeType::Number,
                        AttributeConstraint::Computed,
                        "Number of clusters in the project",
                    ),
                ),
                (
                    "created",
                    attribute(
                        AttributeType::String,
                        AttributeConstraint::Computed,
                        "Creation date of the project",
                    ),
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

#[cfg(test)]
mod tests {
    use tf_provider::value::Value;

    use super::*;

    #[test]
    fn configured_flags_override_remote() {
        let state = ProjectState {
            is_data_explorer_enabled: Value::Value(false),
            is_schema_advisor_enabled: Value::Unknown,
            ..Default::default()
        };
        let mut remote = ProjectSettings {
            is_data_explorer_enabled: Some(true),
            is_schema_advisor_enabled: Some(true),
            ..Default::default()
        };
        state.merge_settings(&mut remote);
        assert_eq!(remote.is_data_explorer_enabled, Some(false));
        assert_eq!(remote.is_schema_advisor_enabled, Some(true));
        assert_eq!(remote.is_performance_advisor_enabled, None);
    }

    #[test]
    fn apply_keeps_unreported_inputs() {
        let mut state = ProjectState {
            project_owner_id: crate::utils::string("u1"),
            with_default_alerts_settings: Value::Value(false),
            ..Default::default()
        };
        state.apply(
            Project {
                id: Some("p1".into()),
                name: Some("n".into()),
                org_id: Some("o".into()),
                cluster_count: Some(2),
                created: Some("2024-01-01T00:00:00Z".into()),
                ..Default::default()
            },
            &ProjectSettings {
                is_data_explorer_enabled: Some(true),
                ..Default::default()
            },
        );
        assert_eq!(state.cluster_count, Value::Value(2));
        assert_eq!(state.with_default_alerts_settings, Value::Value(false));
        assert_eq!(state.is_data_explorer_enabled, Value::Value(true));
        assert!(state.is_schema_advisor_enabled.is_null());
        assert_eq!(state.project_owner_id, crate::utils::string("u1"));
    }
}
