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

use std::borrow::Cow;
use std::cell::RefCell;
use std::fmt::Display;

use tf_provider::schema::{Attribute, AttributeConstraint, AttributeType, Block, Description};
use tf_provider::value::{Value, ValueBool, ValueList, ValueNumber, ValueString};
use tf_provider::{AttributePath, Diagnostics, Schema};

pub(crate) trait WithSchema {
    fn schema() -> Schema;
}

pub(crate) trait ValueExt {
    /// The string held by a known, non-empty value
    fn as_known_str(&self) -> Option<&str>;
    /// The string held by the value, or `""`
    fn as_str_or_empty(&self) -> &str {
        self.as_known_str().unwrap_or_default()
    }
    /// A value that is either known or still to be computed
    fn is_set(&self) -> bool;
}

impl<'a> ValueExt for ValueString<'a> {
    fn as_known_str(&self) -> Option<&str> {
        match self {
            Value::Value(s) if !s.is_empty() => Some(s.as_ref()),
            _ => None,
        }
    }
    fn is_set(&self) -> bool {
        match self {
            Value::Value(s) => !s.is_empty(),
            Value::Unknown => true,
            Value::Null => false,
        }
    }
}

pub(crate) fn known_bool(value: &ValueBool) -> Option<bool> {
    match value {
        Value::Value(b) => Some(*b),
        _ => None,
    }
}

pub(crate) fn string<'a>(s: impl Into<String>) -> ValueString<'a> {
    Value::Value(Cow::Owned(s.into()))
}

/// Null when the API omitted the field
pub(crate) fn opt_string<'a>(s: Option<String>) -> ValueString<'a> {
    match s {
        Some(s) => string(s),
        None => Value::Null,
    }
}

pub(crate) fn opt_bool(b: Option<bool>) -> ValueBool {
    b.map_or(Value::Null, Value::Value)
}

pub(crate) fn opt_number(n: Option<i64>) -> ValueNumber {
    n.map_or(Value::Null, Value::Value)
}

pub(crate) fn string_list<'a>(items: Option<Vec<String>>) -> ValueList<ValueString<'a>> {
    Value::Value(items.unwrap_or_default().into_iter().map(string).collect())
}

pub(crate) fn known_strings(list: &ValueList<ValueString<'_>>) -> Vec<String> {
    match list {
        Value::Value(items) => items
            .iter()
            .filter_map(|item| item.as_known_str().map(str::to_owned))
            .collect(),
        _ => Vec::new(),
    }
}

/// Null values become unknown, so that they are filled at apply time
pub(crate) fn unknown_if_null<T>(value: &mut Value<T>) {
    if value.is_null() {
        *value = Value::Unknown;
    }
}

/// Keeps a value the user configured, otherwise takes the one from the API
pub(crate) fn fill<T>(slot: &mut Value<T>, from_api: Value<T>) {
    if !matches!(slot, Value::Value(_)) {
        *slot = from_api;
    }
}

/// Pushes the path of every attribute whose value differs between two states
pub(crate) fn push_if_changed<T: PartialEq>(
    paths: &mut Vec<AttributePath>,
    name: &str,
    prior: &Value<T>,
    proposed: &Value<T>,
) {
    if prior != proposed {
        paths.push(AttributePath::new(name.to_owned()));
    }
}

pub(crate) fn attribute(
    attr_type: AttributeType,
    constraint: AttributeConstraint,
    description: &'static str,
) -> Attribute {
    Attribute {
        attr_type,
        description: Description::plain(description),
        constraint,
        sensitive: false,
        deprecated: false,
    }
}

pub(crate) fn sensitive_attribute(
    attr_type: AttributeType,
    constraint: AttributeConstraint,
    description: &'static str,
) -> Attribute {
    Attribute {
        sensitive: true,
        ..attribute(attr_type, constraint, description)
    }
}

/// Flat schema made of attributes only
pub(crate) fn schema<const N: usize>(
    description: &'static str,
    attributes: [(&'static str, Attribute); N],
) -> Schema {
    Schema {
        version: 1,
        block: Block {
            attributes: attributes
                .into_iter()
                .map(|(name, attribute)| (name.to_owned(), attribute))
                .collect(),
            description: Description::plain(description),
            ..Default::default()
        },
    }
}

/// Reports a failed remote call as an error not tied to an attribute
pub(crate) fn report(diags: &mut Diagnostics, summary: impl Into<String>, err: impl Display) {
    let summary = summary.into();
    tracing::debug!(%err, "{summary}");
    diags.root_error(summary, err.to_string());
}

pub(crate) fn string_list_type() -> AttributeType {
    AttributeType::List(Box::new(AttributeType::String))
}

/// Checks that a configured value belongs to a fixed set
pub(crate) fn validate_one_of(
    diags: &mut Diagnostics,
    name: &str,
    value: &ValueString<'_>,
    allowed: &[&str],
) {
    if let Some(value) = value.as_known_str() {
        if !allowed.contains(&value) {
            diags.error(
                format!("Invalid `{name}`"),
                format!(
                    "expected `{name}` to be one of [{}], got {value}",
                    allowed.iter().join_with(", ")
                ),
                AttributePath::new(name.to_owned()),
            );
        }
    }
}

pub struct DisplayJoiner<'a, T, I>
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    iter: RefCell<T>,
    sep: &'a str,
}

pub trait DisplayJoinable {
    type Joiner<'a>;
    fn join_with(self, sep: &str) -> Self::Joiner<'_>;
}

impl<T, I> DisplayJoinable for T
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    type Joiner<'a> = DisplayJoiner<'a, T, I>;

    fn join_with(self, sep: &str) -> Self::Joiner<'_> {
        DisplayJoiner {
            iter: RefCell::new(self),
            sep,
        }
    }
}

impl<'a, T, I> std::fmt::Display for DisplayJoiner<'a, T, I>
where
    T: Iterator<Item = I>,
    I: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut sep = "";
        let mut iter = self.iter.try_borrow_mut().or(Err(std::fmt::Error))?;
        for elt in iter.by_ref() {
            f.write_str(sep)?;
            f.write_fmt(format_args!("{elt}"))?;
            sep = self.sep;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_with_separator() {
        let joined = ["AWS", "AZURE", "GCP"].iter().join_with(", ").to_string();
        assert_eq!(joined, "AWS, AZURE, GCP");
        assert_eq!(std::iter::empty::<&str>().join_with(", ").to_string(), "");
    }

    #[test]
    fn fill_keeps_configured_values() {
        let mut configured = string("us-east-1");
        fill(&mut configured, string("US_EAST_1"));
        assert_eq!(configured.as_known_str(), Some("us-east-1"));

        let mut unknown: ValueString = Value::Unknown;
        fill(&mut unknown, string("US_EAST_1"));
        assert_eq!(unknown.as_known_str(), Some("US_EAST_1"));
    }

    #[test]
    fn empty_strings_are_not_set() {
        assert!(!string("").is_set());
        assert!(ValueString::Unknown.is_set());
        assert!(!ValueString::Null.is_set());
        assert_eq!(string("").as_str_or_empty(), "");
    }

    #[test]
    fn changed_attributes_accept_runtime_names() {
        let mut paths = Vec::new();
        for (field, prior, proposed) in [("vnet", "a", "b"), ("network", "a", "a")] {
            let name = format!("{field}_name");
            push_if_changed(&mut paths, &name, &string(prior), &string(proposed));
        }
        assert_eq!(paths, [AttributePath::new("vnet_name")]);
    }

    #[test]
    fn one_of_points_at_the_attribute() {
        let mut diags = Diagnostics::default();
        let name = String::from("provider_name");
        validate_one_of(&mut diags, &name, &string("OCI"), &["AWS", "AZURE"]);
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(diags.errors[0].attribute.to_string(), "provider_name");
        assert!(diags.errors[0].detail.contains("AWS, AZURE"));
    }
}
