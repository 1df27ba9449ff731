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

//! Composite resource identifiers.
//!
//! Resources without a single natural remote key store all their identifying
//! fields in the Terraform `id`. Each pair is written `base64(key):base64(value)`
//! and pairs are joined with `-`, which the standard base64 alphabet never uses.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;
use tf_provider::value::ValueString;
use tf_provider::{AttributePath, Diagnostics};

use crate::utils::ValueExt;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateIdError {
    #[error("malformed state id segment `{0}`")]
    Malformed(String),
    #[error("state id segment `{segment}` is not valid base64: {reason}")]
    Base64 { segment: String, reason: String },
    #[error("state id has no `{0}` key")]
    MissingKey(String),
    #[error("import format error: use the format {0}")]
    ImportFormat(&'static str),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StateId(BTreeMap<String, String>);

impl StateId {
    pub fn new<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Pairs are emitted in key order, so equal maps always encode to the same id
    pub fn encode(&self) -> String {
        let mut encoded = String::new();
        for (key, value) in &self.0 {
            if !encoded.is_empty() {
                encoded.push('-');
            }
            encoded.push_str(&STANDARD.encode(key));
            encoded.push(':');
            encoded.push_str(&STANDARD.encode(value));
        }
        encoded
    }

    pub fn decode(id: &str) -> Result<Self, StateIdError> {
        let mut values = BTreeMap::new();
        if id.is_empty() {
            return Ok(Self(values));
        }
        for segment in id.split('-') {
            let (key, value) = segment
                .split_once(':')
                .ok_or_else(|| StateIdError::Malformed(segment.to_owned()))?;
            values.insert(decode_part(key)?, decode_part(value)?);
        }
        Ok(Self(values))
    }

    pub fn get(&self, key: &str) -> Result<&str, StateIdError> {
        self.0
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| StateIdError::MissingKey(key.to_owned()))
    }

    /// An attribute referencing another resource may hold that resource's
    /// composite id; extract `key` from it, or keep the value as is.
    pub fn resolve(value: &str, key: &str) -> String {
        if !value.contains(':') {
            return value.to_owned();
        }
        match Self::decode(value) {
            Ok(id) => id.get(key).unwrap_or(value).to_owned(),
            Err(_) => value.to_owned(),
        }
    }
}

/// Decodes the `id` attribute of a state, reporting failures on it
pub(crate) fn decode_state_id(diags: &mut Diagnostics, id: &ValueString<'_>) -> Option<StateId> {
    match StateId::decode(id.as_str_or_empty()) {
        Ok(id) => Some(id),
        Err(err) => {
            diags.error("Invalid resource id", err.to_string(), AttributePath::new("id"));
            None
        }
    }
}

/// Splits an import id into exactly `N` non-empty parts, the last part
/// keeping any further separator
pub(crate) fn split_import_id<'a, const N: usize>(
    id: &'a str,
    separator: &str,
    format: &'static str,
) -> Result<[&'a str; N], StateIdError> {
    let parts: Vec<&str> = id.splitn(N, separator).collect();
    let parts: [&str; N] = parts
        .try_into()
        .map_err(|_| StateIdError::ImportFormat(format))?;
    if parts.iter().any(|part| part.is_empty()) {
        return Err(StateIdError::ImportFormat(format));
    }
    Ok(parts)
}

fn decode_part(part: &str) -> Result<String, StateIdError> {
    let bytes = STANDARD
        .decode(part)
        .map_err(|err| StateIdError::Base64 {
            segment: part.to_owned(),
            reason: err.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|err| StateIdError::Base64 {
        segment: part.to_owned(),
        reason: err.to_string(),
    })
}
