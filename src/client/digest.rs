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

//! HTTP Digest access authentication (RFC 2617, MD5).

use crypto::digest::Digest;
use crypto::md5::Md5;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};

use super::ApiError;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub realm: String,
    pub nonce: String,
    pub opaque: Option<String>,
    pub algorithm: Option<String>,
    /// Whether the server offered `qop=auth`
    pub qop_auth: bool,
}

impl Challenge {
    /// Parses the value of a `WWW-Authenticate` header
    pub fn parse(header: &str) -> Result<Self, ApiError> {
        let params = header
            .trim()
            .strip_prefix("Digest")
            .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
            .ok_or_else(|| ApiError::Auth(format!("not a digest challenge: {header}")))?;

        let mut challenge = Challenge::default();
        for (key, value) in split_params(params)? {
            match key.to_ascii_lowercase().as_str() {
                "realm" => challenge.realm = value,
                "nonce" => challenge.nonce = value,
                "opaque" => challenge.opaque = Some(value),
                "algorithm" => challenge.algorithm = Some(value),
                "qop" => {
                    challenge.qop_auth = value.split(',').any(|qop| qop.trim() == "auth");
                }
                _ => (),
            }
        }

        if challenge.nonce.is_empty() {
            return Err(ApiError::Auth("digest challenge has no nonce".to_owned()));
        }
        if let Some(algorithm) = &challenge.algorithm {
            if !algorithm.eq_ignore_ascii_case("MD5") {
                return Err(ApiError::Auth(format!(
                    "unsupported digest algorithm {algorithm}"
                )));
            }
        }
        Ok(challenge)
    }

    /// Value of the `Authorization` header answering this challenge
    pub fn respond(
        &self,
        username: &str,
        password: &str,
        method: &str,
        uri: &str,
        nc: u32,
        cnonce: &str,
    ) -> String {
        let ha1 = md5_hex(&format!("{username}:{}:{password}", self.realm));
        let ha2 = md5_hex(&format!("{method}:{uri}"));
        let nc = format!("{nc:08x}");

        let mut header = format!(
            r#"Digest username="{username}", realm="{}", nonce="{}", uri="{uri}""#,
            self.realm, self.nonce
        );
        if self.qop_auth {
            let response = md5_hex(&format!("{ha1}:{}:{nc}:{cnonce}:auth:{ha2}", self.nonce));
            header.push_str(&format!(
                r#", qop=auth, nc={nc}, cnonce="{cnonce}", response="{response}""#
            ));
        } else {
            let response = md5_hex(&format!("{ha1}:{}:{ha2}", self.nonce));
            header.push_str(&format!(r#", response="{response}""#));
        }
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{opaque}""#));
        }
        if let Some(algorithm) = &self.algorithm {
            header.push_str(&format!(", algorithm={algorithm}"));
        }
        header
    }
}

pub fn cnonce() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

fn md5_hex(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.input_str(input);
    hasher.result_str()
}

/// Splits `key=value, key="quoted, value"` lists
fn split_params(params: &str) -> Result<Vec<(String, String)>, ApiError> {
    let mut result = Vec::new();
    let mut rest = params.trim_start();

    while !rest.is_empty() {
        let (key, after_key) = rest
            .split_once('=')
            .ok_or_else(|| ApiError::Auth(format!("malformed digest parameter `{rest}`")))?;
        let key = key.trim().to_owned();
        let after_key = after_key.trim_start();

        let (value, after_value) = if let Some(quoted) = after_key.strip_prefix('"') {
            let end = quoted
                .find('"')
                .ok_or_else(|| ApiError::Auth(format!("unterminated value for `{key}`")))?;
            (quoted[..end].to_owned(), &quoted[end + 1..])
        } else {
            let end = after_key.find(',').unwrap_or(after_key.len());
            (after_key[..end].trim().to_owned(), &after_key[end..])
        };

        result.push((key, value));
        rest = after_value.trim_start();
        rest = rest.strip_prefix(',').unwrap_or(rest).trim_start();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC_CHALLENGE: &str = r#"Digest realm="testrealm@host.com", qop="auth,auth-int", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#;

    #[test]
    fn parse_rfc_challenge() {
        let challenge = Challenge::parse(RFC_CHALLENGE).unwrap();
        assert_eq!(
            challenge,
            Challenge {
                realm: "testrealm@host.com".to_owned(),
                nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".to_owned(),
                opaque: Some("5ccc069c403ebaf9f0171e9517f40e41".to_owned()),
                algorithm: None,
                qop_auth: true,
            }
        );
    }

    #[test]
    fn respond_to_rfc_challenge() {
        let challenge = Challenge::parse(RFC_CHALLENGE).unwrap();
        let header = challenge.respond(
            "Mufasa",
            "Circle Of Life",
            "GET",
            "/dir/index.html",
            1,
            "0a4f113b",
        );
        assert!(header.contains(r#"response="6629fae49393a05397450978507c4ef1""#));
        assert!(header.contains("nc=00000001"));
        assert!(header.contains(r#"cnonce="0a4f113b""#));
        assert!(header.contains(r#"opaque="5ccc069c403ebaf9f0171e9517f40e41""#));
        assert!(header.starts_with(r#"Digest username="Mufasa", realm="testrealm@host.com""#));
    }

    #[test]
    fn atlas_style_challenge() {
        let challenge = Challenge::parse(
            r#"Digest realm="MMS Public API", domain="", nonce="abc/def+==", algorithm=MD5, qop="auth", stale=false"#,
        )
        .unwrap();
        assert_eq!(challenge.realm, "MMS Public API");
        assert_eq!(challenge.nonce, "abc/def+==");
        assert_eq!(challenge.algorithm.as_deref(), Some("MD5"));
        assert!(challenge.qop_auth);
    }

    #[test]
    fn rejects_other_schemes() {
        assert!(matches!(
            Challenge::parse(r#"Basic realm="x""#),
            Err(ApiError::Auth(_))
        ));
        assert!(matches!(
            Challenge::parse(r#"Digest realm="x""#),
            Err(ApiError::Auth(_))
        ));
        assert!(matches!(
            Challenge::parse(r#"Digest realm="x", nonce="n", algorithm=SHA-256"#),
            Err(ApiError::Auth(_))
        ));
    }

    #[test]
    fn cnonce_is_alphanumeric() {
        let nonce = cnonce();
        assert_eq!(nonce.len(), 16);
        assert!(nonce.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
