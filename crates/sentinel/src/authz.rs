//
// Copyright (c) 2026 TRUSTBRIDGE
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: trustbridge — Confidential model-weight delivery.
//

//! Client for the external authorization service (control plane).
//!
//! A grant carries the ciphertext and manifest locations plus the decryption
//! key; a denial halts the sentinel before it opens anything downstream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use trustbridge_core::{AssetKey, KeyError};

use crate::config::SentinelConfig;

pub const CLIENT_VERSION: &str = concat!("sentinel/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum AuthzError {
    #[error("authorization denied: {reason}")]
    Denied { reason: String },

    #[error("authorization response invalid: {0}")]
    InvalidResponse(String),

    #[error("authorization key rejected: {0}")]
    Key(#[from] KeyError),

    #[error("authorization transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Serialize, Debug)]
struct AuthorizationRequest<'a> {
    contract_id: &'a str,
    asset_id: &'a str,
    hw_id: &'a str,
    client_version: &'a str,
}

#[derive(Deserialize, Debug)]
struct AuthorizationResponse {
    status: String,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    sas_url: Option<String>,
    #[serde(default)]
    manifest_url: Option<String>,
    #[serde(default)]
    decryption_key_hex: Option<String>,
    #[serde(default)]
    expires_at: Option<String>,
}

/// A successful authorization: where to fetch, and the key to decrypt with.
#[derive(Debug)]
pub struct AuthorizationGrant {
    pub sas_url: String,
    pub manifest_url: String,
    pub key: AssetKey,
    pub expires_at: Option<DateTime<Utc>>,
}

pub fn authorize(
    client: &reqwest::blocking::Client,
    cfg: &SentinelConfig,
) -> Result<AuthorizationGrant, AuthzError> {
    let url = format!(
        "{}/api/v1/license/authorize",
        cfg.authorization_endpoint.trim_end_matches('/')
    );
    let request = AuthorizationRequest {
        contract_id: &cfg.contract_id,
        asset_id: &cfg.asset_id,
        hw_id: &cfg.hw_id,
        client_version: CLIENT_VERSION,
    };

    let response: AuthorizationResponse = client
        .post(&url)
        .json(&request)
        .send()?
        .error_for_status()?
        .json()?;

    grant_from_response(response)
}

fn grant_from_response(
    response: AuthorizationResponse,
) -> Result<AuthorizationGrant, AuthzError> {
    match response.status.as_str() {
        "authorized" => {
            let sas_url = response
                .sas_url
                .ok_or_else(|| AuthzError::InvalidResponse("grant without sas_url".to_string()))?;
            let manifest_url = response.manifest_url.ok_or_else(|| {
                AuthzError::InvalidResponse("grant without manifest_url".to_string())
            })?;
            let key_hex = response.decryption_key_hex.ok_or_else(|| {
                AuthzError::InvalidResponse("grant without decryption_key_hex".to_string())
            })?;
            let key = AssetKey::from_hex(&key_hex)?;

            // Expiry is informational; an unparseable timestamp is a broken grant.
            let expires_at = response
                .expires_at
                .map(|raw| {
                    DateTime::parse_from_rfc3339(&raw)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(|e| {
                            AuthzError::InvalidResponse(format!("bad expires_at {:?}: {}", raw, e))
                        })
                })
                .transpose()?;

            Ok(AuthorizationGrant {
                sas_url,
                manifest_url,
                key,
                expires_at,
            })
        }
        "denied" => Err(AuthzError::Denied {
            reason: response
                .reason
                .unwrap_or_else(|| "unspecified".to_string()),
        }),
        other => Err(AuthzError::InvalidResponse(format!(
            "unknown status {:?}",
            other
        ))),
    }
}
