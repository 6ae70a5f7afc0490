//
// Copyright (c) 2026 TRUSTBRIDGE
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: trustbridge — Confidential model-weight delivery.
//

//! Symmetric key material for tbenc/v1 assets.

use std::fmt;

use rand_core::{OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::KeyError;

/// AES-256 key length in bytes.
pub const KEY_LEN: usize = 32;

/// A 256-bit symmetric key protecting one encrypted asset.
///
/// The key lives only in process memory, is zeroized on drop, and always
/// prints `[REDACTED]` in `Debug` output. Its external encoding is exactly
/// 64 lowercase hex characters; any other form is rejected.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct AssetKey([u8; KEY_LEN]);

impl AssetKey {
    /// Generate a fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        OsRng.fill_bytes(&mut bytes);
        AssetKey(bytes)
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        AssetKey(bytes)
    }

    /// Parse the external encoding: exactly 64 lowercase hex characters.
    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        if s.len() != 2 * KEY_LEN {
            return Err(KeyError::InvalidKeyFormat(format!(
                "expected {} hex characters, got {}",
                2 * KEY_LEN,
                s.len()
            )));
        }
        if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(KeyError::InvalidKeyFormat(
                "key must be lowercase hex".to_string(),
            ));
        }
        let decoded = hex::decode(s)
            .map_err(|e| KeyError::InvalidKeyFormat(format!("invalid hex: {}", e)))?;
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&decoded);
        Ok(AssetKey(bytes))
    }

    /// Export as lowercase hex. The caller is responsible for not leaking
    /// the returned string (do not log it, write it to artifacts, etc.).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for AssetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AssetKey([REDACTED])")
    }
}
