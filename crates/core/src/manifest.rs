//
// Copyright (c) 2026 TRUSTBRIDGE
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: trustbridge — Confidential model-weight delivery.
//

//! The tbenc/v1 manifest: a small side-car JSON document binding the
//! encryption parameters, asset identity, and ciphertext hash.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;
use crate::format::validate_chunk_bytes;

pub const MANIFEST_FORMAT: &str = "tbenc/v1";
pub const MANIFEST_ALGO: &str = "aes-256-gcm-chunked";
pub const MAX_ASSET_ID_LEN: usize = 100;

/// Parsed manifest. Unknown JSON keys are ignored on read; all fields below
/// are required and validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub format: String,
    pub algo: String,
    pub chunk_bytes: u32,
    pub plaintext_bytes: u64,
    pub sha256_ciphertext: String,
    pub asset_id: String,
    pub weights_filename: String,
}

impl Manifest {
    /// Build a manifest for a freshly produced ciphertext.
    pub fn new(
        chunk_bytes: u32,
        plaintext_bytes: u64,
        sha256_ciphertext: String,
        asset_id: String,
        weights_filename: String,
    ) -> Self {
        Manifest {
            format: MANIFEST_FORMAT.to_string(),
            algo: MANIFEST_ALGO.to_string(),
            chunk_bytes,
            plaintext_bytes,
            sha256_ciphertext,
            asset_id,
            weights_filename,
        }
    }

    /// Parse and validate manifest JSON.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ManifestError> {
        let manifest: Manifest = serde_json::from_slice(bytes)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read and validate a manifest file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        Self::from_slice(&fs::read(path)?)
    }

    /// Validate required field contents against the format constants.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.format != MANIFEST_FORMAT {
            return Err(ManifestError::InvalidField(format!(
                "format must be {:?}, got {:?}",
                MANIFEST_FORMAT, self.format
            )));
        }
        if self.algo != MANIFEST_ALGO {
            return Err(ManifestError::InvalidField(format!(
                "algo must be {:?}, got {:?}",
                MANIFEST_ALGO, self.algo
            )));
        }
        validate_chunk_bytes(self.chunk_bytes)
            .map_err(|e| ManifestError::InvalidField(e.to_string()))?;
        if !is_sha256_hex(&self.sha256_ciphertext) {
            return Err(ManifestError::InvalidField(
                "sha256_ciphertext must be 64 lowercase hex characters".to_string(),
            ));
        }
        if !is_valid_asset_id(&self.asset_id) {
            return Err(ManifestError::InvalidField(format!(
                "asset_id must match [A-Za-z0-9_-]{{1,{}}}, got {:?}",
                MAX_ASSET_ID_LEN, self.asset_id
            )));
        }
        if self.weights_filename.is_empty() {
            return Err(ManifestError::InvalidField(
                "weights_filename must not be empty".to_string(),
            ));
        }
        if self.weights_filename.contains(['/', '\\']) {
            return Err(ManifestError::InvalidField(format!(
                "weights_filename must be a bare file name, got {:?}",
                self.weights_filename
            )));
        }
        Ok(())
    }

    /// Serialize with 2-space indentation and write atomically: the bytes go
    /// to a temp file in the target directory, renamed into place on success.
    pub fn write_atomic<P: AsRef<Path>>(&self, path: P) -> Result<(), ManifestError> {
        let path = path.as_ref();
        self.validate()?;

        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');

        let tmp = sibling_tmp_path(path);
        fs::write(&tmp, &bytes)?;
        if let Err(e) = fs::rename(&tmp, path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }
}

/// Asset IDs are short identifiers: alphanumeric, `-`, `_`, at most 100 chars.
pub fn is_valid_asset_id(s: &str) -> bool {
    !s.is_empty()
        && s.len() <= MAX_ASSET_ID_LEN
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn is_sha256_hex(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

fn sibling_tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        Manifest::new(
            4_194_304,
            16_777_216,
            "a".repeat(64),
            "llama-3-70b-v1".to_string(),
            "model.tbenc".to_string(),
        )
    }

    #[test]
    fn test_json_roundtrip() {
        let manifest = sample();
        let json = serde_json::to_vec_pretty(&manifest).unwrap();
        let parsed = Manifest::from_slice(&json).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value["x-publisher"] = serde_json::json!("acme");
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(Manifest::from_slice(&bytes).is_ok());
    }

    #[test]
    fn test_missing_required_field_rejected() {
        let value = serde_json::to_value(sample()).unwrap();
        for field in [
            "format",
            "algo",
            "chunk_bytes",
            "plaintext_bytes",
            "sha256_ciphertext",
            "asset_id",
            "weights_filename",
        ] {
            let mut pruned = value.clone();
            pruned.as_object_mut().unwrap().remove(field);
            let bytes = serde_json::to_vec(&pruned).unwrap();
            assert!(
                Manifest::from_slice(&bytes).is_err(),
                "manifest without {} should be rejected",
                field
            );
        }
    }

    #[test]
    fn test_wrong_constants_rejected() {
        let mut manifest = sample();
        manifest.format = "tbenc/v2".to_string();
        assert!(manifest.validate().is_err());

        let mut manifest = sample();
        manifest.algo = "chacha20-poly1305".to_string();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_bad_digest_rejected() {
        let mut manifest = sample();
        manifest.sha256_ciphertext = "A".repeat(64); // uppercase
        assert!(manifest.validate().is_err());

        manifest.sha256_ciphertext = "a".repeat(63);
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_asset_id_rules() {
        assert!(is_valid_asset_id("llama-3-70b-v1"));
        assert!(is_valid_asset_id("my_model_2024"));
        assert!(!is_valid_asset_id(""));
        assert!(!is_valid_asset_id("invalid id!"));
        assert!(!is_valid_asset_id(&"a".repeat(101)));

        let mut manifest = sample();
        manifest.asset_id = "not ok".to_string();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_weights_filename_rules() {
        let mut manifest = sample();
        manifest.weights_filename = "../escape.tbenc".to_string();
        assert!(manifest.validate().is_err());

        manifest.weights_filename = String::new();
        assert!(manifest.validate().is_err());
    }

    #[test]
    fn test_write_atomic_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.manifest.json");

        let manifest = sample();
        manifest.write_atomic(&path).unwrap();

        let loaded = Manifest::load(&path).unwrap();
        assert_eq!(loaded, manifest);

        // No temp file left behind
        let entries: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);

        // 2-space indentation
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"format\""));
    }
}
