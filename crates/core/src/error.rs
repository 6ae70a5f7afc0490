//
// Copyright (c) 2026 TRUSTBRIDGE
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: trustbridge — Confidential model-weight delivery.
//

//! Unified error hierarchy for tbenc/v1 operations.

use thiserror::Error;

/// Errors raised while encoding or parsing the tbenc/v1 wire format.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("bad magic: not a tbenc/v1 stream")]
    BadMagic,

    #[error("unsupported version: {0}")]
    UnsupportedVersion(u16),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(u8),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// Errors raised while reading, validating, or writing a manifest.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("invalid manifest JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid manifest: {0}")]
    InvalidField(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while parsing or generating key material.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("invalid key format: {0}")]
    InvalidKeyFormat(String),
}

/// Top-level error type for the encryption and decryption engines.
#[derive(Error, Debug)]
pub enum TbencError {
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("key error: {0}")]
    Key(#[from] KeyError),

    #[error("ciphertext hash mismatch: manifest has {expected}, computed {actual}")]
    CiphertextHashMismatch { expected: String, actual: String },

    #[error("authentication failed at chunk {chunk_index}: wrong key, tampered ciphertext, or reordered records")]
    AuthenticationFailed { chunk_index: u64 },

    #[error("plaintext length mismatch: manifest has {expected} bytes, decrypted {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
