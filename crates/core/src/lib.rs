//
// Copyright (c) 2026 TRUSTBRIDGE
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: trustbridge — Confidential model-weight delivery.
//

//! # TrustBridge Core
//!
//! Codec and streaming engines for the tbenc/v1 chunked
//! authenticated-encryption format, which secures large opaque payloads
//! (model weight files) in transit and at rest.
//!
//! A ciphertext is a 32-byte header followed by AES-256-GCM records, each
//! carrying one plaintext chunk bound to the header and its stream position
//! through the AAD. A side-car JSON manifest commits to the encryption
//! parameters, the asset identity, and the SHA-256 of the whole ciphertext,
//! and is checked by the decoder before the key is ever used.
//!
//! ## Quick Start
//!
//! ```rust
//! use trustbridge_core::{AssetKey, Decryptor, Encryptor, Manifest, MemorySource};
//!
//! # fn main() -> Result<(), trustbridge_core::TbencError> {
//! let key = AssetKey::generate();
//!
//! // Producer: stream plaintext into chunked records.
//! let mut ciphertext = Vec::new();
//! let summary = Encryptor::new(&key, 4096)?
//!     .encrypt_stream(&b"model weights"[..], &mut ciphertext)?;
//! let manifest = Manifest::new(
//!     4096,
//!     summary.plaintext_bytes,
//!     summary.sha256_ciphertext,
//!     "demo-asset".to_string(),
//!     "model.tbenc".to_string(),
//! );
//!
//! // Consumer: verify, then decrypt progressively into a sink.
//! let mut source = MemorySource::new(ciphertext);
//! let mut sink = Vec::new();
//! Decryptor::new(manifest, key).decrypt_into_sink(&mut source, &mut sink)?;
//! assert_eq!(sink, b"model weights");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`format`] - header codec, record framing, nonce derivation, AAD
//! - [`manifest`] - side-car manifest read/validate/write
//! - [`encrypt`] - streaming encoder producing ciphertext and its hash
//! - [`decrypt`] - verifying decoder delivering plaintext to a sink
//! - [`source`] - random-access ciphertext sources
//! - [`keys`] - symmetric key material, zeroized on drop

pub mod decrypt;
pub mod encrypt;
pub mod error;
pub mod format;
pub mod keys;
pub mod manifest;
pub mod source;

mod vectors;

pub use decrypt::{DecodeState, Decryptor};
pub use encrypt::{encrypt_file, EncryptSummary, Encryptor};
pub use error::{FormatError, KeyError, ManifestError, TbencError};
pub use format::{
    build_aad, derive_nonce, pack_record_header, parse_record_header, validate_chunk_bytes,
    FileHeader, AAD_LEN, ALG_AES_256_GCM_CHUNKED, DEFAULT_CHUNK_BYTES, HEADER_LEN, MAGIC,
    MAX_CHUNK_BYTES, MIN_CHUNK_BYTES, NONCE_LEN, NONCE_PREFIX_LEN, RECORD_HEADER_LEN, TAG_LEN,
    VERSION,
};
pub use keys::{AssetKey, KEY_LEN};
pub use manifest::{is_valid_asset_id, Manifest, MANIFEST_ALGO, MANIFEST_FORMAT};
pub use source::{ByteSource, FileSource, MemorySource};
