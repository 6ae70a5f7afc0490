//
// Copyright (c) 2026 TRUSTBRIDGE
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: trustbridge — Confidential model-weight delivery.
//

//! tbenc/v1 wire format: header codec, record framing, nonce derivation, AAD.
//!
//! All multi-byte integers on the wire are big-endian; the wire is canonical
//! and no endian detection happens at runtime.

use crate::error::FormatError;

pub const MAGIC: &[u8; 8] = b"TBENC001";
pub const VERSION: u16 = 1;
pub const ALG_AES_256_GCM_CHUNKED: u8 = 1;

pub const HEADER_LEN: usize = 32;
pub const NONCE_PREFIX_LEN: usize = 4;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const RECORD_HEADER_LEN: usize = 4;

/// AAD = magic || version || algo || chunk_bytes || nonce_prefix || chunk_index || pt_len
pub const AAD_LEN: usize = 8 + 2 + 1 + 4 + NONCE_PREFIX_LEN + 8 + 4;

pub const MIN_CHUNK_BYTES: u32 = 1024;
pub const MAX_CHUNK_BYTES: u32 = 64 * 1024 * 1024;
pub const DEFAULT_CHUNK_BYTES: u32 = 4 * 1024 * 1024;

/// Check the chunk size against the format bounds.
pub fn validate_chunk_bytes(chunk_bytes: u32) -> Result<(), FormatError> {
    if !(MIN_CHUNK_BYTES..=MAX_CHUNK_BYTES).contains(&chunk_bytes) {
        return Err(FormatError::InvalidParameter(format!(
            "chunk_bytes must be between {} and {}, got {}",
            MIN_CHUNK_BYTES, MAX_CHUNK_BYTES, chunk_bytes
        )));
    }
    Ok(())
}

/// The 32-byte tbenc/v1 file header.
///
/// Layout: magic(8) || version(2) || algorithm(1) || chunk_bytes(4) ||
/// nonce_prefix(4) || reserved(13, zero).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileHeader {
    pub chunk_bytes: u32,
    pub nonce_prefix: [u8; NONCE_PREFIX_LEN],
}

impl FileHeader {
    pub fn new(
        chunk_bytes: u32,
        nonce_prefix: [u8; NONCE_PREFIX_LEN],
    ) -> Result<Self, FormatError> {
        validate_chunk_bytes(chunk_bytes)?;
        Ok(FileHeader {
            chunk_bytes,
            nonce_prefix,
        })
    }

    /// Serialize deterministically to the fixed 32-byte header.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut out = [0u8; HEADER_LEN];
        out[0..8].copy_from_slice(MAGIC);
        out[8..10].copy_from_slice(&VERSION.to_be_bytes());
        out[10] = ALG_AES_256_GCM_CHUNKED;
        out[11..15].copy_from_slice(&self.chunk_bytes.to_be_bytes());
        out[15..19].copy_from_slice(&self.nonce_prefix);
        // bytes 19..32 are reserved and stay zero
        out
    }

    /// Parse and validate a 32-byte header.
    pub fn from_bytes(bytes: &[u8; HEADER_LEN]) -> Result<Self, FormatError> {
        if &bytes[0..8] != MAGIC {
            return Err(FormatError::BadMagic);
        }
        let version = u16::from_be_bytes([bytes[8], bytes[9]]);
        if version != VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }
        if bytes[10] != ALG_AES_256_GCM_CHUNKED {
            return Err(FormatError::UnsupportedAlgorithm(bytes[10]));
        }
        let chunk_bytes = u32::from_be_bytes([bytes[11], bytes[12], bytes[13], bytes[14]]);
        validate_chunk_bytes(chunk_bytes)?;
        if bytes[19..].iter().any(|&b| b != 0) {
            return Err(FormatError::InvalidHeader(
                "non-zero reserved bytes".to_string(),
            ));
        }
        let mut nonce_prefix = [0u8; NONCE_PREFIX_LEN];
        nonce_prefix.copy_from_slice(&bytes[15..19]);
        Ok(FileHeader {
            chunk_bytes,
            nonce_prefix,
        })
    }
}

/// Derive the 12-byte per-chunk nonce: nonce_prefix(4) || chunk_index(8, BE).
pub fn derive_nonce(
    nonce_prefix: &[u8; NONCE_PREFIX_LEN],
    chunk_index: u64,
) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    nonce[..NONCE_PREFIX_LEN].copy_from_slice(nonce_prefix);
    nonce[NONCE_PREFIX_LEN..].copy_from_slice(&chunk_index.to_be_bytes());
    nonce
}

/// Build the 31-byte AAD binding a record to the header, its position, and
/// its declared plaintext length. The magic/version/algo triplet is
/// re-emitted so records are bound to the concrete format identity.
pub fn build_aad(
    chunk_bytes: u32,
    nonce_prefix: &[u8; NONCE_PREFIX_LEN],
    chunk_index: u64,
    pt_len: u32,
) -> [u8; AAD_LEN] {
    let mut aad = [0u8; AAD_LEN];
    let mut off = 0;
    aad[off..off + 8].copy_from_slice(MAGIC);
    off += 8;
    aad[off..off + 2].copy_from_slice(&VERSION.to_be_bytes());
    off += 2;
    aad[off] = ALG_AES_256_GCM_CHUNKED;
    off += 1;
    aad[off..off + 4].copy_from_slice(&chunk_bytes.to_be_bytes());
    off += 4;
    aad[off..off + NONCE_PREFIX_LEN].copy_from_slice(nonce_prefix);
    off += NONCE_PREFIX_LEN;
    aad[off..off + 8].copy_from_slice(&chunk_index.to_be_bytes());
    off += 8;
    aad[off..off + 4].copy_from_slice(&pt_len.to_be_bytes());
    aad
}

/// Pack the 4-byte record length prefix.
pub fn pack_record_header(pt_len: u32) -> [u8; RECORD_HEADER_LEN] {
    pt_len.to_be_bytes()
}

/// Parse the 4-byte record length prefix.
pub fn parse_record_header(bytes: &[u8]) -> Result<u32, FormatError> {
    if bytes.len() < RECORD_HEADER_LEN {
        return Err(FormatError::InvalidRecord(format!(
            "short record header: got {} bytes",
            bytes.len()
        )));
    }
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
