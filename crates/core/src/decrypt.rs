//
// Copyright (c) 2026 TRUSTBRIDGE
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: trustbridge — Confidential model-weight delivery.
//

//! Streaming tbenc/v1 decoder: ciphertext source in, authenticated plaintext
//! out, delivered progressively to a sequential sink.
//!
//! The decoder verifies the ciphertext digest against the manifest before the
//! key touches any AEAD state, then authenticates every record strictly in
//! order; `chunk_index` is the loop counter, never read from the wire, so a
//! reordered record fails its tag.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aead::Payload;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use sha2::{Digest, Sha256};

use crate::error::{FormatError, TbencError};
use crate::format::{
    build_aad, derive_nonce, parse_record_header, FileHeader, HEADER_LEN, RECORD_HEADER_LEN,
    TAG_LEN,
};
use crate::keys::AssetKey;
use crate::manifest::Manifest;
use crate::source::ByteSource;

const HASH_BUF_LEN: usize = 1024 * 1024;

/// Externally observable decoder session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    Init,
    Fetching,
    Verified,
    Decrypting,
    Ready,
    Done,
    Failed,
}

type ReadyHook = Box<dyn FnOnce() -> io::Result<()> + Send>;

/// Streaming tbenc/v1 decoder.
///
/// A `Decryptor` owns the key and the validated manifest for the duration of
/// one consume session; the key is zeroized when the decoder is dropped.
pub struct Decryptor {
    key: AssetKey,
    manifest: Manifest,
    state: DecodeState,
    cancel: Option<Arc<AtomicBool>>,
    ready_hook: Option<ReadyHook>,
}

impl Decryptor {
    /// `manifest` must already be validated (see [`Manifest::validate`]).
    pub fn new(manifest: Manifest, key: AssetKey) -> Self {
        Decryptor {
            key,
            manifest,
            state: DecodeState::Init,
            cancel: None,
            ready_hook: None,
        }
    }

    /// Cooperative cancellation, checked between records and between reads of
    /// the pre-flight hash pass.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Hook invoked once, after header validation and before the first
    /// plaintext byte is written. Deployments use this to announce readiness
    /// to the sink's reader (e.g. by touching a marker file).
    pub fn with_ready_hook<F>(mut self, hook: F) -> Self
    where
        F: FnOnce() -> io::Result<()> + Send + 'static,
    {
        self.ready_hook = Some(Box::new(hook));
        self
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Authenticate and decrypt the whole ciphertext into `sink`, returning
    /// the number of plaintext bytes written.
    pub fn decrypt_into_sink<S: ByteSource, W: Write>(
        &mut self,
        source: &mut S,
        sink: &mut W,
    ) -> Result<u64, TbencError> {
        if self.state != DecodeState::Init {
            return Err(FormatError::InvalidParameter(
                "decoder session already consumed".to_string(),
            )
            .into());
        }
        match self.run(source, sink) {
            Ok(written) => Ok(written),
            Err(e) => {
                self.state = DecodeState::Failed;
                Err(e)
            }
        }
    }

    fn run<S: ByteSource, W: Write>(
        &mut self,
        source: &mut S,
        sink: &mut W,
    ) -> Result<u64, TbencError> {
        self.state = DecodeState::Fetching;
        let total = source.size()?;

        let actual = self.hash_source(source, total)?;
        if actual != self.manifest.sha256_ciphertext {
            return Err(TbencError::CiphertextHashMismatch {
                expected: self.manifest.sha256_ciphertext.clone(),
                actual,
            });
        }
        self.state = DecodeState::Verified;

        if total < HEADER_LEN as u64 {
            return Err(
                FormatError::InvalidHeader("ciphertext shorter than header".to_string()).into(),
            );
        }
        let mut header_bytes = [0u8; HEADER_LEN];
        source.read_at(0, &mut header_bytes)?;
        let header = FileHeader::from_bytes(&header_bytes)?;
        if header.chunk_bytes != self.manifest.chunk_bytes {
            return Err(FormatError::InvalidHeader(format!(
                "header chunk_bytes {} does not match manifest {}",
                header.chunk_bytes, self.manifest.chunk_bytes
            ))
            .into());
        }
        if self.manifest.plaintext_bytes == 0 && total != HEADER_LEN as u64 {
            return Err(FormatError::InvalidRecord(
                "records present but manifest declares empty plaintext".to_string(),
            )
            .into());
        }
        self.state = DecodeState::Decrypting;

        // The key reaches AEAD state only now, after the digest checked out.
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(self.key.as_bytes()));

        if let Some(hook) = self.ready_hook.take() {
            hook()?;
        }

        let mut record = vec![0u8; header.chunk_bytes as usize + TAG_LEN];
        let mut written = 0u64;
        let mut offset = HEADER_LEN as u64;
        let mut chunk_index = 0u64;

        while offset < total {
            self.check_cancel()?;

            let remaining = total - offset;
            if remaining < RECORD_HEADER_LEN as u64 {
                return Err(FormatError::InvalidRecord(format!(
                    "truncated record header at offset {}",
                    offset
                ))
                .into());
            }
            let mut len_bytes = [0u8; RECORD_HEADER_LEN];
            source.read_at(offset, &mut len_bytes)?;
            let pt_len = parse_record_header(&len_bytes)?;
            if pt_len == 0 {
                return Err(FormatError::InvalidRecord(format!(
                    "zero-length record at chunk {}",
                    chunk_index
                ))
                .into());
            }
            if pt_len > header.chunk_bytes {
                return Err(FormatError::InvalidRecord(format!(
                    "record length {} exceeds chunk size {}",
                    pt_len, header.chunk_bytes
                ))
                .into());
            }
            let body_len = u64::from(pt_len) + TAG_LEN as u64;
            if remaining - (RECORD_HEADER_LEN as u64) < body_len {
                return Err(FormatError::InvalidRecord(format!(
                    "truncated record body at chunk {}",
                    chunk_index
                ))
                .into());
            }

            let body = &mut record[..pt_len as usize + TAG_LEN];
            source.read_at(offset + RECORD_HEADER_LEN as u64, body)?;

            let nonce_bytes = derive_nonce(&header.nonce_prefix, chunk_index);
            let aad = build_aad(header.chunk_bytes, &header.nonce_prefix, chunk_index, pt_len);
            let plaintext = cipher
                .decrypt(
                    Nonce::from_slice(&nonce_bytes),
                    Payload {
                        msg: body,
                        aad: &aad,
                    },
                )
                .map_err(|_| TbencError::AuthenticationFailed { chunk_index })?;

            sink.write_all(&plaintext)?;
            written += u64::from(pt_len);
            offset += RECORD_HEADER_LEN as u64 + body_len;
            chunk_index += 1;
        }

        if written != self.manifest.plaintext_bytes {
            return Err(TbencError::LengthMismatch {
                expected: self.manifest.plaintext_bytes,
                actual: written,
            });
        }
        self.state = DecodeState::Ready;

        sink.flush()?;
        self.state = DecodeState::Done;
        Ok(written)
    }

    /// SHA-256 over the full ciphertext, read sequentially in source order.
    fn hash_source<S: ByteSource>(
        &self,
        source: &mut S,
        total: u64,
    ) -> Result<String, TbencError> {
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; HASH_BUF_LEN];
        let mut offset = 0u64;
        while offset < total {
            self.check_cancel()?;
            let n = usize::min(HASH_BUF_LEN, (total - offset) as usize);
            source.read_at(offset, &mut buf[..n])?;
            hasher.update(&buf[..n]);
            offset += n as u64;
        }
        Ok(hex::encode(hasher.finalize()))
    }

    fn check_cancel(&self) -> Result<(), TbencError> {
        if let Some(flag) = &self.cancel {
            if flag.load(Ordering::Relaxed) {
                return Err(TbencError::Cancelled);
            }
        }
        Ok(())
    }
}
