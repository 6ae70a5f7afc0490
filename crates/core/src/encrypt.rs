//
// Copyright (c) 2026 TRUSTBRIDGE
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: trustbridge — Confidential model-weight delivery.
//

//! Streaming tbenc/v1 encoder: plaintext in, chunked AES-256-GCM records out.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use aead::Payload;
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::{FormatError, TbencError};
use crate::format::{
    build_aad, derive_nonce, pack_record_header, validate_chunk_bytes, FileHeader,
    NONCE_PREFIX_LEN,
};
use crate::keys::AssetKey;

/// Outcome of one produce session.
#[derive(Debug, Clone)]
pub struct EncryptSummary {
    /// SHA-256 over the entire emitted ciphertext (header included), hex.
    pub sha256_ciphertext: String,
    /// Total plaintext bytes consumed from the source.
    pub plaintext_bytes: u64,
}

/// Streaming tbenc/v1 encoder.
///
/// An `Encryptor` owns its AEAD context and header parameters and drives
/// exactly one produce session; the nonce prefix is drawn fresh per instance
/// so two sessions never share a nonce space.
pub struct Encryptor {
    cipher: Aes256Gcm,
    header: FileHeader,
    cancel: Option<Arc<AtomicBool>>,
}

impl Encryptor {
    pub fn new(key: &AssetKey, chunk_bytes: u32) -> Result<Self, TbencError> {
        validate_chunk_bytes(chunk_bytes)?;

        let mut nonce_prefix = [0u8; NONCE_PREFIX_LEN];
        OsRng.fill_bytes(&mut nonce_prefix);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key.as_bytes()));
        Ok(Encryptor {
            cipher,
            header: FileHeader {
                chunk_bytes,
                nonce_prefix,
            },
            cancel: None,
        })
    }

    /// Cooperative cancellation, checked between records.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Pin the nonce prefix. Deterministic output for test vectors only.
    #[doc(hidden)]
    pub fn with_nonce_prefix(mut self, nonce_prefix: [u8; NONCE_PREFIX_LEN]) -> Self {
        self.header.nonce_prefix = nonce_prefix;
        self
    }

    /// Encrypt a finite plaintext stream into `sink`.
    ///
    /// Emits the 32-byte header followed by one record per plaintext chunk.
    /// An empty source produces a header-only ciphertext with zero records;
    /// there is never a trailing empty record.
    pub fn encrypt_stream<R: Read, W: Write>(
        self,
        mut source: R,
        mut sink: W,
    ) -> Result<EncryptSummary, TbencError> {
        let mut hasher = Sha256::new();

        let header_bytes = self.header.to_bytes();
        sink.write_all(&header_bytes)?;
        hasher.update(header_bytes);

        let mut buf = vec![0u8; self.header.chunk_bytes as usize];
        let mut plaintext_bytes = 0u64;
        let mut chunk_index = 0u64;

        loop {
            self.check_cancel()?;

            let n = read_fill(&mut source, &mut buf)?;
            if n == 0 {
                break;
            }
            let pt_len = n as u32;

            let nonce_bytes = derive_nonce(&self.header.nonce_prefix, chunk_index);
            let aad = build_aad(
                self.header.chunk_bytes,
                &self.header.nonce_prefix,
                chunk_index,
                pt_len,
            );
            let ciphertext = self
                .cipher
                .encrypt(
                    Nonce::from_slice(&nonce_bytes),
                    Payload {
                        msg: &buf[..n],
                        aad: &aad,
                    },
                )
                .map_err(|_| {
                    TbencError::Io(io::Error::new(
                        io::ErrorKind::Other,
                        "AES-256-GCM encryption failed",
                    ))
                })?;

            let record_header = pack_record_header(pt_len);
            sink.write_all(&record_header)?;
            sink.write_all(&ciphertext)?;
            hasher.update(record_header);
            hasher.update(&ciphertext);

            plaintext_bytes += u64::from(pt_len);
            chunk_index = chunk_index.checked_add(1).ok_or_else(|| {
                FormatError::InvalidParameter("chunk index overflow".to_string())
            })?;
        }

        sink.flush()?;
        Ok(EncryptSummary {
            sha256_ciphertext: hex::encode(hasher.finalize()),
            plaintext_bytes,
        })
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

/// Keep reading until the buffer is full or the stream ends, so record sizes
/// are deterministic even when the reader returns short reads (pipes).
fn read_fill<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Encrypt `input` into `output` on disk.
///
/// The ciphertext is written to a sibling partial file and renamed into place
/// on success; the partial file is removed on failure so no half-written
/// ciphertext survives.
pub fn encrypt_file(
    input: &Path,
    output: &Path,
    key: &AssetKey,
    chunk_bytes: u32,
) -> Result<EncryptSummary, TbencError> {
    let encryptor = Encryptor::new(key, chunk_bytes)?;
    let source = File::open(input)?;
    let partial = partial_path(output);

    let result = (|| -> Result<EncryptSummary, TbencError> {
        let mut writer = BufWriter::new(File::create(&partial)?);
        let summary = encryptor.encrypt_stream(BufReader::new(source), &mut writer)?;
        writer.flush()?;
        Ok(summary)
    })();

    match result {
        Ok(summary) => {
            fs::rename(&partial, output)?;
            Ok(summary)
        }
        Err(e) => {
            let _ = fs::remove_file(&partial);
            Err(e)
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
