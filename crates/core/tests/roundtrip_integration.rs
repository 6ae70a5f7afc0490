//
// Copyright (c) 2026 TRUSTBRIDGE
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: trustbridge — Confidential model-weight delivery.
//

//! Roundtrip tests for the tbenc/v1 engines: encode with real data across
//! the chunk-boundary size grid and verify byte-perfect decode.

use std::io::{self, Read};

use anyhow::Result;
use sha2::{Digest, Sha256};
use trustbridge_core::{
    encrypt_file, AssetKey, Decryptor, Encryptor, FileSource, Manifest, MemorySource,
    HEADER_LEN, RECORD_HEADER_LEN, TAG_LEN,
};

fn create_test_data(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

fn encrypt_to_vec(data: &[u8], key: &AssetKey, chunk_bytes: u32) -> Result<(Vec<u8>, Manifest)> {
    let encryptor = Encryptor::new(key, chunk_bytes)?;
    let mut ciphertext = Vec::new();
    let summary = encryptor.encrypt_stream(data, &mut ciphertext)?;
    let manifest = Manifest::new(
        chunk_bytes,
        summary.plaintext_bytes,
        summary.sha256_ciphertext,
        "roundtrip-asset".to_string(),
        "model.tbenc".to_string(),
    );
    Ok((ciphertext, manifest))
}

fn decrypt_to_vec(ciphertext: Vec<u8>, manifest: Manifest, key: AssetKey) -> Result<Vec<u8>> {
    let mut decryptor = Decryptor::new(manifest, key);
    let mut source = MemorySource::new(ciphertext);
    let mut sink = Vec::new();
    decryptor.decrypt_into_sink(&mut source, &mut sink)?;
    Ok(sink)
}

fn assert_roundtrip(data: &[u8], chunk_bytes: u32) -> Result<()> {
    let key = AssetKey::generate();
    let (ciphertext, manifest) = encrypt_to_vec(data, &key, chunk_bytes)?;
    let decoded = decrypt_to_vec(ciphertext, manifest, key)?;
    assert_eq!(
        decoded, data,
        "roundtrip mismatch for {} bytes at chunk size {}",
        data.len(),
        chunk_bytes
    );
    Ok(())
}

#[test]
fn test_boundary_size_grid_small_chunks() -> Result<()> {
    let chunk_bytes = 1024usize;
    for size in [
        0,
        1,
        chunk_bytes - 1,
        chunk_bytes,
        chunk_bytes + 1,
        10 * chunk_bytes,
        10 * chunk_bytes + 7,
    ] {
        assert_roundtrip(&create_test_data(size), chunk_bytes as u32)?;
    }
    Ok(())
}

#[test]
fn test_boundary_size_grid_default_chunks() -> Result<()> {
    let chunk_bytes = 4 * 1024 * 1024usize;
    for size in [0, 1, chunk_bytes - 1, chunk_bytes, chunk_bytes + 1] {
        assert_roundtrip(&create_test_data(size), chunk_bytes as u32)?;
    }
    Ok(())
}

#[test]
fn test_large_chunk_small_payloads() -> Result<()> {
    // Payloads far below the 64 MiB chunk ceiling still produce one record.
    let chunk_bytes = 64 * 1024 * 1024u32;
    for size in [0, 1, 1024 * 1024] {
        assert_roundtrip(&create_test_data(size), chunk_bytes)?;
    }
    Ok(())
}

#[test]
fn test_empty_file_scenario() -> Result<()> {
    // Empty plaintext, chunk 4096: header-only ciphertext, zero records.
    let key = AssetKey::generate();
    let (ciphertext, manifest) = encrypt_to_vec(b"", &key, 4096)?;

    assert_eq!(ciphertext.len(), 32);
    assert_eq!(manifest.plaintext_bytes, 0);

    let decoded = decrypt_to_vec(ciphertext, manifest, key)?;
    assert!(decoded.is_empty());
    Ok(())
}

#[test]
fn test_single_short_chunk_scenario() -> Result<()> {
    // 27 bytes at chunk 1024: one 47-byte record, 79 bytes total.
    let plaintext = b"TrustBridge-Test-Vector-123";
    let key = AssetKey::from_hex(&"0123456789abcdef".repeat(4))?;

    let (ciphertext, manifest) = encrypt_to_vec(plaintext, &key, 1024)?;
    assert_eq!(
        ciphertext.len(),
        HEADER_LEN + RECORD_HEADER_LEN + plaintext.len() + TAG_LEN
    );
    assert_eq!(ciphertext.len(), 79);

    let decoded = decrypt_to_vec(ciphertext, manifest, key)?;
    assert_eq!(decoded, plaintext);
    Ok(())
}

#[test]
fn test_three_and_a_half_chunks_scenario() -> Result<()> {
    let plaintext = vec![b'X'; 3 * 1024 + 500];
    let key = AssetKey::generate();

    let (ciphertext, manifest) = encrypt_to_vec(&plaintext, &key, 1024)?;
    assert_eq!(
        ciphertext.len(),
        HEADER_LEN + 3 * (RECORD_HEADER_LEN + 1024 + TAG_LEN) + RECORD_HEADER_LEN + 500 + TAG_LEN
    );

    let decoded = decrypt_to_vec(ciphertext, manifest, key)?;
    assert_eq!(decoded, plaintext);
    Ok(())
}

#[test]
fn test_sixteen_mebibyte_pattern_scenario() -> Result<()> {
    // 16 MiB of a repeating 16-byte marker; decoded hash must equal the
    // precomputed plaintext hash.
    let pattern = b"TRUSTBRIDGE_E2E_";
    let plaintext: Vec<u8> = pattern
        .iter()
        .cycle()
        .take(16 * 1024 * 1024)
        .copied()
        .collect();
    let plaintext_hash = hex::encode(Sha256::digest(&plaintext));

    for chunk_bytes in [1024u32, 4 * 1024 * 1024] {
        let key = AssetKey::generate();
        let (ciphertext, manifest) = encrypt_to_vec(&plaintext, &key, chunk_bytes)?;
        let decoded = decrypt_to_vec(ciphertext, manifest, key)?;
        assert_eq!(hex::encode(Sha256::digest(&decoded)), plaintext_hash);
    }
    Ok(())
}

#[test]
fn test_independent_encoders_interoperate() -> Result<()> {
    // Two conforming encoders draw distinct nonce prefixes but both outputs
    // decode under the shared key.
    let key = AssetKey::generate();
    let plaintext = create_test_data(5000);

    let (ct_a, manifest_a) = encrypt_to_vec(&plaintext, &key, 1024)?;
    let (ct_b, manifest_b) = encrypt_to_vec(&plaintext, &key, 1024)?;

    assert_ne!(
        ct_a[15..19],
        ct_b[15..19],
        "nonce prefixes collided; CSPRNG output suspect"
    );
    assert_ne!(ct_a, ct_b);

    assert_eq!(decrypt_to_vec(ct_a, manifest_a, key.clone())?, plaintext);
    assert_eq!(decrypt_to_vec(ct_b, manifest_b, key)?, plaintext);
    Ok(())
}

#[test]
fn test_short_reads_do_not_change_record_layout() -> Result<()> {
    // A source that trickles bytes (as pipes do) must still fill whole
    // chunks before sealing records.
    struct Trickle<'a> {
        data: &'a [u8],
        pos: usize,
    }
    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos >= self.data.len() || buf.is_empty() {
                return Ok(0);
            }
            let n = usize::min(13, self.data.len() - self.pos); // odd trickle size
            let n = usize::min(n, buf.len());
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    let plaintext = create_test_data(3000);
    let key = AssetKey::generate();

    let encryptor = Encryptor::new(&key, 1024)?;
    let mut ciphertext = Vec::new();
    let summary = encryptor.encrypt_stream(
        Trickle {
            data: &plaintext,
            pos: 0,
        },
        &mut ciphertext,
    )?;

    // Same layout as a well-behaved reader: 2 full records + one 952-byte tail.
    assert_eq!(
        ciphertext.len(),
        HEADER_LEN + 2 * (RECORD_HEADER_LEN + 1024 + TAG_LEN) + RECORD_HEADER_LEN + 952 + TAG_LEN
    );

    let manifest = Manifest::new(
        1024,
        summary.plaintext_bytes,
        summary.sha256_ciphertext,
        "roundtrip-asset".to_string(),
        "model.tbenc".to_string(),
    );
    assert_eq!(decrypt_to_vec(ciphertext, manifest, key)?, plaintext);
    Ok(())
}

#[test]
fn test_file_roundtrip_with_staged_source() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("weights.bin");
    let output = dir.path().join("model.tbenc");
    let manifest_path = dir.path().join("model.manifest.json");

    let plaintext = create_test_data(10_000);
    std::fs::write(&input, &plaintext)?;

    let key = AssetKey::generate();
    let summary = encrypt_file(&input, &output, &key, 1024)?;
    assert!(output.exists());

    let manifest = Manifest::new(
        1024,
        summary.plaintext_bytes,
        summary.sha256_ciphertext,
        "staged-asset".to_string(),
        "model.tbenc".to_string(),
    );
    manifest.write_atomic(&manifest_path)?;

    let loaded = Manifest::load(&manifest_path)?;
    let mut decryptor = Decryptor::new(loaded, key);
    let mut source = FileSource::open(&output)?;
    let mut sink = Vec::new();
    let written = decryptor.decrypt_into_sink(&mut source, &mut sink)?;

    assert_eq!(written, plaintext.len() as u64);
    assert_eq!(sink, plaintext);
    Ok(())
}
