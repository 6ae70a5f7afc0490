//
// Copyright (c) 2026 TRUSTBRIDGE
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: trustbridge — Confidential model-weight delivery.
//

//! The sentinel: consumer-side decoder process.
//!
//! One session per process: authorize, fetch the manifest, stage the
//! ciphertext, then drive the core decryption engine into the configured
//! pipe. Any failure exits non-zero with the sink closed, which the
//! downstream reader observes as EOF on an incomplete transfer.

mod authz;
mod blob;
mod config;

use std::fs::{self, OpenOptions};
use std::process;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};
use trustbridge_core::{Decryptor, FileSource};

use crate::blob::RemoteBlob;
use crate::config::SentinelConfig;

fn main() {
    tracing_subscriber::fmt::init();
    if let Err(err) = run() {
        error!("sentinel failed: {err:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cfg = SentinelConfig::parse();
    info!(
        asset_id = %cfg.asset_id,
        contract_id = %cfg.contract_id,
        "sentinel starting"
    );

    let client = reqwest::blocking::Client::new();

    // Authorization gates everything: on denial no staging path, marker, or
    // sink is ever created.
    let grant = authz::authorize(&client, &cfg).context("authorization")?;
    if let Some(expires_at) = grant.expires_at {
        if expires_at <= Utc::now() {
            anyhow::bail!("authorization grant already expired at {}", expires_at);
        }
        info!(%expires_at, "authorization granted");
    } else {
        warn!("authorization granted without expiry");
    }

    let manifest =
        blob::fetch_manifest(&client, &grant.manifest_url).context("fetching manifest")?;
    anyhow::ensure!(
        manifest.asset_id == cfg.asset_id,
        "manifest asset_id {:?} does not match configured asset {:?}",
        manifest.asset_id,
        cfg.asset_id
    );
    info!(
        chunk_bytes = manifest.chunk_bytes,
        plaintext_bytes = manifest.plaintext_bytes,
        "manifest validated"
    );

    fs::create_dir_all(&cfg.target_directory).with_context(|| {
        format!(
            "cannot create target directory {}",
            cfg.target_directory.display()
        )
    })?;
    let staged = cfg.target_directory.join(&manifest.weights_filename);

    let ciphertext = RemoteBlob::new(&client, &grant.sas_url);
    let staged_bytes = ciphertext
        .fetch_to(&staged, cfg.fetch_part_bytes)
        .context("staging ciphertext")?;
    info!(bytes = staged_bytes, path = %staged.display(), "ciphertext staged");

    let mut source = FileSource::open(&staged)
        .with_context(|| format!("opening staged ciphertext {}", staged.display()))?;

    // The pipe's reader sees EOF when this handle closes, success or not.
    let mut sink = OpenOptions::new()
        .write(true)
        .open(&cfg.sink_path)
        .with_context(|| format!("opening sink {}", cfg.sink_path.display()))?;

    let ready_path = cfg.ready_signal_path.clone();
    let mut decryptor = Decryptor::new(manifest, grant.key).with_ready_hook(move || {
        if let Some(parent) = ready_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&ready_path, b"")
    });

    info!("verifying and decrypting");
    let result = decryptor.decrypt_into_sink(&mut source, &mut sink);
    if let Err(err) = &result {
        error!(state = ?decryptor.state(), %err, "decode failed");
    }
    let written = result.context("decrypting into sink")?;
    info!(bytes = written, state = ?decryptor.state(), "plaintext delivered");
    Ok(())
}
