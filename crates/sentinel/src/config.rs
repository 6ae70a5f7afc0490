//
// Copyright (c) 2026 TRUSTBRIDGE
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: trustbridge — Confidential model-weight delivery.
//

//! Sentinel runtime configuration.
//!
//! All options are assembled here at the process edge, from CLI flags with
//! environment fallbacks; the core engines never read the environment.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "sentinel",
    version,
    about = "TrustBridge weight-delivery sentinel: authorize, fetch, verify, decrypt into a pipe"
)]
pub struct SentinelConfig {
    /// Authorization service base URL.
    #[arg(long, env = "TB_AUTHORIZATION_ENDPOINT")]
    pub authorization_endpoint: String,

    /// Contract under which access is requested.
    #[arg(long, env = "TB_CONTRACT_ID")]
    pub contract_id: String,

    /// Asset to fetch and decrypt.
    #[arg(long, env = "TB_ASSET_ID")]
    pub asset_id: String,

    /// Hardware identity reported to the authorization service.
    #[arg(long, env = "TB_HW_ID", default_value = "unattested")]
    pub hw_id: String,

    /// Directory where the ciphertext is staged during download.
    #[arg(long, env = "TB_TARGET_DIRECTORY", default_value = "/dev/shm/weights")]
    pub target_directory: PathBuf,

    /// Named pipe the decrypted weights are streamed into.
    #[arg(long, env = "TB_PIPE_PATH", default_value = "/dev/shm/model-pipe")]
    pub sink_path: PathBuf,

    /// Marker file created once the decoder is about to stream.
    #[arg(
        long,
        env = "TB_READY_SIGNAL",
        default_value = "/dev/shm/weights/ready.signal"
    )]
    pub ready_signal_path: PathBuf,

    /// Range size for staged ciphertext downloads.
    #[arg(long, env = "TB_FETCH_PART_BYTES", default_value_t = 8 * 1024 * 1024)]
    pub fetch_part_bytes: u64,
}
