//
// Copyright (c) 2026 TRUSTBRIDGE
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: trustbridge — Confidential model-weight delivery.
//

//! Publisher-side CLI for tbenc/v1 assets.

use std::fs::{self, File};
use std::io::Read;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sha2::{Digest, Sha256};
use trustbridge_core::{
    encrypt_file, is_valid_asset_id, parse_record_header, AssetKey, FileHeader, Manifest,
    DEFAULT_CHUNK_BYTES, HEADER_LEN, RECORD_HEADER_LEN, TAG_LEN,
};

#[derive(Parser, Debug)]
#[command(name = "trustbridge", version, about = "TrustBridge tbenc/v1 publisher tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt model weights and write the companion manifest
    Encrypt(EncryptCmd),
    /// Keyless integrity check of a ciphertext against its manifest
    Verify(VerifyCmd),
    /// Print header parameters and record layout of a ciphertext
    Inspect(InspectCmd),
}

#[derive(Args, Debug)]
struct EncryptCmd {
    #[arg(value_name = "INPUT", help = "Plaintext model weights file")]
    input: PathBuf,
    #[arg(long = "asset-id", help = "Asset identifier (alphanumeric, hyphens, underscores)")]
    asset_id: String,
    #[arg(
        long = "out",
        short = 'o',
        value_name = "DIR",
        default_value = "./encrypted",
        help = "Output directory for the ciphertext and manifest"
    )]
    output_dir: PathBuf,
    #[arg(
        long = "chunk-bytes",
        short = 'c',
        default_value_t = DEFAULT_CHUNK_BYTES,
        help = "Chunk size in bytes (1 KiB to 64 MiB)"
    )]
    chunk_bytes: u32,
    #[arg(
        long = "key-hex",
        value_name = "HEX",
        help = "Use an existing key (64 lowercase hex chars) instead of generating one"
    )]
    key_hex: Option<String>,
    #[arg(
        long = "output-filename",
        default_value = "model.tbenc",
        help = "Name for the ciphertext file"
    )]
    output_filename: String,
}

#[derive(Args, Debug)]
struct VerifyCmd {
    #[arg(long, value_name = "PATH", help = "Path to the manifest JSON")]
    manifest: PathBuf,
    #[arg(long, value_name = "PATH", help = "Path to the ciphertext file")]
    ciphertext: PathBuf,
}

#[derive(Args, Debug)]
struct InspectCmd {
    #[arg(value_name = "CIPHERTEXT", help = "Path to the ciphertext file")]
    ciphertext: PathBuf,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Encrypt(args) => handle_encrypt(args),
        Commands::Verify(args) => handle_verify(args),
        Commands::Inspect(args) => handle_inspect(args),
    }
}

fn handle_encrypt(args: EncryptCmd) -> Result<()> {
    anyhow::ensure!(
        is_valid_asset_id(&args.asset_id),
        "asset id must match [A-Za-z0-9_-]{{1,100}}: {:?}",
        args.asset_id
    );

    let input_size = fs::metadata(&args.input)
        .with_context(|| format!("cannot read input file {}", args.input.display()))?
        .len();

    let (key, generated) = match &args.key_hex {
        Some(hex) => (AssetKey::from_hex(hex)?, false),
        None => (AssetKey::generate(), true),
    };

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("cannot create output directory {}", args.output_dir.display()))?;

    println!("● Encrypting {} ({} bytes)...", args.input.display(), input_size);
    println!("  Asset ID:   {}", args.asset_id);
    println!("  Chunk size: {} bytes", args.chunk_bytes);

    let ciphertext_path = args.output_dir.join(&args.output_filename);
    let summary = encrypt_file(&args.input, &ciphertext_path, &key, args.chunk_bytes)
        .context("encryption failed")?;

    let manifest_path = args.output_dir.join(manifest_filename(&args.output_filename));
    let manifest = Manifest::new(
        args.chunk_bytes,
        summary.plaintext_bytes,
        summary.sha256_ciphertext.clone(),
        args.asset_id.clone(),
        args.output_filename.clone(),
    );
    manifest
        .write_atomic(&manifest_path)
        .context("writing manifest failed")?;

    let ciphertext_size = fs::metadata(&ciphertext_path)?.len();
    println!("✔ Encrypted:  {} ({} bytes)", ciphertext_path.display(), ciphertext_size);
    println!("✔ Manifest:   {}", manifest_path.display());
    println!("  Ciphertext SHA-256: {}", summary.sha256_ciphertext);

    if generated {
        println!();
        println!("● Decryption key (shown once, store it securely):");
        println!();
        println!("  {}", key.to_hex());
        println!();
        println!("  Without this key the encrypted weights cannot be recovered.");
    }

    Ok(())
}

fn handle_verify(args: VerifyCmd) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)
        .with_context(|| format!("cannot load manifest {}", args.manifest.display()))?;

    println!("● Verifying {} against {}...", args.ciphertext.display(), args.manifest.display());

    // Ciphertext digest must match the manifest before anything else.
    let actual = sha256_file(&args.ciphertext)?;
    anyhow::ensure!(
        actual == manifest.sha256_ciphertext,
        "ciphertext hash mismatch: manifest has {}, computed {}",
        manifest.sha256_ciphertext,
        actual
    );
    println!("✔ Ciphertext hash matches manifest");

    let (header, records, plaintext_bytes) = walk_ciphertext(&args.ciphertext)?;
    anyhow::ensure!(
        header.chunk_bytes == manifest.chunk_bytes,
        "header chunk_bytes {} does not match manifest {}",
        header.chunk_bytes,
        manifest.chunk_bytes
    );
    anyhow::ensure!(
        plaintext_bytes == manifest.plaintext_bytes,
        "record framing declares {} plaintext bytes, manifest has {}",
        plaintext_bytes,
        manifest.plaintext_bytes
    );
    println!("✔ Header valid, {} records framing {} plaintext bytes", records, plaintext_bytes);
    println!("✔ Verification passed");
    Ok(())
}

fn handle_inspect(args: InspectCmd) -> Result<()> {
    let (header, records, plaintext_bytes) = walk_ciphertext(&args.ciphertext)?;
    let size = fs::metadata(&args.ciphertext)?.len();

    println!("● tbenc/v1 ciphertext: {}", args.ciphertext.display());
    println!("  File size:       {} bytes", size);
    println!("  Chunk size:      {} bytes", header.chunk_bytes);
    println!("  Nonce prefix:    {}", hex::encode(header.nonce_prefix));
    println!("  Records:         {}", records);
    println!("  Plaintext bytes: {}", plaintext_bytes);
    Ok(())
}

/// Parse the header and walk the record framing without a key, returning the
/// header, record count, and the total declared plaintext length.
fn walk_ciphertext(path: &PathBuf) -> Result<(FileHeader, u64, u64)> {
    let size = fs::metadata(path)
        .with_context(|| format!("cannot read ciphertext {}", path.display()))?
        .len();
    anyhow::ensure!(size >= HEADER_LEN as u64, "ciphertext shorter than header");

    let mut file = File::open(path)?;
    let mut header_bytes = [0u8; HEADER_LEN];
    file.read_exact(&mut header_bytes)?;
    let header = FileHeader::from_bytes(&header_bytes)?;

    let mut records = 0u64;
    let mut plaintext_bytes = 0u64;
    let mut offset = HEADER_LEN as u64;
    let mut len_bytes = [0u8; RECORD_HEADER_LEN];
    while offset < size {
        anyhow::ensure!(
            size - offset >= RECORD_HEADER_LEN as u64,
            "truncated record header at offset {}",
            offset
        );
        file.read_exact(&mut len_bytes)?;
        let pt_len = parse_record_header(&len_bytes)?;
        anyhow::ensure!(pt_len > 0, "zero-length record at index {}", records);
        anyhow::ensure!(
            pt_len <= header.chunk_bytes,
            "record length {} exceeds chunk size {}",
            pt_len,
            header.chunk_bytes
        );
        let body_len = u64::from(pt_len) + TAG_LEN as u64;
        anyhow::ensure!(
            size - offset - RECORD_HEADER_LEN as u64 >= body_len,
            "truncated record body at index {}",
            records
        );
        std::io::copy(
            &mut file.by_ref().take(body_len),
            &mut std::io::sink(),
        )?;
        records += 1;
        plaintext_bytes += u64::from(pt_len);
        offset += RECORD_HEADER_LEN as u64 + body_len;
    }

    Ok((header, records, plaintext_bytes))
}

fn sha256_file(path: &PathBuf) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("cannot open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1024 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// model.tbenc -> model.manifest.json
fn manifest_filename(ciphertext_name: &str) -> String {
    match ciphertext_name.rsplit_once('.') {
        Some((stem, _)) => format!("{stem}.manifest.json"),
        None => format!("{ciphertext_name}.manifest.json"),
    }
}
