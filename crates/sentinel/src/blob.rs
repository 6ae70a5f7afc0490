//
// Copyright (c) 2026 TRUSTBRIDGE
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: trustbridge — Confidential model-weight delivery.
//

//! Range-capable blob fetch.
//!
//! The ciphertext source must honor HTTP/1.1 Range requests; the sentinel
//! probes the size with HEAD and stages the file in bounded parts, so the
//! download never holds more than one part in memory.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, RANGE};
use reqwest::StatusCode;
use thiserror::Error;
use trustbridge_core::{Manifest, ManifestError};

#[derive(Error, Debug)]
pub enum BlobError {
    #[error("blob transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("blob request failed with HTTP {0}")]
    Http(StatusCode),

    #[error("blob source does not advertise byte ranges")]
    RangesNotSupported,

    #[error("blob source did not return a usable Content-Length")]
    MissingLength,

    #[error("range {range} answered with HTTP {status}, expected 206")]
    BadRangeResponse { range: String, status: StatusCode },

    #[error("range {range} returned {actual} bytes, expected {expected}")]
    ShortRange {
        range: String,
        expected: u64,
        actual: u64,
    },

    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One remote ciphertext blob behind a range-capable URL.
pub struct RemoteBlob<'a> {
    client: &'a Client,
    url: &'a str,
}

impl<'a> RemoteBlob<'a> {
    pub fn new(client: &'a Client, url: &'a str) -> Self {
        RemoteBlob { client, url }
    }

    /// HEAD probe: total size, with the range capability asserted.
    pub fn size(&self) -> Result<u64, BlobError> {
        let response = self.client.head(self.url).send()?;
        if !response.status().is_success() {
            return Err(BlobError::Http(response.status()));
        }

        let accepts_ranges = response
            .headers()
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.eq_ignore_ascii_case("bytes"))
            .unwrap_or(false);
        if !accepts_ranges {
            return Err(BlobError::RangesNotSupported);
        }

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or(BlobError::MissingLength)
    }

    /// Stage the blob at `path` by sequential bounded range reads. Written to
    /// a sibling partial file and renamed on success; the partial file is
    /// removed on failure.
    pub fn fetch_to(&self, path: &Path, part_bytes: u64) -> Result<u64, BlobError> {
        let total = self.size()?;
        let partial = partial_path(path);

        let result = (|| -> Result<(), BlobError> {
            let mut out = File::create(&partial)?;
            let mut offset = 0u64;
            while offset < total {
                let end = u64::min(offset + part_bytes, total) - 1;
                let range = format!("bytes={}-{}", offset, end);

                let response = self
                    .client
                    .get(self.url)
                    .header(RANGE, range.clone())
                    .send()?;
                if response.status() != StatusCode::PARTIAL_CONTENT {
                    return Err(BlobError::BadRangeResponse {
                        range,
                        status: response.status(),
                    });
                }

                let body = response.bytes()?;
                let expected = end - offset + 1;
                if body.len() as u64 != expected {
                    return Err(BlobError::ShortRange {
                        range,
                        expected,
                        actual: body.len() as u64,
                    });
                }

                out.write_all(&body)?;
                offset = end + 1;
            }
            out.flush()?;
            Ok(())
        })();

        match result {
            Ok(()) => {
                fs::rename(&partial, path)?;
                Ok(total)
            }
            Err(e) => {
                let _ = fs::remove_file(&partial);
                Err(e)
            }
        }
    }
}

/// Fetch and validate the side-car manifest.
pub fn fetch_manifest(client: &Client, url: &str) -> Result<Manifest, BlobError> {
    let response = client.get(url).send()?;
    if !response.status().is_success() {
        return Err(BlobError::Http(response.status()));
    }
    let body = response.bytes()?;
    Ok(Manifest::from_slice(&body)?)
}

fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/data/model.tbenc")),
            PathBuf::from("/data/model.tbenc.partial")
        );
    }
}
