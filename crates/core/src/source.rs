//
// Copyright (c) 2026 TRUSTBRIDGE
// This source code is subject to the terms of the Mozilla Public License, v. 2.0.
// If a copy of the MPL was not distributed with this file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Project: trustbridge — Confidential model-weight delivery.
//

//! Random-access byte sources consumed by the decryption engine.
//!
//! The decoder only ever needs the total size and exact reads at an offset;
//! transport concerns (ranged HTTP fetch, retries, parallel downloads) live
//! with the caller, which stages the ciphertext behind one of these sources.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Abstract random-access view of a ciphertext.
pub trait ByteSource {
    /// Total size of the ciphertext in bytes.
    fn size(&mut self) -> io::Result<u64>;

    /// Fill `buf` exactly from `offset`. Short data is an error.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()>;
}

/// A staged ciphertext file on local disk.
pub struct FileSource {
    file: File,
    len: u64,
}

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(FileSource { file, len })
    }
}

impl ByteSource for FileSource {
    fn size(&mut self) -> io::Result<u64> {
        Ok(self.len)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)
    }
}

/// An in-memory ciphertext, used by tests and small payloads.
pub struct MemorySource {
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(bytes: Vec<u8>) -> Self {
        MemorySource { bytes }
    }
}

impl ByteSource for MemorySource {
    fn size(&mut self) -> io::Result<u64> {
        Ok(self.bytes.len() as u64)
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::UnexpectedEof, "offset out of range"))?;
        let end = start.checked_add(buf.len()).filter(|&e| e <= self.bytes.len());
        match end {
            Some(end) => {
                buf.copy_from_slice(&self.bytes[start..end]);
                Ok(())
            }
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read past end of source",
            )),
        }
    }
}
