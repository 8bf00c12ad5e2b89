//! File fingerprinting: sha1 + md5 + crc32 + size in one streamed pass.
//!
//! Zip containers are transparent: their first file entry is fingerprinted instead of the
//! container bytes, so a zipped ROM and the bare ROM produce the same fingerprint.

use crc32fast::Hasher as Crc32;
use md5::Md5;
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use thiserror::Error;
use zip::ZipArchive;

use crate::Fingerprint;
use crate::utils::config::{ARCHIVE_MIME, HashingConsts};

/// Why a file could not be fingerprinted. The message becomes the catalog's `corrupted` reason.
#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("unreadable file {path}: {reason}")]
    Unreadable { path: String, reason: String },
    #[error("corrupt archive {path}: {reason}")]
    CorruptArchive { path: String, reason: String },
    #[error("archive {path} contains no files")]
    EmptyArchive { path: String },
}

/// Fingerprint `path`. When `mimetype` is the archive container, the first file entry (in the
/// container's own order) is fingerprinted; the remaining entries are never read.
pub fn fingerprint(path: &Path, mimetype: &str) -> Result<Fingerprint, FingerprintError> {
    let display = path.display().to_string();
    let file = File::open(path).map_err(|e| FingerprintError::Unreadable {
        path: display.clone(),
        reason: e.to_string(),
    })?;

    if mimetype != ARCHIVE_MIME {
        let reader = BufReader::with_capacity(HashingConsts::HASH_READ_CHUNK_SIZE, file);
        return hash_reader(reader).map_err(|e| FingerprintError::Unreadable {
            path: display,
            reason: e.to_string(),
        });
    }

    let corrupt = |reason: String| FingerprintError::CorruptArchive {
        path: display.clone(),
        reason,
    };
    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(|e| corrupt(e.to_string()))?;
    let mut first_file = None;
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i).map_err(|e| corrupt(e.to_string()))?;
        if entry.is_file() {
            first_file = Some(i);
            break;
        }
    }
    let Some(index) = first_file else {
        return Err(FingerprintError::EmptyArchive {
            path: display.clone(),
        });
    };
    let entry = archive.by_index(index).map_err(|e| corrupt(e.to_string()))?;
    hash_reader(entry).map_err(|e| corrupt(e.to_string()))
}

/// Feed `reader` through all three hashers chunk by chunk.
pub fn hash_reader<R: Read>(mut reader: R) -> io::Result<Fingerprint> {
    let mut sha1 = Sha1::new();
    let mut md5 = Md5::new();
    let mut crc = Crc32::new();
    let mut size = 0u64;
    let mut buffer = vec![0u8; HashingConsts::HASH_READ_CHUNK_SIZE];
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        let chunk = &buffer[..n];
        sha1.update(chunk);
        md5.update(chunk);
        crc.update(chunk);
        size += n as u64;
    }
    Ok(Fingerprint {
        sha1: sha1.finalize().to_vec(),
        md5: md5.finalize().to_vec(),
        crc32: crc.finalize().to_be_bytes().to_vec(),
        size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests_of_abc() {
        let fp = hash_reader(&b"abc"[..]).unwrap();
        assert_eq!(hex::encode(&fp.sha1), "a9993e364706816aba3e25717850c26c9cd0d89d");
        assert_eq!(hex::encode(&fp.md5), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(hex::encode(&fp.crc32), "352441c2");
        assert_eq!(fp.size, 3);
    }

    #[test]
    fn empty_input_has_zero_size() {
        let fp = hash_reader(io::empty()).unwrap();
        assert_eq!(fp.size, 0);
        assert_eq!(hex::encode(&fp.crc32), "00000000");
    }
}
