//! Content fingerprints
//!
//! Whole-file SHA-256, read in fixed-size blocks so memory use does not
//! depend on the file size.

use crate::domain::{FileHash, IntakeError, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read block size for hashing
pub const HASH_BLOCK_SIZE: usize = 8192;

/// Calculate the SHA-256 fingerprint of a file
///
/// # Examples
///
/// ```no_run
/// use emr_intake::core::verification::checksum::file_fingerprint;
/// use std::path::Path;
///
/// let hash = file_fingerprint(Path::new("/data/in/census.xlsx")).unwrap();
/// assert_eq!(hash.as_str().len(), 64);
/// ```
pub fn file_fingerprint(path: &Path) -> Result<FileHash> {
    let file = File::open(path)?;
    fingerprint_reader(file)
}

/// Calculate the SHA-256 fingerprint of any reader
pub fn fingerprint_reader<R: Read>(mut reader: R) -> Result<FileHash> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_BLOCK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    FileHash::new(format!("{:x}", hasher.finalize())).map_err(IntakeError::Other)
}
