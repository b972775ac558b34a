//! Content fingerprints for kernel images.
//!
//! A fingerprint is the SHA-1 of a file's bytes rendered as 40 lowercase hex
//! characters. It only identifies content (did this kernel change since the
//! last run, are two installed kernels identical); it is not a security check.

use anyhow::{Context, Result};
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io;
use std::path::Path;

/// Length of a rendered fingerprint.
pub const FINGERPRINT_LEN: usize = 40;

/// Compute the fingerprint of the file at `path`.
///
/// Returns None if the file doesn't exist or can't be read. A missing file is
/// the normal "nothing installed yet" case and is not logged above debug.
pub fn fingerprint(path: &Path) -> Option<String> {
    if !path.exists() {
        log::debug!("No fingerprint for {}: file does not exist", path.display());
        return None;
    }
    match hash_file(path) {
        Ok(digest) => Some(digest),
        Err(e) => {
            log::warn!("{:#}", e);
            None
        }
    }
}

/// Stream the file through the hasher so large kernel images are never held in memory.
fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open {} for hashing", path.display()))?;
    let mut hasher = Sha1::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("Failed to read {} for hashing", path.display()))?;
    Ok(format!("{:x}", hasher.finalize()))
}
