//! Utilities for file operations under a (possibly foreign) root.

use anyhow::{Context, Result};
use std::fs::{self, DirBuilder, File};
use std::io::Write;
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;

/// Create a directory and all missing parents with the given Unix mode.
///
/// Unlike `fs::create_dir_all`, newly created components get `mode` (still
/// subject to the process umask). Existing directories are left untouched.
pub fn ensure_dir_mode(path: &Path, mode: u32) -> Result<()> {
    DirBuilder::new()
        .recursive(true)
        .mode(mode)
        .create(path)
        .with_context(|| format!("Failed to create directory {}", path.display()))
}

/// Truncate `path` and write `line` followed by a newline.
///
/// The handle is flushed and dropped before returning on every path.
pub fn write_line(path: &Path, line: &str) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Unable to open {} for writing", path.display()))?;
    writeln!(file, "{}", line)
        .and_then(|_| file.flush())
        .with_context(|| format!("Unable to write {}", path.display()))?;
    Ok(())
}

/// Remove a file if it exists. Returns `Ok(false)` when there was nothing to remove.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    fs::remove_file(path).with_context(|| format!("Unable to remove {}", path.display()))?;
    Ok(true)
}
