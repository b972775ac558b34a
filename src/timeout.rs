//! Boot menu timeout persistence.
//!
//! The timeout lives in `<prefix><conf_dir>/timeout` as a single decimal line.
//! An absent file means "no timeout configured", reported as [`NO_TIMEOUT`].
//! There is no in-file "unset" marker: clearing removes the file.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::common::{ensure_dir_mode, remove_if_exists, write_line};
use crate::context::BootContext;

/// Sentinel for "no timeout configured".
pub const NO_TIMEOUT: i32 = -1;

/// Name of the backing file inside the configuration directory.
pub const TIMEOUT_FILE: &str = "timeout";

/// Mode for any configuration directory we have to create.
const CONF_DIR_MODE: u32 = 0o755;

/// Persist `timeout` under the context's prefix.
///
/// A non-positive value clears the setting. Returns false (after logging at
/// error level) when the context has no absolute prefix or the filesystem
/// refuses.
pub fn set_timeout(ctx: &BootContext, timeout: i32) -> bool {
    match try_set_timeout(ctx, timeout) {
        Ok(()) => true,
        Err(e) => {
            log::error!("Failed to set boot timeout: {:#}", e);
            false
        }
    }
}

/// Read the persisted timeout, or [`NO_TIMEOUT`] if unset or unreadable.
///
/// The value is returned verbatim; no range clamping happens here.
pub fn get_timeout(ctx: &BootContext) -> i32 {
    let Some(path) = ctx.timeout_path() else {
        log::error!("Cannot read boot timeout: no usable prefix configured");
        return NO_TIMEOUT;
    };

    // Default: don't use a timeout
    if !path.exists() {
        return NO_TIMEOUT;
    }

    match read_timeout(&path) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("{:#}, defaulting to no timeout", e);
            NO_TIMEOUT
        }
    }
}

fn try_set_timeout(ctx: &BootContext, timeout: i32) -> Result<()> {
    let (Some(dir), Some(path)) = (ctx.config_dir(), ctx.timeout_path()) else {
        bail!("no usable prefix configured");
    };

    ensure_dir_mode(&dir, CONF_DIR_MODE)?;

    if timeout <= 0 {
        if remove_if_exists(&path)? {
            log::debug!("Removed {}", path.display());
        }
        return Ok(());
    }

    write_line(&path, &timeout.to_string())?;
    log::debug!("Wrote timeout {} to {}", timeout, path.display());
    Ok(())
}

fn read_timeout(path: &Path) -> Result<i32> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Unable to open {} for reading", path.display()))?;
    parse_timeout(&content)
        .with_context(|| format!("Failed to parse timeout in {}", path.display()))
}

/// Parse the file as one decimal integer, ignoring surrounding whitespace.
fn parse_timeout(content: &str) -> Result<i32> {
    let value = content.trim();
    if value.is_empty() {
        bail!("empty timeout file");
    }
    if value.split_whitespace().nth(1).is_some() {
        bail!("'{}' is not a single integer", value);
    }
    value
        .parse::<i32>()
        .with_context(|| format!("'{}' is not an integer", value))
}
