//! Boot-loader backends.
//!
//! Backends own their on-disk formats; this crate only hands them the detected
//! context. A [`BootContext`] holds exactly one backend as a trait object, so a
//! different loader can be swapped in without touching the host checks.

use anyhow::{bail, Result};
use std::fmt;
use std::path::Path;

use crate::context::BootContext;

/// Operations every boot-loader backend provides.
pub trait BootLoader: fmt::Debug {
    /// Short identifier used in logs, e.g. `systemd-boot`.
    fn name(&self) -> &str;

    /// Make `image` bootable.
    fn install_kernel(&self, ctx: &BootContext, image: &Path) -> Result<()>;

    /// Remove the loader entry for `image`.
    fn remove_kernel(&self, ctx: &BootContext, image: &Path) -> Result<()>;

    /// Regenerate loader configuration after the stored timeout changed.
    ///
    /// `timeout` is the value read back from the store, `-1` when unset.
    fn apply_timeout(&self, ctx: &BootContext, timeout: i32) -> Result<()>;
}

/// Backend that reports what it would do and never writes anything.
///
/// Used for dry runs and for sessions that can't touch the boot partition.
#[derive(Debug, Default, Clone)]
pub struct DryRunLoader;

impl DryRunLoader {
    pub fn new() -> Self {
        Self
    }
}

impl BootLoader for DryRunLoader {
    fn name(&self) -> &str {
        "dry-run"
    }

    fn install_kernel(&self, ctx: &BootContext, image: &Path) -> Result<()> {
        if !image.is_file() {
            bail!("Kernel image {} does not exist", image.display());
        }
        log::info!(
            "[dry-run] would install {} for {} ({})",
            image.display(),
            ctx.os_name(),
            ctx.vendor_prefix()
        );
        Ok(())
    }

    fn remove_kernel(&self, ctx: &BootContext, image: &Path) -> Result<()> {
        log::info!("[dry-run] would remove {} for {}", image.display(), ctx.os_name());
        Ok(())
    }

    fn apply_timeout(&self, _ctx: &BootContext, timeout: i32) -> Result<()> {
        if timeout > 0 {
            log::info!("[dry-run] would set menu timeout to {}s", timeout);
        } else {
            log::info!("[dry-run] would clear menu timeout");
        }
        Ok(())
    }
}
