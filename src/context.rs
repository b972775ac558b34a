//! Per-session boot context.
//!
//! Holds where we operate (the prefix and the paths beneath it), which
//! boot-loader backend is selected, and facts detected during the session.
//! Every derived path goes through [`BootContext::prefixed`], so an image
//! root is never escaped.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::bootloader::{BootLoader, DryRunLoader};
use crate::common::join_prefixed;
use crate::config::{
    Config, DEFAULT_BOOT_DIR, DEFAULT_CONF_DIR, DEFAULT_KERNEL_DIR, DEFAULT_OS_NAME,
    DEFAULT_VENDOR_PREFIX,
};
use crate::kernel::{scan_kernel_dir, KernelImage, SystemKernel};
use crate::host::uuid::{DeviceLookup, UuidKind};
use crate::host::{mount, uuid};
use crate::timeout::{self, TIMEOUT_FILE};

/// Session state shared by the host checks and the timeout store.
#[derive(Debug)]
pub struct BootContext {
    /// Root of all operations; None until set
    prefix: Option<PathBuf>,
    /// Prefix-relative kernel directory
    kernel_dir: PathBuf,
    /// Prefix-relative configuration directory
    conf_dir: PathBuf,
    /// Prefix-relative boot directory
    boot_dir: PathBuf,
    bootloader: Box<dyn BootLoader>,
    vendor_prefix: String,
    os_name: String,
    root_uuid: Option<String>,
    abs_boot_dir: Option<PathBuf>,
    native_kernel: Option<SystemKernel>,
    can_mount: bool,
    image_mode: bool,
}

impl Default for BootContext {
    fn default() -> Self {
        Self::new()
    }
}

impl BootContext {
    /// Create a context with no prefix and a dry-run backend.
    ///
    /// Store operations fail until [`set_prefix`](Self::set_prefix) is called.
    pub fn new() -> Self {
        Self {
            prefix: None,
            kernel_dir: PathBuf::from(DEFAULT_KERNEL_DIR),
            conf_dir: PathBuf::from(DEFAULT_CONF_DIR),
            boot_dir: PathBuf::from(DEFAULT_BOOT_DIR),
            bootloader: Box::new(DryRunLoader::new()),
            vendor_prefix: DEFAULT_VENDOR_PREFIX.to_string(),
            os_name: DEFAULT_OS_NAME.to_string(),
            root_uuid: None,
            abs_boot_dir: None,
            native_kernel: None,
            can_mount: false,
            image_mode: false,
        }
    }

    /// Create a context rooted at `prefix`.
    pub fn with_prefix(prefix: &Path) -> Self {
        let mut ctx = Self::new();
        ctx.set_prefix(prefix);
        ctx
    }

    /// Build a context from loaded configuration and a selected backend.
    pub fn from_config(config: &Config, bootloader: Box<dyn BootLoader>) -> Self {
        let mut ctx = Self::with_prefix(&config.prefix);
        ctx.kernel_dir = config.kernel_dir.clone();
        ctx.conf_dir = config.conf_dir.clone();
        ctx.boot_dir = config.boot_dir.clone();
        ctx.bootloader = bootloader;
        ctx.vendor_prefix = config.vendor_prefix.clone();
        ctx.os_name = config.os_name.clone();
        ctx.can_mount = config.can_mount;
        ctx.image_mode = config.image_mode;
        ctx
    }

    // -------------------------------------------------------------------------
    // Identity and configuration
    // -------------------------------------------------------------------------

    /// Set the prefix. Cached facts describe the old root and are dropped.
    ///
    /// A prefix that isn't absolute (including the empty path) is kept for
    /// display but roots nothing: every derived path is None.
    pub fn set_prefix(&mut self, prefix: &Path) {
        if !prefix.is_absolute() {
            log::warn!("Ignoring non-absolute prefix '{}'", prefix.display());
        }
        self.prefix = Some(prefix.to_path_buf());
        self.root_uuid = None;
        self.abs_boot_dir = None;
    }

    pub fn prefix(&self) -> Option<&Path> {
        self.prefix.as_deref()
    }

    /// The prefix, if it can root paths.
    fn root(&self) -> Option<&Path> {
        self.prefix().filter(|prefix| prefix.is_absolute())
    }

    pub fn set_kernel_dir(&mut self, dir: &Path) {
        self.kernel_dir = dir.to_path_buf();
    }

    pub fn set_conf_dir(&mut self, dir: &Path) {
        self.conf_dir = dir.to_path_buf();
    }

    pub fn set_boot_dir(&mut self, dir: &Path) {
        self.boot_dir = dir.to_path_buf();
        self.abs_boot_dir = None;
    }

    pub fn set_vendor_prefix(&mut self, vendor_prefix: &str) {
        self.vendor_prefix = vendor_prefix.to_string();
    }

    pub fn vendor_prefix(&self) -> &str {
        &self.vendor_prefix
    }

    pub fn set_os_name(&mut self, os_name: &str) {
        self.os_name = os_name.to_string();
    }

    pub fn os_name(&self) -> &str {
        &self.os_name
    }

    pub fn set_bootloader(&mut self, bootloader: Box<dyn BootLoader>) {
        self.bootloader = bootloader;
    }

    pub fn bootloader(&self) -> &dyn BootLoader {
        self.bootloader.as_ref()
    }

    /// Image mode disables live-system checks (mount table, running kernel).
    pub fn set_image_mode(&mut self, image_mode: bool) {
        self.image_mode = image_mode;
        if image_mode {
            self.native_kernel = None;
        }
    }

    pub fn image_mode(&self) -> bool {
        self.image_mode
    }

    pub fn set_can_mount(&mut self, can_mount: bool) {
        self.can_mount = can_mount;
    }

    pub fn can_mount(&self) -> bool {
        self.can_mount
    }

    // -------------------------------------------------------------------------
    // Derived paths
    // -------------------------------------------------------------------------

    /// Root `rel` under the prefix. None if no absolute prefix is set.
    pub fn prefixed<P: AsRef<Path>>(&self, rel: P) -> Option<PathBuf> {
        self.root().map(|prefix| join_prefixed(prefix, rel))
    }

    /// `<prefix><conf_dir>`
    pub fn config_dir(&self) -> Option<PathBuf> {
        self.prefixed(&self.conf_dir)
    }

    /// `<prefix><conf_dir>/timeout`
    pub fn timeout_path(&self) -> Option<PathBuf> {
        self.config_dir().map(|dir| dir.join(TIMEOUT_FILE))
    }

    /// `<prefix><kernel_dir>`
    pub fn kernel_dir(&self) -> Option<PathBuf> {
        self.prefixed(&self.kernel_dir)
    }

    /// `<prefix><boot_dir>`, not canonicalized
    pub fn boot_dir(&self) -> Option<PathBuf> {
        self.prefixed(&self.boot_dir)
    }

    // -------------------------------------------------------------------------
    // Cached facts
    // -------------------------------------------------------------------------

    pub fn root_uuid(&self) -> Option<&str> {
        self.root_uuid.as_deref()
    }

    /// Resolve (once) the filesystem UUID backing the prefix.
    ///
    /// A failed attempt leaves an earlier successful value in place. In image
    /// mode the device is found through sysfs only, never the live mount table.
    pub fn resolve_root_uuid(&mut self) -> Option<&str> {
        if self.root_uuid.is_none() {
            let prefix = self.root()?;
            let lookup = if self.image_mode {
                DeviceLookup::SysfsOnly
            } else {
                DeviceLookup::Live
            };
            if let Some(found) = uuid::resolve_uuid_with(prefix, UuidKind::Filesystem, lookup) {
                log::debug!("Root UUID for {}: {}", prefix.display(), found);
                self.root_uuid = Some(found);
            }
        }
        self.root_uuid.as_deref()
    }

    pub fn abs_boot_dir(&self) -> Option<&Path> {
        self.abs_boot_dir.as_deref()
    }

    /// Resolve (once) the absolute boot directory.
    ///
    /// Symlinks are followed; a boot directory that doesn't exist yet is
    /// not cached so a later call can pick it up.
    pub fn resolve_boot_dir(&mut self) -> Option<&Path> {
        if self.abs_boot_dir.is_none() {
            let boot = self.boot_dir()?;
            match fs::canonicalize(&boot) {
                Ok(resolved) => self.abs_boot_dir = Some(resolved),
                Err(e) => log::debug!("Cannot resolve boot directory {}: {}", boot.display(), e),
            }
        }
        self.abs_boot_dir.as_deref()
    }

    /// Whether the boot directory is a live mount point (optionally of `device`).
    ///
    /// Always false in image mode: the host's mount table says nothing about an image.
    pub fn boot_is_mounted(&self, device: Option<&str>) -> bool {
        if self.image_mode {
            log::debug!("Image mode: not consulting the live mount table");
            return false;
        }
        match self.boot_dir() {
            Some(boot) => mount::is_mounted(&boot, device),
            None => false,
        }
    }

    pub fn native_kernel(&self) -> Option<&SystemKernel> {
        self.native_kernel.as_ref()
    }

    /// Derived from the stored descriptor, so it can't disagree with it.
    pub fn has_native_kernel(&self) -> bool {
        self.native_kernel.is_some()
    }

    /// Detect the running kernel. Never attempted in image mode.
    pub fn detect_native_kernel(&mut self) -> Option<&SystemKernel> {
        if self.image_mode {
            self.native_kernel = None;
        } else {
            self.native_kernel = SystemKernel::running();
        }
        self.native_kernel.as_ref()
    }

    // -------------------------------------------------------------------------
    // Kernels and tunables
    // -------------------------------------------------------------------------

    /// Fingerprinted inventory of the kernel directory.
    pub fn scan_kernels(&self) -> Vec<KernelImage> {
        self.kernel_dir()
            .map(|dir| scan_kernel_dir(&dir))
            .unwrap_or_default()
    }

    /// Store `value` and hand the stored result to the boot-loader backend.
    pub fn update_timeout(&self, value: i32) -> bool {
        if !timeout::set_timeout(self, value) {
            return false;
        }
        let stored = timeout::get_timeout(self);
        match self.bootloader.apply_timeout(self, stored) {
            Ok(()) => true,
            Err(e) => {
                log::error!("{} failed to apply timeout: {:#}", self.bootloader.name(), e);
                false
            }
        }
    }

    /// Snapshot of the context for display.
    pub fn facts(&self) -> BootFacts {
        BootFacts {
            prefix: self.prefix.clone(),
            kernel_dir: self.kernel_dir(),
            config_dir: self.config_dir(),
            boot_dir: self.boot_dir(),
            bootloader: self.bootloader.name().to_string(),
            vendor_prefix: self.vendor_prefix.clone(),
            os_name: self.os_name.clone(),
            root_uuid: self.root_uuid.clone(),
            abs_boot_dir: self.abs_boot_dir.clone(),
            native_kernel: self.native_kernel.clone(),
            can_mount: self.can_mount,
            image_mode: self.image_mode,
            timeout: timeout::get_timeout(self),
        }
    }
}

/// Serializable view of a [`BootContext`].
#[derive(Debug, Clone, Serialize)]
pub struct BootFacts {
    pub prefix: Option<PathBuf>,
    pub kernel_dir: Option<PathBuf>,
    pub config_dir: Option<PathBuf>,
    pub boot_dir: Option<PathBuf>,
    pub bootloader: String,
    pub vendor_prefix: String,
    pub os_name: String,
    pub root_uuid: Option<String>,
    pub abs_boot_dir: Option<PathBuf>,
    pub native_kernel: Option<SystemKernel>,
    pub can_mount: bool,
    pub image_mode: bool,
    pub timeout: i32,
}
