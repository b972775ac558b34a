//! Filesystem and partition UUID resolution.
//!
//! Maps a path to the block device backing it and asks blkid for one of
//! its identifiers. The root identity defaults to the filesystem UUID, the
//! value `root=UUID=` consumes; the GPT partition entry UUID
//! (`root=PARTUUID=`) is available with [`UuidKind::Partition`].
//!
//! Probing the device directly needs root; without it we return None
//! instead of trusting blkid's possibly stale cache.

use anyhow::{bail, Context, Result};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};

use super::mount::read_mount_table;
use crate::process::{find_program, Cmd};

/// Which identifier to read off the backing device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UuidKind {
    /// Filesystem superblock UUID (`root=UUID=`)
    #[default]
    Filesystem,
    /// Partition table entry UUID (`root=PARTUUID=`)
    Partition,
}

impl UuidKind {
    /// blkid tag holding this identifier in low-level (-p) mode.
    pub fn blkid_tag(self) -> &'static str {
        match self {
            UuidKind::Filesystem => "UUID",
            UuidKind::Partition => "PART_ENTRY_UUID",
        }
    }

    fn describe(self) -> &'static str {
        match self {
            UuidKind::Filesystem => "filesystem UUID",
            UuidKind::Partition => "partition UUID",
        }
    }
}

/// How a path may be mapped to its block device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceLookup {
    /// sysfs first, then the live mount table
    Live,
    /// sysfs only. Image mode must not read the host's mount table.
    SysfsOnly,
}

/// Whether the current process runs with an effective UID of root.
pub fn is_privileged() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// Resolve the filesystem UUID of the device backing `path`.
///
/// Returns None when unprivileged, when the device can't be determined, or
/// when blkid reports nothing. Callers decide whether that is fatal.
pub fn resolve_uuid(path: &Path) -> Option<String> {
    resolve_uuid_with(path, UuidKind::Filesystem, DeviceLookup::Live)
}

/// Resolve the partition entry UUID of the device backing `path`.
pub fn resolve_part_uuid(path: &Path) -> Option<String> {
    resolve_uuid_with(path, UuidKind::Partition, DeviceLookup::Live)
}

pub fn resolve_uuid_with(path: &Path, kind: UuidKind, lookup: DeviceLookup) -> Option<String> {
    if !is_privileged() {
        log::debug!(
            "Skipping UUID resolution for {}: root privileges required",
            path.display()
        );
        return None;
    }

    match try_resolve_uuid(path, kind, lookup) {
        Ok(Some(uuid)) => Some(uuid),
        Ok(None) => {
            log::warn!("{} has no {}", path.display(), kind.describe());
            None
        }
        Err(e) => {
            log::warn!("Failed to get {} for {}: {:#}", kind.describe(), path.display(), e);
            None
        }
    }
}

fn try_resolve_uuid(path: &Path, kind: UuidKind, lookup: DeviceLookup) -> Result<Option<String>> {
    let device = backing_device(path, lookup)?;
    let blkid = find_program("blkid").context("blkid not found")?;

    Cmd::new(blkid)
        .args(["-p", "-s", kind.blkid_tag(), "-o", "value"])
        .arg_path(&device)
        .error_msg(format!("blkid failed on {}", device.display()))
        .read_value()
}

/// Find the device node for the filesystem containing `path`.
///
/// Uses the st_dev number via sysfs first. Filesystems with anonymous device
/// numbers (btrfs subvolumes, overlay) fall back to the mount table when
/// `lookup` allows it.
pub fn backing_device(path: &Path, lookup: DeviceLookup) -> Result<PathBuf> {
    let meta = fs::metadata(path).with_context(|| format!("Cannot stat {}", path.display()))?;
    let (major, minor) = split_dev(meta.dev());

    if let Some(device) = device_from_sysfs(major, minor) {
        return Ok(device);
    }

    if lookup == DeviceLookup::SysfsOnly {
        bail!(
            "{} ({}:{}) has no sysfs block device and the mount table is off limits in image mode",
            path.display(),
            major,
            minor
        );
    }

    let canonical = fs::canonicalize(path)
        .with_context(|| format!("Cannot resolve {}", path.display()))?;
    let table = read_mount_table()?;
    table
        .iter()
        .filter(|entry| entry.device.starts_with("/dev/"))
        .filter(|entry| canonical.starts_with(&entry.mount_point))
        .max_by_key(|entry| entry.mount_point.components().count())
        .map(|entry| PathBuf::from(&entry.device))
        .with_context(|| format!("No block device backs {}", path.display()))
}

/// Split a Linux `dev_t` into (major, minor).
pub fn split_dev(dev: u64) -> (u64, u64) {
    let major = ((dev >> 32) & 0xffff_f000) | ((dev >> 8) & 0x0000_0fff);
    let minor = ((dev >> 12) & 0xffff_ff00) | (dev & 0x0000_00ff);
    (major, minor)
}

fn device_from_sysfs(major: u64, minor: u64) -> Option<PathBuf> {
    if major == 0 {
        return None;
    }
    let uevent = format!("/sys/dev/block/{}:{}/uevent", major, minor);
    let content = fs::read_to_string(uevent).ok()?;
    devname_from_uevent(&content).map(|name| Path::new("/dev").join(name))
}

fn devname_from_uevent(content: &str) -> Option<&str> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("DEVNAME="))
        .map(str::trim)
        .filter(|name| !name.is_empty())
}
