//! Mount table queries.
//!
//! Read-only: nothing here ever mounts or unmounts.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Live mount table for the calling process.
pub const PROC_MOUNTS: &str = "/proc/self/mounts";

/// One line of the mount table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// Mount source, e.g. `/dev/nvme0n1p1` or `tmpfs`
    pub device: String,
    /// Mount point with escapes decoded
    pub mount_point: PathBuf,
    pub fs_type: String,
}

/// Parse mtab-formatted text (`/proc/self/mounts`, `/etc/mtab`).
///
/// Malformed lines are skipped rather than failing the whole table.
pub fn parse_mounts(content: &str) -> Vec<MountEntry> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let device = fields.next()?;
            let mount_point = fields.next()?;
            let fs_type = fields.next()?;
            Some(MountEntry {
                device: unescape(device),
                mount_point: PathBuf::from(unescape(mount_point)),
                fs_type: fs_type.to_string(),
            })
        })
        .collect()
}

/// Decode the kernel's octal escapes (`\040` for space, `\011` tab, `\012`, `\134`).
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_escape(&bytes[i + 1..i + 4]) {
            let value = (bytes[i + 1] - b'0') * 64 + (bytes[i + 2] - b'0') * 8 + (bytes[i + 3] - b'0');
            out.push(value);
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn is_octal_escape(digits: &[u8]) -> bool {
    digits.len() == 3
        && (b'0'..=b'3').contains(&digits[0])
        && digits[1..].iter().all(|d| (b'0'..=b'7').contains(d))
}

/// Read and parse the live mount table.
pub fn read_mount_table() -> Result<Vec<MountEntry>> {
    let content = fs::read_to_string(PROC_MOUNTS)
        .with_context(|| format!("Failed to read {}", PROC_MOUNTS))?;
    Ok(parse_mounts(&content))
}

/// Whether `path` is a mount point in `table`, optionally backed by `device`.
///
/// A mount at `path` from a different device does not count.
pub fn is_mounted_in(table: &[MountEntry], path: &Path, device: Option<&str>) -> bool {
    table.iter().any(|entry| {
        entry.mount_point == path && device.map_or(true, |dev| entry.device == dev)
    })
}

/// Whether `path` is currently a mount point on the live system.
///
/// An unreadable mount table is reported as "not mounted".
pub fn is_mounted(path: &Path, device: Option<&str>) -> bool {
    match read_mount_table() {
        Ok(table) => is_mounted_in(&table, path, device),
        Err(e) => {
            log::warn!("{:#}", e);
            false
        }
    }
}

/// First mount point of `device` on the live system.
pub fn mountpoint_for_device(device: &str) -> Option<PathBuf> {
    let table = match read_mount_table() {
        Ok(table) => table,
        Err(e) => {
            log::warn!("{:#}", e);
            return None;
        }
    };
    table
        .into_iter()
        .find(|entry| entry.device == device)
        .map(|entry| entry.mount_point)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
/dev/nvme0n1p2 / ext4 rw,relatime 0 0
proc /proc proc rw,nosuid,nodev,noexec,relatime 0 0
/dev/nvme0n1p1 /boot vfat rw,relatime,fmask=0077 0 0
/dev/sdb1 /run/media/user/My\\040Disk ext4 rw 0 0
garbage
";

    #[test]
    fn test_parse_mounts() {
        let table = parse_mounts(SAMPLE);
        assert_eq!(table.len(), 4);
        assert_eq!(table[0].device, "/dev/nvme0n1p2");
        assert_eq!(table[2].mount_point, PathBuf::from("/boot"));
        assert_eq!(table[2].fs_type, "vfat");
    }

    #[test]
    fn test_unescape_space() {
        let table = parse_mounts(SAMPLE);
        assert_eq!(table[3].mount_point, PathBuf::from("/run/media/user/My Disk"));
    }

    #[test]
    fn test_unescape_leaves_non_escapes() {
        assert_eq!(unescape("a\\b"), "a\\b");
        assert_eq!(unescape("trail\\04"), "trail\\04");
        assert_eq!(unescape("back\\134slash"), "back\\slash");
    }

    #[test]
    fn test_is_mounted_in() {
        let table = parse_mounts(SAMPLE);
        assert!(is_mounted_in(&table, Path::new("/boot"), None));
        assert!(is_mounted_in(&table, Path::new("/boot"), Some("/dev/nvme0n1p1")));
        assert!(!is_mounted_in(&table, Path::new("/boot"), Some("/dev/sda1")));
        assert!(!is_mounted_in(&table, Path::new("/boot/efi"), None));
    }

    #[test]
    fn test_root_is_mounted() {
        assert!(is_mounted(Path::new("/"), None), "Apparently / not mounted");
    }

    #[test]
    fn test_nonexistent_not_mounted() {
        assert!(!is_mounted(Path::new("/,^roflcopter"), None));
    }
}
