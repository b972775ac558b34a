//! Boot device discovery via the systemd-boot loader interface.

use std::fs;
use std::path::{Path, PathBuf};

/// Present only when the host booted through UEFI.
pub const EFI_FIRMWARE_DIR: &str = "/sys/firmware/efi";

/// `LoaderDevicePartUUID` in the systemd-boot vendor GUID namespace.
pub const LOADER_DEVICE_PART_UUID: &str =
    "/sys/firmware/efi/efivars/LoaderDevicePartUUID-4a67b082-0a4c-41cf-b6c7-440b29bb8c4f";

/// Whether the running host booted via UEFI.
pub fn is_uefi_host() -> bool {
    Path::new(EFI_FIRMWARE_DIR).exists()
}

/// Device node of the partition the boot loader was started from.
///
/// None on legacy hosts, when the loader didn't export the variable, or when
/// the partition has no `/dev/disk/by-partuuid` node.
pub fn find_boot_device() -> Option<PathBuf> {
    if !is_uefi_host() {
        return None;
    }
    let raw = match fs::read(LOADER_DEVICE_PART_UUID) {
        Ok(raw) => raw,
        Err(e) => {
            log::debug!("LoaderDevicePartUUID unavailable: {}", e);
            return None;
        }
    };
    let uuid = decode_part_uuid(&raw)?;
    let node = Path::new("/dev/disk/by-partuuid").join(&uuid);
    if node.exists() {
        Some(node)
    } else {
        log::warn!("Boot partition {} has no device node", uuid);
        None
    }
}

/// Decode an efivarfs payload: 4 attribute bytes, then NUL-terminated UTF-16LE.
pub fn decode_part_uuid(raw: &[u8]) -> Option<String> {
    let payload = raw.get(4..)?;
    let units: Vec<u16> = payload
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|&unit| unit != 0)
        .collect();
    let uuid = String::from_utf16(&units).ok()?.trim().to_lowercase();
    if uuid.is_empty() {
        None
    } else {
        Some(uuid)
    }
}
