//! Host checks: mount state, partition identity, boot device.
//!
//! Every check degrades to `false`/`None` rather than erroring; whether an
//! absent answer is fatal is the caller's call.

pub mod efi;
pub mod mount;
pub mod uuid;

pub use efi::{find_boot_device, is_uefi_host};
pub use mount::{is_mounted, mountpoint_for_device, MountEntry};
pub use uuid::{is_privileged, resolve_part_uuid, resolve_uuid, DeviceLookup, UuidKind};
