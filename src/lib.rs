//! recboot - boot environment inspection and boot-loader tunables.
//!
//! Answers questions about the system being configured (what backs the
//! root filesystem, is the boot partition mounted, which kernel is running,
//! did this kernel image change) and persists the boot menu timeout under a
//! caller-supplied prefix, so the same code serves the live host and an
//! offline image.

pub mod bootloader;
pub mod common;
pub mod config;
pub mod context;
pub mod fingerprint;
pub mod host;
pub mod kernel;
pub mod process;
pub mod timeout;

pub use bootloader::{BootLoader, DryRunLoader};
pub use config::Config;
pub use context::{BootContext, BootFacts};
pub use fingerprint::fingerprint;
pub use host::{is_mounted, resolve_part_uuid, resolve_uuid};
pub use kernel::{KernelImage, SystemKernel};
pub use timeout::{get_timeout, set_timeout, NO_TIMEOUT};
