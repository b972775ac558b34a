//! Shared utilities across recboot modules.

pub mod files;
pub mod paths;

pub use files::{ensure_dir_mode, remove_if_exists, write_line};
pub use paths::join_prefixed;
