//! Shared test utilities for recboot tests.

#![allow(dead_code)]

use recboot::BootContext;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Test environment with a temporary prefix standing in for an image root.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Prefix all operations are rooted at
    pub prefix: PathBuf,
}

impl TestEnv {
    /// Create a new test environment with an empty prefix.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let prefix = temp_dir.path().join("root");
        fs::create_dir_all(&prefix).expect("Failed to create prefix dir");

        Self {
            _temp_dir: temp_dir,
            prefix,
        }
    }

    /// Boot context rooted at this environment's prefix, in image mode.
    pub fn context(&self) -> BootContext {
        let mut ctx = BootContext::with_prefix(&self.prefix);
        ctx.set_image_mode(true);
        ctx
    }

    /// Path of the timeout file under the default configuration directory.
    pub fn timeout_file(&self) -> PathBuf {
        self.prefix.join("etc/kernel/timeout")
    }

    /// Write a file beneath the prefix, creating parents.
    pub fn write(&self, rel: &str, content: &[u8]) -> PathBuf {
        let path = self.prefix.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }
}

/// Path to a checked-in fixture under tests/data.
pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name)
}

/// Whether the tests run with root privileges.
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions.
    unsafe { libc::geteuid() == 0 }
}

/// Assert that a file exists.
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "Expected file to exist: {}", path.display());
}

/// Assert that a path does not exist.
pub fn assert_missing(path: &Path) {
    assert!(!path.exists(), "Expected {} to be absent", path.display());
}

/// Assert the exact content of a file.
pub fn assert_file_content(path: &Path, expected: &str) {
    let content = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read file {}: {}", path.display(), e));
    assert_eq!(content, expected, "Unexpected content in {}", path.display());
}
