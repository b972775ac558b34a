//! Configuration management for recboot.
//!
//! Reads configuration from .env file and environment variables.
//! Environment variables take precedence over .env file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Where kernels and their cmdline/config fragments are installed.
pub const DEFAULT_KERNEL_DIR: &str = "/usr/lib/kernel";
/// Where boot-loader tunables (the menu timeout) are kept.
pub const DEFAULT_CONF_DIR: &str = "/etc/kernel";
pub const DEFAULT_BOOT_DIR: &str = "/boot";
pub const DEFAULT_VENDOR_PREFIX: &str = "org.levitateos";
pub const DEFAULT_OS_NAME: &str = "LevitateOS";

/// recboot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root of all operations (default: /)
    pub prefix: PathBuf,
    /// Kernel directory, relative to the prefix
    pub kernel_dir: PathBuf,
    /// Configuration directory, relative to the prefix
    pub conf_dir: PathBuf,
    /// Boot directory, relative to the prefix
    pub boot_dir: PathBuf,
    /// Vendor prefix for generated entries (e.g., "org.levitateos")
    pub vendor_prefix: String,
    pub os_name: String,
    /// Operating on an offline image rather than the running host
    pub image_mode: bool,
    /// `image_mode` came from RECBOOT_IMAGE_MODE rather than the prefix
    pub image_mode_pinned: bool,
    pub can_mount: bool,
}

impl Config {
    /// Load configuration from .env file and environment.
    ///
    /// `.env` is looked up in `base_dir`. A prefix other than `/` implies
    /// image mode unless `RECBOOT_IMAGE_MODE` says otherwise.
    pub fn load(base_dir: &Path) -> Self {
        let mut env_vars = HashMap::new();

        let env_path = base_dir.join(".env");
        match dotenvy::from_path_iter(&env_path) {
            Ok(entries) => {
                for entry in entries {
                    match entry {
                        Ok((key, value)) => {
                            env_vars.insert(key, value);
                        }
                        Err(e) => {
                            log::warn!("Stopped reading {}: {}", env_path.display(), e);
                            break;
                        }
                    }
                }
            }
            Err(e) if e.not_found() => {}
            Err(e) => log::warn!("Cannot read {}: {}", env_path.display(), e),
        }

        // Environment variables override .env file
        for (key, value) in std::env::vars() {
            env_vars.insert(key, value);
        }

        Self::from_vars(&env_vars)
    }

    fn from_vars(env_vars: &HashMap<String, String>) -> Self {
        let path_or = |key: &str, default: &str| {
            env_vars
                .get(key)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };

        let prefix = path_or("RECBOOT_PREFIX", "/");
        let kernel_dir = path_or("RECBOOT_KERNEL_DIR", DEFAULT_KERNEL_DIR);
        let conf_dir = path_or("RECBOOT_CONF_DIR", DEFAULT_CONF_DIR);
        let boot_dir = path_or("RECBOOT_BOOT_DIR", DEFAULT_BOOT_DIR);

        let vendor_prefix = env_vars
            .get("RECBOOT_VENDOR_PREFIX")
            .cloned()
            .unwrap_or_else(|| DEFAULT_VENDOR_PREFIX.to_string());

        let os_name = env_vars
            .get("RECBOOT_OS_NAME")
            .cloned()
            .or_else(|| os_release_name(&prefix))
            .unwrap_or_else(|| DEFAULT_OS_NAME.to_string());

        let pinned_image_mode = env_vars.get("RECBOOT_IMAGE_MODE").map(|v| is_truthy(v));
        let image_mode = pinned_image_mode.unwrap_or(prefix != Path::new("/"));

        let can_mount = !env_vars
            .get("RECBOOT_NO_MOUNT")
            .map(|v| is_truthy(v))
            .unwrap_or(false);

        Self {
            prefix,
            kernel_dir,
            conf_dir,
            boot_dir,
            vendor_prefix,
            os_name,
            image_mode,
            image_mode_pinned: pinned_image_mode.is_some(),
            can_mount,
        }
    }

    /// Override the prefix, re-deriving image mode the same way `load` does.
    ///
    /// An image mode pinned by RECBOOT_IMAGE_MODE is left alone.
    pub fn with_prefix(mut self, prefix: &Path) -> Self {
        if !self.image_mode_pinned {
            self.image_mode = prefix != Path::new("/");
        }
        self.prefix = prefix.to_path_buf();
        self
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  RECBOOT_PREFIX: {}", self.prefix.display());
        println!("  RECBOOT_KERNEL_DIR: {}", self.kernel_dir.display());
        println!("  RECBOOT_CONF_DIR: {}", self.conf_dir.display());
        println!("  RECBOOT_BOOT_DIR: {}", self.boot_dir.display());
        println!("  RECBOOT_VENDOR_PREFIX: {}", self.vendor_prefix);
        println!("  RECBOOT_OS_NAME: {}", self.os_name);
        println!("  Image mode: {}", if self.image_mode { "yes" } else { "no" });
        println!("  Mounting: {}", if self.can_mount { "allowed" } else { "disabled" });
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// `NAME=` from `<prefix>/etc/os-release`, falling back to `/usr/lib/os-release`.
fn os_release_name(prefix: &Path) -> Option<String> {
    ["etc/os-release", "usr/lib/os-release"]
        .iter()
        .filter_map(|rel| fs::read_to_string(prefix.join(rel)).ok())
        .find_map(|content| {
            content.lines().find_map(|line| {
                line.strip_prefix("NAME=")
                    .map(|v| v.trim().trim_matches('"').to_string())
                    .filter(|v| !v.is_empty())
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(&vars(&[("RECBOOT_OS_NAME", "Test OS")]));
        assert_eq!(config.prefix, PathBuf::from("/"));
        assert_eq!(config.conf_dir, PathBuf::from(DEFAULT_CONF_DIR));
        assert_eq!(config.kernel_dir, PathBuf::from(DEFAULT_KERNEL_DIR));
        assert!(!config.image_mode);
        assert!(config.can_mount);
    }

    #[test]
    fn test_foreign_prefix_implies_image_mode() {
        let config = Config::from_vars(&vars(&[("RECBOOT_PREFIX", "/mnt/img")]));
        assert!(config.image_mode);

        let config = Config::from_vars(&vars(&[
            ("RECBOOT_PREFIX", "/mnt/img"),
            ("RECBOOT_IMAGE_MODE", "0"),
        ]));
        assert!(!config.image_mode);
        assert!(config.image_mode_pinned);
    }

    #[test]
    fn test_with_prefix_keeps_pinned_image_mode() {
        let config = Config::from_vars(&vars(&[("RECBOOT_IMAGE_MODE", "0")]))
            .with_prefix(Path::new("/mnt/img"));
        assert!(!config.image_mode);

        let config = Config::from_vars(&vars(&[("RECBOOT_IMAGE_MODE", "yes")]))
            .with_prefix(Path::new("/"));
        assert!(config.image_mode);

        let config = Config::from_vars(&vars(&[])).with_prefix(Path::new("/mnt/img"));
        assert!(!config.image_mode_pinned);
        assert!(config.image_mode);
    }

    #[test]
    fn test_no_mount() {
        let config = Config::from_vars(&vars(&[("RECBOOT_NO_MOUNT", "yes")]));
        assert!(!config.can_mount);
    }

    #[test]
    fn test_os_name_from_os_release() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("etc")).unwrap();
        fs::write(
            tmp.path().join("etc/os-release"),
            "ID=levitate\nNAME=\"LevitateOS Live\"\n",
        )
        .unwrap();

        let prefix = tmp.path().to_string_lossy().into_owned();
        let config = Config::from_vars(&vars(&[("RECBOOT_PREFIX", &prefix)]));
        assert_eq!(config.os_name, "LevitateOS Live");
    }

    #[test]
    fn test_load_reads_dotenv() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(".env"),
            "# comment\nRECBOOT_VENDOR_PREFIX='com.example'\n",
        )
        .unwrap();

        let config = Config::load(tmp.path());
        if std::env::var("RECBOOT_VENDOR_PREFIX").is_err() {
            assert_eq!(config.vendor_prefix, "com.example");
        }
    }

    #[test]
    fn test_load_keeps_entries_before_malformed_line() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(".env"),
            "RECBOOT_OS_NAME=\"Before OS\"\nthis line has no equals sign\n",
        )
        .unwrap();

        let config = Config::load(tmp.path());
        if std::env::var("RECBOOT_OS_NAME").is_err() {
            assert_eq!(config.os_name, "Before OS");
        }
    }

    #[test]
    fn test_load_without_dotenv() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load(tmp.path());
        assert!(!config.conf_dir.as_os_str().is_empty());
    }
}
