//! Kernel descriptors and the kernel inventory under a prefix.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::fingerprint::fingerprint;

/// Release string of the running kernel.
pub const PROC_OSRELEASE: &str = "/proc/sys/kernel/osrelease";

/// The kernel the host is currently running, e.g. `6.6.8-112.lts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemKernel {
    /// Dotted upstream version, e.g. `6.6.8`
    pub version: String,
    /// Distribution release number
    pub release: u32,
    /// Kernel flavour, e.g. `native`, `lts`
    pub ktype: String,
}

impl SystemKernel {
    /// Parse `<version>-<release>.<type>`.
    ///
    /// Release strings that don't follow this layout (distribution kernels
    /// from elsewhere, custom builds) are rejected rather than half-parsed.
    pub fn parse(release: &str) -> Option<Self> {
        let release = release.trim();
        let (version, rest) = release.split_once('-')?;
        let (rel, ktype) = rest.split_once('.')?;

        let version_ok = !version.is_empty()
            && version
                .split('.')
                .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()));
        if !version_ok || ktype.is_empty() {
            return None;
        }

        let rel: u32 = rel.parse().ok()?;
        if rel == 0 {
            return None;
        }

        Some(Self {
            version: version.to_string(),
            release: rel,
            ktype: ktype.to_string(),
        })
    }

    /// Read and parse the running kernel's release string.
    pub fn running() -> Option<Self> {
        let release = match fs::read_to_string(PROC_OSRELEASE) {
            Ok(release) => release,
            Err(e) => {
                log::debug!("Cannot read {}: {}", PROC_OSRELEASE, e);
                return None;
            }
        };
        let parsed = Self::parse(&release);
        if parsed.is_none() {
            log::debug!("Running kernel '{}' is not a managed kernel", release.trim());
        }
        parsed
    }
}

/// A kernel image found in the kernel directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KernelImage {
    pub path: PathBuf,
    /// None if the image could not be read
    pub fingerprint: Option<String>,
}

fn is_kernel_image(name: &str) -> bool {
    name.starts_with("kernel-") || name.starts_with("vmlinuz")
}

/// List and fingerprint kernel images directly inside `dir`, sorted by path.
///
/// A missing directory yields an empty inventory.
pub fn scan_kernel_dir(dir: &Path) -> Vec<KernelImage> {
    if !dir.is_dir() {
        log::debug!("Kernel directory {} does not exist", dir.display());
        return Vec::new();
    }

    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| entry.file_name().to_str().is_some_and(is_kernel_image))
        .map(|entry| KernelImage {
            fingerprint: fingerprint(entry.path()),
            path: entry.into_path(),
        })
        .collect()
}

/// Group images sharing identical content. Only groups of two or more are returned.
pub fn duplicate_groups(images: &[KernelImage]) -> Vec<Vec<&KernelImage>> {
    let mut by_hash: BTreeMap<&str, Vec<&KernelImage>> = BTreeMap::new();
    for image in images {
        if let Some(hash) = image.fingerprint.as_deref() {
            by_hash.entry(hash).or_default().push(image);
        }
    }
    by_hash.into_values().filter(|group| group.len() > 1).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_system_kernel() {
        let kernel = SystemKernel::parse("4.9.0-112.native\n").unwrap();
        assert_eq!(kernel.version, "4.9.0");
        assert_eq!(kernel.release, 112);
        assert_eq!(kernel.ktype, "native");
    }

    #[test]
    fn test_parse_system_kernel_rejects_foreign() {
        assert!(SystemKernel::parse("6.5.0-14-generic").is_none());
        assert!(SystemKernel::parse("6.6.8").is_none());
        assert!(SystemKernel::parse("6.x.8-1.native").is_none());
        assert!(SystemKernel::parse("6.6.8-0.native").is_none());
        assert!(SystemKernel::parse("6.6.8-1.").is_none());
        assert!(SystemKernel::parse("").is_none());
    }

    #[test]
    fn test_scan_kernel_dir() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("kernel-lts.6.6.8-112"), b"image-a").unwrap();
        fs::write(tmp.path().join("vmlinuz-6.6.9"), b"image-b").unwrap();
        fs::write(tmp.path().join("cmdline-lts.6.6.8-112"), b"quiet").unwrap();
        fs::create_dir(tmp.path().join("kernel-dir")).unwrap();

        let images = scan_kernel_dir(tmp.path());
        assert_eq!(images.len(), 2);
        assert!(images[0].path.ends_with("kernel-lts.6.6.8-112"));
        assert!(images.iter().all(|image| image.fingerprint.is_some()));
    }

    #[test]
    fn test_scan_missing_dir() {
        assert!(scan_kernel_dir(Path::new("/nonexistent_kernel_dir_12345")).is_empty());
    }

    #[test]
    fn test_duplicate_groups() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("kernel-a"), b"same").unwrap();
        fs::write(tmp.path().join("kernel-b"), b"same").unwrap();
        fs::write(tmp.path().join("kernel-c"), b"different").unwrap();

        let images = scan_kernel_dir(tmp.path());
        let groups = duplicate_groups(&images);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 2);
    }
}
