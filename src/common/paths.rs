//! Utilities for rooting paths under a prefix.

use std::path::{Component, Path, PathBuf};

/// Join `rel` beneath `prefix`, treating an absolute `rel` as prefix-relative.
///
/// `Path::join` replaces the base when handed an absolute path, which would
/// silently escape the prefix. This strips root components first, and `..`
/// never climbs above the prefix:
/// ```ignore
/// assert_eq!(join_prefixed(Path::new("/mnt/img"), "/etc/kernel"),
///            PathBuf::from("/mnt/img/etc/kernel"));
/// ```
pub fn join_prefixed<P: AsRef<Path>>(prefix: &Path, rel: P) -> PathBuf {
    let mut out = prefix.to_path_buf();
    let floor = prefix.components().count();
    for component in rel.as_ref().components() {
        match component {
            Component::RootDir | Component::Prefix(_) | Component::CurDir => {}
            Component::ParentDir => {
                if out.components().count() > floor {
                    out.pop();
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}
