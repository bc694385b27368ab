use std::{
    fs::{self, read_dir},
    os::unix::fs::MetadataExt,
    path::{Path, PathBuf},
};

use log::{debug, trace};
use vfsdir_runtime::UNSAFE_MOUNT_ROOTS;

/// Totals gathered by [`dir_size`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirSize {
    /// Sum of apparent sizes of every non-directory below the root
    pub bytes: u64,
    pub files: u64,
    pub dirs: u64,
}

/// Whether `path` is one of the virtual mount roots (or below one).
pub fn is_unsafe_mount(path: &Path) -> bool {
    UNSAFE_MOUNT_ROOTS
        .iter()
        .any(|root| path.starts_with(root))
}

/// Recursively total the size of everything below `root`.
///
/// Symlinks are counted but never followed, other devices are not entered,
/// and virtual mount roots are skipped entirely. `is_cancelled` is polled
/// once per directory; the walk returns `None` as soon as it reports true.
pub fn dir_size(root: &Path, is_cancelled: impl Fn() -> bool) -> Option<DirSize> {
    let mut total = DirSize::default();

    if is_unsafe_mount(root) {
        debug!("[size] skipping virtual mount {:?}", root);
        return Some(total);
    }

    let root_dev = match fs::symlink_metadata(root) {
        Ok(meta) if meta.is_dir() => meta.dev(),
        Ok(_) => return Some(total),
        Err(e) => {
            debug!("[size] stat({:?}) failed: {e}", root);
            return Some(total);
        }
    };

    let mut pending: Vec<PathBuf> = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        if is_cancelled() {
            trace!("[size] walk of {:?} cancelled", root);
            return None;
        }

        let rd = match read_dir(&dir) {
            Ok(rd) => rd,
            Err(e) => {
                debug!("[size] read_dir({:?}) failed: {e}", dir);
                continue;
            }
        };

        for entry in rd.flatten() {
            let Ok(meta) = entry.metadata() else {
                continue;
            };

            if meta.dev() != root_dev {
                continue;
            }

            if meta.is_dir() {
                let path = entry.path();
                if !is_unsafe_mount(&path) {
                    total.dirs += 1;
                    pending.push(path);
                }
            } else {
                total.files += 1;
                total.bytes += meta.len();
            }
        }
    }

    Some(total)
}

#[cfg(test)]
#[path = "walker_tests.rs"]
mod tests;
