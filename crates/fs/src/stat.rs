use std::{
    fs::{self, Metadata},
    io::Result,
    os::unix::fs::MetadataExt,
    path::Path,
};

pub const S_IFMT: u32 = 0o170_000;
pub const S_IFSOCK: u32 = 0o140_000;
pub const S_IFLNK: u32 = 0o120_000;
pub const S_IFREG: u32 = 0o100_000;
pub const S_IFBLK: u32 = 0o060_000;
pub const S_IFDIR: u32 = 0o040_000;
pub const S_IFCHR: u32 = 0o020_000;
pub const S_IFIFO: u32 = 0o010_000;

/// Snapshot of the stat fields a directory listing cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FileStat {
    /// Apparent size in bytes
    pub size: u64,
    /// Allocated 512-byte blocks
    pub blocks: u64,
    /// Modification time, seconds since the epoch
    pub mtime: i64,
    /// Access time, seconds since the epoch
    pub atime: i64,
    pub uid: u32,
    pub gid: u32,
    /// Raw mode bits including the file type
    pub mode: u32,
    /// Mode of the path itself, which differs from `mode` only for links
    pub link_mode: u32,
    /// Device the inode lives on
    pub dev: u64,
    /// The path itself is a symlink. The other fields describe the target
    /// unless the link is broken.
    pub is_symlink: bool,
    pub is_broken_link: bool,
}

impl FileStat {
    /// Stat `path` without following a symlink for the type check, then
    /// follow it so size, times and mode describe the target. A dangling link
    /// keeps the link's own fields.
    pub fn load(path: &Path) -> Result<Self> {
        let lmeta = fs::symlink_metadata(path)?;
        if !lmeta.file_type().is_symlink() {
            return Ok(Self::from_metadata(&lmeta));
        }

        match fs::metadata(path) {
            Ok(target) => Ok(Self {
                is_symlink: true,
                link_mode: lmeta.mode(),
                ..Self::from_metadata(&target)
            }),
            Err(_) => Ok(Self {
                is_symlink: true,
                is_broken_link: true,
                ..Self::from_metadata(&lmeta)
            }),
        }
    }

    pub fn from_metadata(meta: &Metadata) -> Self {
        Self {
            size: meta.size(),
            blocks: meta.blocks(),
            mtime: meta.mtime(),
            atime: meta.atime(),
            uid: meta.uid(),
            gid: meta.gid(),
            mode: meta.mode(),
            link_mode: meta.mode(),
            dev: meta.dev(),
            is_symlink: meta.file_type().is_symlink(),
            is_broken_link: false,
        }
    }

    #[inline]
    pub fn file_type(&self) -> u32 {
        self.mode & S_IFMT
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type() == S_IFDIR
    }

    #[inline]
    pub fn is_regular(&self) -> bool {
        self.file_type() == S_IFREG
    }

    /// Sockets, fifos and device nodes.
    #[inline]
    pub fn is_special(&self) -> bool {
        matches!(
            self.file_type(),
            S_IFSOCK | S_IFIFO | S_IFBLK | S_IFCHR
        )
    }

    #[inline]
    pub fn is_executable(&self) -> bool {
        self.is_regular() && self.mode & 0o111 != 0
    }
}

#[cfg(test)]
#[path = "stat_tests.rs"]
mod tests;
