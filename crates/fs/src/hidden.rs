use std::{
    ffi::{OsStr, OsString},
    fs::File,
    io::{self, Read},
    os::unix::ffi::OsStrExt,
    path::Path,
};

use hashbrown::HashSet;
use log::debug;
use vfsdir_runtime::{HIDDEN_LIST_MAX_BYTES, HIDDEN_LIST_NAME};

/// Names listed in a directory's `.hidden` file, one per line.
#[derive(Debug, Default, Clone)]
pub struct HiddenList {
    names: HashSet<OsString>,
}

impl HiddenList {
    /// Read `dir/.hidden`. Missing or unreadable files yield `None`; only the
    /// first [`HIDDEN_LIST_MAX_BYTES`] bytes are considered.
    pub fn load(dir: &Path) -> Option<Self> {
        match Self::read(&dir.join(HIDDEN_LIST_NAME)) {
            Ok(list) => Some(list),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                debug!("[hidden] unreadable list in {:?}: {e}", dir);
                None
            }
        }
    }

    fn read(path: &Path) -> io::Result<Self> {
        let mut buf = Vec::new();
        File::open(path)?
            .take(HIDDEN_LIST_MAX_BYTES)
            .read_to_end(&mut buf)?;
        Ok(Self::parse(&buf))
    }

    pub fn parse(bytes: &[u8]) -> Self {
        let names = bytes
            .split(|b| *b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .filter(|line| !line.is_empty())
            .map(|line| OsStr::from_bytes(line).to_os_string())
            .collect();

        Self { names }
    }

    #[inline]
    pub fn contains(&self, name: &OsStr) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
#[path = "hidden_tests.rs"]
mod tests;
