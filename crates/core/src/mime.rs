use std::{
    fmt,
    path::Path,
    sync::{Arc, Mutex},
};

use hashbrown::HashMap;
use log::debug;
use vfsdir_fs::{FileStat, S_IFBLK, S_IFCHR, S_IFIFO, S_IFSOCK};

use crate::sync::lock;

pub const MIME_DIRECTORY: &str = "inode/directory";
pub const MIME_DESKTOP_ENTRY: &str = "application/x-desktop";
pub const MIME_UNKNOWN: &str = "application/octet-stream";
pub const MIME_EXECUTABLE: &str = "application/x-executable";

const MIME_BROKEN_LINK: &str = "inode/symlink";

struct MimeInfo {
    name: String,
    description: String,
}

/// Shared handle to a classified file type.
#[derive(Clone)]
pub struct MimeType(Arc<MimeInfo>);

impl MimeType {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self(Arc::new(MimeInfo {
            name: name.into(),
            description: description.into(),
        }))
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[inline]
    pub fn description(&self) -> &str {
        &self.0.description
    }

    #[inline]
    pub fn is_dir(&self) -> bool {
        self.name() == MIME_DIRECTORY
    }

    #[inline]
    pub fn is_image(&self) -> bool {
        self.name().starts_with("image/")
    }

    #[inline]
    pub fn is_video(&self) -> bool {
        self.name().starts_with("video/")
    }

    #[inline]
    pub fn is_desktop_entry(&self) -> bool {
        self.name() == MIME_DESKTOP_ENTRY
    }

    /// Whether both handles came out of the same intern table slot.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }
}

impl PartialEq for MimeType {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for MimeType {}

impl fmt::Debug for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MimeType").field(&self.name()).finish()
    }
}

/// Assigns a [`MimeType`] to a file from its path and stat data.
pub trait MimeClassifier: Send + Sync {
    fn classify(&self, path: &Path, stat: &FileStat) -> MimeType;

    /// Drop cached type data after the system database changed.
    fn reload(&self) {}
}

/// Extension-based classifier backed by `mime_guess2`.
///
/// Equal type names resolve to the same interned handle until
/// [`MimeClassifier::reload`] clears the table.
#[derive(Default)]
pub struct GuessClassifier {
    interned: Mutex<HashMap<String, MimeType>>,
}

impl GuessClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&self, name: &str) -> MimeType {
        let mut table = lock(&self.interned);
        if let Some(mime) = table.get(name) {
            return mime.clone();
        }
        let mime = MimeType::new(name, describe(name));
        table.insert(name.to_owned(), mime.clone());
        mime
    }

    fn guess(path: &Path, stat: &FileStat) -> &'static str {
        if stat.is_broken_link {
            return MIME_BROKEN_LINK;
        }
        if stat.is_dir() {
            return MIME_DIRECTORY;
        }
        match stat.file_type() {
            S_IFCHR => return "inode/chardevice",
            S_IFBLK => return "inode/blockdevice",
            S_IFIFO => return "inode/fifo",
            S_IFSOCK => return "inode/socket",
            _ => {}
        }

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        if ext.as_deref() == Some("desktop") {
            return MIME_DESKTOP_ENTRY;
        }

        match mime_guess2::from_path(path).first_raw() {
            Some(name) => name,
            None if stat.is_executable() => MIME_EXECUTABLE,
            None => MIME_UNKNOWN,
        }
    }
}

impl MimeClassifier for GuessClassifier {
    fn classify(&self, path: &Path, stat: &FileStat) -> MimeType {
        self.intern(Self::guess(path, stat))
    }

    fn reload(&self) {
        let mut table = lock(&self.interned);
        debug!("[mime] dropping {} cached types", table.len());
        table.clear();
    }
}

/// Human-readable description for a type name, e.g. "PNG image".
pub(crate) fn describe(name: &str) -> String {
    match name {
        MIME_DIRECTORY => return "Folder".into(),
        MIME_DESKTOP_ENTRY => return "Desktop entry".into(),
        MIME_UNKNOWN => return "Unknown".into(),
        MIME_EXECUTABLE => return "Executable".into(),
        MIME_BROKEN_LINK => return "Broken link".into(),
        _ => {}
    }

    let Some((top, sub)) = name.split_once('/') else {
        return name.to_owned();
    };
    let sub = sub
        .trim_start_matches("x-")
        .trim_start_matches("vnd.")
        .split(['+', '.'])
        .next()
        .unwrap_or(sub);

    let kind = match top {
        "image" => "image",
        "video" => "video",
        "audio" => "audio",
        "text" => "text",
        "font" => "font",
        "inode" => "special file",
        _ => "file",
    };

    if top == "text" && sub == "plain" {
        return "Plain text".into();
    }
    format!("{} {kind}", sub.to_ascii_uppercase())
}

#[cfg(test)]
#[path = "mime_tests.rs"]
mod tests;
