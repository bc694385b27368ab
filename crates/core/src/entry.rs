use std::{
    ffi::{OsStr, OsString},
    fmt, io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, RwLock},
};

use bitflags::bitflags;
use image::RgbaImage;
use log::trace;
use vfsdir_fs::{
    DesktopEntry, FileStat, format_mtime, format_owner, format_permissions, format_size,
};

use crate::{
    mime::{MimeClassifier, MimeType},
    sync::{lock, read, write},
};

pub type FileEntryRef = Arc<FileEntry>;
pub type Thumbnail = Arc<RgbaImage>;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EntryFlags: u8 {
        const DESKTOP_ENTRY = 1 << 0;
        const SYMLINK       = 1 << 1;
        const BROKEN_LINK   = 1 << 2;
        /// `size` holds the recursive total of a directory
        const DEEP_SIZE     = 1 << 3;
    }
}

struct EntryInfo {
    disp_name: String,
    stat: FileStat,
    mime: Option<MimeType>,
    icon: Option<String>,
    flags: EntryFlags,
}

#[derive(Default)]
struct DisplayCache {
    size: Option<String>,
    mtime: Option<String>,
    perm: Option<String>,
    owner: Option<String>,
}

#[derive(Default)]
struct Thumbnails {
    large: Option<Thumbnail>,
    small: Option<Thumbnail>,
}

impl Thumbnails {
    fn slot(&mut self, large: bool) -> &mut Option<Thumbnail> {
        if large { &mut self.large } else { &mut self.small }
    }
}

/// One child of a listed directory.
///
/// Entries are shared through [`FileEntryRef`]; the directory model keeps
/// one reference for its listing, and every other holder counts as someone
/// watching the entry. Metadata is refreshed in place so holders always see
/// the current state.
pub struct FileEntry {
    name: OsString,
    path: PathBuf,
    info: RwLock<EntryInfo>,
    display: Mutex<DisplayCache>,
    thumbs: Mutex<Thumbnails>,
}

fn flags_for(stat: &FileStat) -> EntryFlags {
    let mut flags = EntryFlags::empty();
    flags.set(EntryFlags::SYMLINK, stat.is_symlink);
    flags.set(EntryFlags::BROKEN_LINK, stat.is_broken_link);
    flags
}

impl FileEntry {
    /// Stat `name` inside `dir`.
    pub fn load(dir: &Path, name: &OsStr) -> io::Result<Self> {
        let path = dir.join(name);
        let stat = FileStat::load(&path)?;
        Ok(Self::with_stat(path, name.to_os_string(), stat))
    }

    pub(crate) fn with_stat(path: PathBuf, name: OsString, stat: FileStat) -> Self {
        Self {
            info: RwLock::new(EntryInfo {
                disp_name: name.to_string_lossy().into_owned(),
                stat,
                mime: None,
                icon: None,
                flags: flags_for(&stat),
            }),
            name,
            path,
            display: Mutex::new(DisplayCache::default()),
            thumbs: Mutex::new(Thumbnails::default()),
        }
    }

    /// Re-stat from disk, dropping everything derived from the old state.
    pub(crate) fn refresh(&self) -> io::Result<()> {
        let stat = FileStat::load(&self.path)?;
        {
            let mut info = write(&self.info);
            info.stat = stat;
            info.flags = flags_for(&stat);
            info.mime = None;
            info.icon = None;
            info.disp_name = self.name.to_string_lossy().into_owned();
        }
        *lock(&self.display) = DisplayCache::default();
        *lock(&self.thumbs) = Thumbnails::default();
        trace!("[entry] refreshed {:?}", self.path);
        Ok(())
    }

    /// Classify the entry and, for desktop entries, pick up their name and icon.
    pub(crate) fn resolve_mime(&self, classifier: &dyn MimeClassifier) {
        let stat = self.stat();
        let mime = classifier.classify(&self.path, &stat);
        let desktop = mime.is_desktop_entry();
        write(&self.info).mime = Some(mime);
        if desktop {
            self.load_special_info();
        }
    }

    pub(crate) fn load_special_info(&self) {
        let Ok(entry) = DesktopEntry::load(&self.path) else {
            return;
        };
        let mut info = write(&self.info);
        info.flags.insert(EntryFlags::DESKTOP_ENTRY);
        if let Some(name) = entry.name {
            info.disp_name = name;
        }
        info.icon = entry.icon;
    }

    pub(crate) fn set_deep_size(&self, bytes: u64) {
        {
            let mut info = write(&self.info);
            info.stat.size = bytes;
            info.flags.insert(EntryFlags::DEEP_SIZE);
        }
        lock(&self.display).size = None;
    }

    pub fn name(&self) -> &OsStr {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn disp_name(&self) -> String {
        read(&self.info).disp_name.clone()
    }

    pub fn stat(&self) -> FileStat {
        read(&self.info).stat
    }

    pub fn size(&self) -> u64 {
        read(&self.info).stat.size
    }

    pub fn mtime(&self) -> i64 {
        read(&self.info).stat.mtime
    }

    pub fn flags(&self) -> EntryFlags {
        read(&self.info).flags
    }

    pub fn mime_type(&self) -> Option<MimeType> {
        read(&self.info).mime.clone()
    }

    pub fn has_mime(&self) -> bool {
        read(&self.info).mime.is_some()
    }

    pub fn icon_name(&self) -> Option<String> {
        read(&self.info).icon.clone()
    }

    pub fn is_dir(&self) -> bool {
        let info = read(&self.info);
        info.stat.is_dir() || info.mime.as_ref().is_some_and(MimeType::is_dir)
    }

    pub fn is_image(&self) -> bool {
        read(&self.info).mime.as_ref().is_some_and(MimeType::is_image)
    }

    pub fn is_video(&self) -> bool {
        read(&self.info).mime.as_ref().is_some_and(MimeType::is_video)
    }

    pub fn is_symlink(&self) -> bool {
        self.flags().contains(EntryFlags::SYMLINK)
    }

    pub fn is_desktop_entry(&self) -> bool {
        self.flags().contains(EntryFlags::DESKTOP_ENTRY)
    }

    pub fn disp_size(&self) -> String {
        let size = self.size();
        lock(&self.display)
            .size
            .get_or_insert_with(|| format_size(size))
            .clone()
    }

    pub fn disp_mtime(&self) -> String {
        let mtime = self.mtime();
        lock(&self.display)
            .mtime
            .get_or_insert_with(|| format_mtime(mtime))
            .clone()
    }

    /// Permission string of the entry itself, so links show as `l...`.
    pub fn disp_perm(&self) -> String {
        let mode = self.stat().link_mode;
        lock(&self.display)
            .perm
            .get_or_insert_with(|| format_permissions(mode))
            .clone()
    }

    pub fn disp_owner(&self) -> String {
        let stat = self.stat();
        lock(&self.display)
            .owner
            .get_or_insert_with(|| format_owner(stat.uid, stat.gid))
            .clone()
    }

    pub fn thumbnail(&self, large: bool) -> Option<Thumbnail> {
        lock(&self.thumbs).slot(large).clone()
    }

    pub fn is_thumbnail_loaded(&self, large: bool) -> bool {
        lock(&self.thumbs).slot(large).is_some()
    }

    pub(crate) fn set_thumbnail(&self, large: bool, thumb: Thumbnail) {
        *lock(&self.thumbs).slot(large) = Some(thumb);
    }

    pub(crate) fn unload_thumbnail(&self, large: bool) {
        lock(&self.thumbs).slot(large).take();
    }

    /// Number of live references, listing included.
    pub fn ref_count(this: &FileEntryRef) -> usize {
        Arc::strong_count(this)
    }
}

impl fmt::Debug for FileEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileEntry")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
