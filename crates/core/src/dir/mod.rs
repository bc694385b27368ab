mod changes;
mod scan;

use std::{
    ffi::{OsStr, OsString},
    fmt,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, RwLock,
        atomic::{AtomicU8, AtomicU64, AtomicUsize, Ordering},
    },
    time::Instant,
};

use bitflags::bitflags;
use hashbrown::HashMap;
use log::{debug, warn};

use crate::{
    context::ContextInner,
    entry::FileEntryRef,
    monitor::{MonitorCallback, MonitorEvent, MonitorHandle},
    observer::{DirEvent, DirObserver, ObserverId},
    sync::{lock, read, write},
    task::AsyncTask,
    thumbnail::ThumbnailLoader,
};

use scan::ScanOutcome;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DirFlags: u8 {
        const HOME          = 1 << 0;
        const DESKTOP       = 1 << 1;
        const TRASH         = 1 << 2;
        /// Unforced change notifications are ignored
        const AVOID_CHANGES = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LoadState {
    Unloaded = 0,
    ScanningFiles = 1,
    ResolvingTypes = 2,
    ResolvingSizes = 3,
    Listed = 4,
}

impl LoadState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => LoadState::ScanningFiles,
            2 => LoadState::ResolvingTypes,
            3 => LoadState::ResolvingSizes,
            4 => LoadState::Listed,
            _ => LoadState::Unloaded,
        }
    }
}

struct DelayedChange {
    entry: FileEntryRef,
    touched: Instant,
}

#[derive(Default)]
struct Listing {
    files: HashMap<OsString, FileEntryRef>,
    /// Entries to re-stat on the next sweep; a failed stat means deletion
    changed: Vec<FileEntryRef>,
    /// Image and video changes held back until the file goes quiet
    delayed: Vec<DelayedChange>,
    created: Vec<OsString>,
}

/// State shared between a directory's handles, its scan worker, its
/// thumbnail loader, and the change sweep.
pub(crate) struct DirCore {
    path: PathBuf,
    flags: DirFlags,
    ctx: Arc<ContextInner>,
    state: AtomicU8,
    listing: Mutex<Listing>,
    observers: RwLock<Vec<(ObserverId, Arc<dyn DirObserver>)>>,
    next_observer: AtomicU64,
    hidden_count: AtomicUsize,
    monitor: Mutex<Option<MonitorHandle>>,
    thumbnails: Mutex<Option<ThumbnailLoader>>,
}

impl DirCore {
    pub(crate) fn new(path: PathBuf, ctx: Arc<ContextInner>) -> Self {
        let mut flags = DirFlags::empty();
        flags.set(DirFlags::HOME, ctx.places.is_home(&path));
        flags.set(DirFlags::DESKTOP, ctx.places.is_desktop(&path));
        flags.set(DirFlags::TRASH, ctx.places.is_trash(&path));
        flags.set(DirFlags::AVOID_CHANGES, ctx.settings.avoids_changes(&path));

        Self {
            path,
            flags,
            ctx,
            state: AtomicU8::new(LoadState::Unloaded as u8),
            listing: Mutex::new(Listing::default()),
            observers: RwLock::new(Vec::new()),
            next_observer: AtomicU64::new(0),
            hidden_count: AtomicUsize::new(0),
            monitor: Mutex::new(None),
            thumbnails: Mutex::new(None),
        }
    }

    #[inline]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn state(&self) -> LoadState {
        LoadState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: LoadState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Deliver `event` to every observer. Never called with a model lock held.
    pub(crate) fn emit(&self, event: DirEvent) {
        let observers: Vec<Arc<dyn DirObserver>> = read(&self.observers)
            .iter()
            .map(|(_, obs)| Arc::clone(obs))
            .collect();
        for obs in &observers {
            event.deliver(obs.as_ref());
        }
    }

    fn install_monitor(self: &Arc<Self>) {
        let core = Arc::downgrade(self);
        let callback: MonitorCallback = Arc::new(move |event: &MonitorEvent| {
            if let Some(core) = core.upgrade() {
                core.on_monitor_event(event);
            }
        });

        match self.ctx.monitor.subscribe(&self.path, true, callback) {
            Ok(handle) => *lock(&self.monitor) = Some(handle),
            Err(e) => warn!("[monitor] cannot watch {:?}: {e}", self.path),
        }
    }

    fn snapshot(&self) -> Vec<FileEntryRef> {
        lock(&self.listing).files.values().cloned().collect()
    }

    fn file(&self, name: &OsStr) -> Option<FileEntryRef> {
        lock(&self.listing).files.get(name).cloned()
    }

    /// Whether `entry` is still the listed entry under its name.
    fn is_listed(&self, entry: &FileEntryRef) -> bool {
        lock(&self.listing)
            .files
            .get(entry.name())
            .is_some_and(|listed| Arc::ptr_eq(listed, entry))
    }

    pub(crate) fn request_thumbnail(self: &Arc<Self>, entry: &FileEntryRef, large: bool) {
        let mut slot = lock(&self.thumbnails);
        slot.get_or_insert_with(|| {
            ThumbnailLoader::new(Arc::downgrade(self), Arc::clone(&self.ctx))
        })
        .request(entry, large);
    }

    fn cancel_thumbnail_requests(&self, large: bool) {
        let retired = {
            let mut slot = lock(&self.thumbnails);
            let drained = slot.as_mut().is_some_and(|l| l.cancel_requests(large));
            if drained { slot.take() } else { None }
        };
        // Joins the worker; done outside the lock.
        drop(retired);
    }

    /// Re-resolve every entry's type and report it as changed.
    pub(crate) fn reload_mime_types(&self) {
        for entry in self.snapshot() {
            entry.resolve_mime(self.ctx.mime.as_ref());
            self.emit(DirEvent::Changed(entry));
        }
    }
}

/// Tears the directory down once the last [`VfsDir`] handle is gone.
pub(crate) struct DirOwner {
    core: Arc<DirCore>,
    task: Mutex<Option<Arc<AsyncTask<ScanOutcome>>>>,
}

impl DirOwner {
    pub(crate) fn new(core: Arc<DirCore>) -> Self {
        Self {
            core,
            task: Mutex::new(None),
        }
    }

    #[inline]
    pub(crate) fn core(&self) -> &Arc<DirCore> {
        &self.core
    }

    pub(crate) fn start_scan(&self) {
        let core = Arc::clone(&self.core);
        let finished = Arc::clone(&self.core);

        let task = AsyncTask::new("vfsdir-scan", move |ctl| scan::run(&core, ctl));
        task.on_finish(move |outcome, cancelled| scan::finish(&finished, *outcome, cancelled));

        let task = Arc::new(task);
        *lock(&self.task) = Some(Arc::clone(&task));
        task.execute();
    }

    fn scan_task(&self) -> Option<Arc<AsyncTask<ScanOutcome>>> {
        lock(&self.task).clone()
    }
}

impl Drop for DirOwner {
    fn drop(&mut self) {
        if let Some(task) = self.scan_task() {
            task.cancel();
        }
        let monitor = lock(&self.core.monitor).take();
        drop(monitor);
        let loader = lock(&self.core.thumbnails).take();
        drop(loader);

        self.core.ctx.forget_dir(&self.core.path);
        debug!("[registry] released {:?}", self.core.path);
    }
}

/// Handle to the live model of one directory.
///
/// Handles are cheap to clone. All handles for a path obtained from the
/// same [`VfsContext`](crate::VfsContext) share one model; it is torn down
/// when the last of them is dropped.
#[derive(Clone)]
pub struct VfsDir {
    owner: Arc<DirOwner>,
}

impl VfsDir {
    pub(crate) fn from_owner(owner: Arc<DirOwner>) -> Self {
        Self { owner }
    }

    #[inline]
    fn core(&self) -> &Arc<DirCore> {
        &self.owner.core
    }

    pub fn path(&self) -> &Path {
        &self.core().path
    }

    pub fn flags(&self) -> DirFlags {
        self.core().flags
    }

    pub fn is_home(&self) -> bool {
        self.flags().contains(DirFlags::HOME)
    }

    pub fn is_desktop(&self) -> bool {
        self.flags().contains(DirFlags::DESKTOP)
    }

    pub fn is_trash(&self) -> bool {
        self.flags().contains(DirFlags::TRASH)
    }

    pub fn avoids_changes(&self) -> bool {
        self.flags().contains(DirFlags::AVOID_CHANGES)
    }

    pub fn load_state(&self) -> LoadState {
        self.core().state()
    }

    /// A scan exists and has not finished.
    pub fn is_loading(&self) -> bool {
        self.owner
            .scan_task()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn is_fully_listed(&self) -> bool {
        self.load_state() == LoadState::Listed
    }

    pub fn is_load_cancelled(&self) -> bool {
        self.owner
            .scan_task()
            .is_some_and(|task| task.is_cancelled())
    }

    /// Cancel the scan and wait for its worker to exit.
    pub fn cancel_load(&self) {
        if let Some(task) = self.owner.scan_task() {
            task.cancel();
        }
    }

    /// Names excluded by the directory's `.hidden` list during the scan.
    pub fn hidden_count(&self) -> usize {
        self.core().hidden_count.load(Ordering::Acquire)
    }

    pub fn file(&self, name: impl AsRef<OsStr>) -> Option<FileEntryRef> {
        self.core().file(name.as_ref())
    }

    /// Snapshot of the listing, ordered by name.
    pub fn files(&self) -> Vec<FileEntryRef> {
        let mut files = self.core().snapshot();
        files.sort_by(|a, b| a.name().cmp(b.name()));
        files
    }

    pub fn file_count(&self) -> usize {
        lock(&self.core().listing).files.len()
    }

    /// Visit every entry with the listing locked. `f` must not call back
    /// into this directory.
    pub fn for_each_file(&self, mut f: impl FnMut(&FileEntryRef)) {
        let listing = lock(&self.core().listing);
        for entry in listing.files.values() {
            f(entry);
        }
    }

    pub fn add_observer(&self, observer: Arc<dyn DirObserver>) -> ObserverId {
        let core = self.core();
        let id = ObserverId(core.next_observer.fetch_add(1, Ordering::Relaxed));
        write(&core.observers).push((id, observer));
        id
    }

    pub fn remove_observer(&self, id: ObserverId) -> bool {
        let mut observers = write(&self.core().observers);
        let before = observers.len();
        observers.retain(|(obs, _)| *obs != id);
        observers.len() != before
    }

    /// Queue a creation of `name`. Unless `force` is set this is ignored for
    /// directories that avoid change tracking.
    pub fn emit_file_created(&self, name: impl AsRef<OsStr>, force: bool) {
        self.core().queue_created(name.as_ref(), force);
    }

    pub fn emit_file_deleted(&self, name: impl AsRef<OsStr>) {
        self.core().queue_deleted(name.as_ref());
    }

    pub fn emit_file_changed(&self, name: impl AsRef<OsStr>, force: bool) {
        self.core().queue_changed(name.as_ref(), force);
    }

    pub fn request_thumbnail(&self, entry: &FileEntryRef, large: bool) {
        self.core().request_thumbnail(entry, large);
    }

    /// Withdraw one pending request of the given size from every queued
    /// entry; the loader is discarded once nothing is left.
    pub fn cancel_thumbnail_requests(&self, large: bool) {
        self.core().cancel_thumbnail_requests(large);
    }

    pub fn unload_thumbnails(&self, large: bool) {
        for entry in self.core().snapshot() {
            entry.unload_thumbnail(large);
        }
    }

    /// Drop this handle.
    pub fn release(self) {}

    /// Whether both handles refer to the same model.
    pub fn same_model(&self, other: &VfsDir) -> bool {
        Arc::ptr_eq(&self.owner, &other.owner)
    }
}

impl fmt::Debug for VfsDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VfsDir")
            .field("path", &self.path())
            .field("state", &self.load_state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "dir_tests.rs"]
mod tests;
