use std::{
    path::{Component, Path, PathBuf},
    sync::{Arc, Mutex, OnceLock, Weak},
    time::Instant,
};

use hashbrown::HashMap;
use log::{debug, info, warn};
use vfsdir_fs::Places;
use vfsdir_runtime::VfsSettings;

use crate::{
    dir::{DirCore, DirOwner, VfsDir},
    mime::{GuessClassifier, MimeClassifier},
    monitor::{FileMonitor, ManualMonitor, NotifyMonitor},
    pump::EventPump,
    sync::lock,
    thumbnail::{ImageThumbnailer, ThumbnailDecoder},
};

struct DirSlot {
    owner: Weak<DirOwner>,
    core: Weak<DirCore>,
}

pub(crate) struct ContextInner {
    pub(crate) settings: VfsSettings,
    pub(crate) monitor: Arc<dyn FileMonitor>,
    pub(crate) mime: Arc<dyn MimeClassifier>,
    pub(crate) thumbnailer: Arc<dyn ThumbnailDecoder>,
    pub(crate) places: Places,
    pub(crate) pump: EventPump,
    dirs: Mutex<HashMap<PathBuf, DirSlot>>,
    /// Deadline of the earliest change sweep already posted to the pump
    sweep_due: Mutex<Option<Instant>>,
}

impl ContextInner {
    /// Make sure a sweep runs one debounce interval from now.
    pub(crate) fn schedule_sweep(self: &Arc<Self>) {
        self.arm_sweep(Instant::now() + self.settings.change_debounce());
    }

    fn arm_sweep(self: &Arc<Self>, at: Instant) {
        let now = Instant::now();
        {
            let mut due = lock(&self.sweep_due);
            // A deadline already in the past belongs to a sweep that is
            // running or was lost with a panicking job; post anyway.
            // The pump may also have been replaced since, taking the armed
            // timer with it.
            if due.is_some_and(|d| d <= at && d > now) && self.pump.is_running() {
                return;
            }
            *due = Some(at);
        }

        let ctx = Arc::downgrade(self);
        let delay = at.saturating_duration_since(now);
        self.pump.timeout_add(delay, move || {
            if let Some(ctx) = ctx.upgrade() {
                ctx.run_sweep();
            }
        });
    }

    fn run_sweep(self: &Arc<Self>) {
        let now = Instant::now();
        {
            let mut due = lock(&self.sweep_due);
            if due.is_some_and(|d| d <= now) {
                *due = None;
            }
        }

        if let Some(next) = self.sweep(now, false) {
            self.arm_sweep(next);
        }
    }

    fn sweep(&self, now: Instant, force: bool) -> Option<Instant> {
        let mut next: Option<Instant> = None;
        for core in self.live_cores() {
            if let Some(due) = core.drain_pending(now, force) {
                next = Some(next.map_or(due, |n| n.min(due)));
            }
        }
        next
    }

    fn live_cores(&self) -> Vec<Arc<DirCore>> {
        lock(&self.dirs)
            .values()
            .filter_map(|slot| slot.core.upgrade())
            .collect()
    }

    /// Drop the registry slot for `path` unless a new model already took it.
    pub(crate) fn forget_dir(&self, path: &Path) {
        let idle_pump = {
            let mut dirs = lock(&self.dirs);
            if dirs
                .get(path)
                .is_some_and(|slot| slot.owner.strong_count() == 0)
            {
                dirs.remove(path);
            }

            // Decided under the registry lock: a directory opened right after
            // this arms its sweep on a fresh pump, never on the one going away.
            if dirs.is_empty() {
                let pump = self.pump.detach();
                if pump.is_some() {
                    *lock(&self.sweep_due) = None;
                }
                pump
            } else {
                None
            }
        };

        if let Some(pump) = idle_pump {
            pump.shutdown();
            debug!("[registry] no directories left, dispatch stopped");
        }
    }
}

/// Registry of live directory models plus the services they share.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone)]
pub struct VfsContext {
    inner: Arc<ContextInner>,
}

#[derive(Default)]
pub struct VfsContextBuilder {
    settings: Option<VfsSettings>,
    monitor: Option<Arc<dyn FileMonitor>>,
    mime: Option<Arc<dyn MimeClassifier>>,
    thumbnailer: Option<Arc<dyn ThumbnailDecoder>>,
    places: Option<Places>,
}

impl VfsContextBuilder {
    pub fn settings(mut self, settings: VfsSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn monitor(mut self, monitor: Arc<dyn FileMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn mime_classifier(mut self, mime: Arc<dyn MimeClassifier>) -> Self {
        self.mime = Some(mime);
        self
    }

    pub fn thumbnail_decoder(mut self, decoder: Arc<dyn ThumbnailDecoder>) -> Self {
        self.thumbnailer = Some(decoder);
        self
    }

    pub fn places(mut self, places: Places) -> Self {
        self.places = Some(places);
        self
    }

    /// Anything not supplied falls back to the user's settings file, the
    /// platform watcher, extension-based typing, the cached image
    /// thumbnailer, and the detected home/desktop/trash locations.
    pub fn build(self) -> VfsContext {
        let monitor = self.monitor.unwrap_or_else(default_monitor);
        VfsContext {
            inner: Arc::new(ContextInner {
                settings: self.settings.unwrap_or_else(VfsSettings::load),
                monitor,
                mime: self.mime.unwrap_or_else(|| Arc::new(GuessClassifier::new())),
                thumbnailer: self
                    .thumbnailer
                    .unwrap_or_else(|| Arc::new(ImageThumbnailer::new())),
                places: self.places.unwrap_or_else(Places::detect),
                pump: EventPump::new(),
                dirs: Mutex::new(HashMap::new()),
                sweep_due: Mutex::new(None),
            }),
        }
    }
}

fn default_monitor() -> Arc<dyn FileMonitor> {
    match NotifyMonitor::new() {
        Ok(monitor) => Arc::new(monitor),
        Err(e) => {
            warn!("[monitor] platform watcher unavailable, changes will not be tracked: {e}");
            Arc::new(ManualMonitor::new())
        }
    }
}

/// Absolute form of `path` with `.` components and trailing separators
/// removed. Symlinks and `..` are left alone.
fn normalize(path: &Path) -> PathBuf {
    let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    abs.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

impl VfsContext {
    pub fn builder() -> VfsContextBuilder {
        VfsContextBuilder::default()
    }

    /// Process-wide context with default services, created on first use.
    pub fn global() -> &'static VfsContext {
        static GLOBAL: OnceLock<VfsContext> = OnceLock::new();
        GLOBAL.get_or_init(|| VfsContext::builder().build())
    }

    /// Return the model for `path`, creating it and starting its scan if
    /// none is live.
    pub fn get_or_create(&self, path: impl AsRef<Path>) -> VfsDir {
        let path = normalize(path.as_ref());

        let owner = {
            let mut dirs = lock(&self.inner.dirs);
            if let Some(owner) = dirs.get(&path).and_then(|slot| slot.owner.upgrade()) {
                return VfsDir::from_owner(owner);
            }

            let core = Arc::new(DirCore::new(path.clone(), Arc::clone(&self.inner)));
            let owner = Arc::new(DirOwner::new(core));
            dirs.insert(
                path,
                DirSlot {
                    owner: Arc::downgrade(&owner),
                    core: Arc::downgrade(owner.core()),
                },
            );
            owner
        };

        info!("[registry] loading {:?}", owner.core().path());
        owner.start_scan();
        VfsDir::from_owner(owner)
    }

    /// The live model for `path`, without creating one.
    pub fn get_existing(&self, path: impl AsRef<Path>) -> Option<VfsDir> {
        let path = normalize(path.as_ref());
        lock(&self.inner.dirs)
            .get(&path)
            .and_then(|slot| slot.owner.upgrade())
            .map(VfsDir::from_owner)
    }

    /// Apply every queued change now, on the calling thread, without
    /// waiting for debounce or quiet periods.
    pub fn flush_notify_cache(&self) {
        self.inner.sweep(Instant::now(), true);
    }

    /// Re-classify every entry in every live model, e.g. after the system
    /// type database changed.
    pub fn reload_mime_types(&self) {
        self.inner.mime.reload();
        for core in self.inner.live_cores() {
            core.reload_mime_types();
        }
    }

    pub fn dir_count(&self) -> usize {
        lock(&self.inner.dirs)
            .values()
            .filter(|slot| slot.owner.strong_count() > 0)
            .count()
    }

    pub fn settings(&self) -> &VfsSettings {
        &self.inner.settings
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
