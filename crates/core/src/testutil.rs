use std::{
    sync::{Arc, Mutex},
    thread,
    time::{Duration, Instant},
};

use vfsdir_fs::Places;
use vfsdir_runtime::VfsSettings;

use crate::{
    DirObserver, FileEntryRef, FileMonitor, GuessClassifier, ImageThumbnailer, ManualMonitor,
    VfsContext, VfsDir,
};

/// Settings where the background sweep never fires during a test, so
/// `flush_notify_cache` is the only thing applying changes.
pub(crate) fn manual_settings() -> VfsSettings {
    VfsSettings {
        change_debounce_ms: 60_000,
        delayed_quiet_ms: 60_000,
        ..VfsSettings::default()
    }
}

pub(crate) fn context_with(monitor: &ManualMonitor, settings: VfsSettings) -> VfsContext {
    context_with_monitor(Arc::new(monitor.clone()), settings)
}

pub(crate) fn context_with_monitor(monitor: Arc<dyn FileMonitor>, settings: VfsSettings) -> VfsContext {
    VfsContext::builder()
        .settings(settings)
        .monitor(monitor)
        .mime_classifier(Arc::new(GuessClassifier::new()))
        .thumbnail_decoder(Arc::new(ImageThumbnailer::without_cache()))
        .places(Places::default())
        .build()
}

pub(crate) fn wait_until(what: &str, cond: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !cond() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(5));
    }
}

pub(crate) fn wait_listed(dir: &VfsDir) {
    wait_until("full listing", || dir.is_fully_listed());
}

/// Records notifications by entry name without keeping entries alive.
#[derive(Default)]
pub(crate) struct NameLog {
    events: Mutex<Vec<(&'static str, Option<String>)>>,
}

impl NameLog {
    fn push(&self, kind: &'static str, entry: Option<&FileEntryRef>) {
        let name = entry.map(|e| e.name().to_string_lossy().into_owned());
        self.events.lock().expect("lock").push((kind, name));
    }

    pub(crate) fn names(&self, kind: &str) -> Vec<String> {
        self.events
            .lock()
            .expect("lock")
            .iter()
            .filter(|(k, _)| *k == kind)
            .filter_map(|(_, name)| name.clone())
            .collect()
    }

    pub(crate) fn count(&self, kind: &str) -> usize {
        self.events
            .lock()
            .expect("lock")
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }
}

impl DirObserver for NameLog {
    fn file_created(&self, entry: &FileEntryRef) {
        self.push("created", Some(entry));
    }

    fn file_deleted(&self, entry: Option<&FileEntryRef>) {
        self.push("deleted", entry);
    }

    fn file_changed(&self, entry: &FileEntryRef) {
        self.push("changed", Some(entry));
    }

    fn thumbnail_loaded(&self, entry: &FileEntryRef) {
        self.push("thumbnail", Some(entry));
    }

    fn file_listed(&self, cancelled: bool) {
        self.push(if cancelled { "cancelled" } else { "listed" }, None);
    }
}
