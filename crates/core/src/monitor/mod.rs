mod manual;
mod watcher;

use std::{
    ffi::OsString,
    fmt, io,
    path::{Path, PathBuf},
    sync::Arc,
};

pub use manual::ManualMonitor;
pub use watcher::NotifyMonitor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitorEventKind {
    Create,
    Delete,
    Change,
}

/// A change reported for a watched path.
///
/// `name` is the child's file name relative to the watched directory, or
/// `None` when the event concerns the watched path itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorEvent {
    pub kind: MonitorEventKind,
    pub name: Option<OsString>,
}

impl MonitorEvent {
    pub fn child(kind: MonitorEventKind, name: impl Into<OsString>) -> Self {
        Self {
            kind,
            name: Some(name.into()),
        }
    }

    pub fn itself(kind: MonitorEventKind) -> Self {
        Self { kind, name: None }
    }
}

pub type MonitorCallback = Arc<dyn Fn(&MonitorEvent) + Send + Sync + 'static>;

/// Source of file-change notifications.
///
/// Callbacks may run on any thread, including a backend-owned one.
pub trait FileMonitor: Send + Sync {
    fn subscribe(
        &self,
        path: &Path,
        is_dir: bool,
        callback: MonitorCallback,
    ) -> io::Result<MonitorHandle>;
}

/// Live subscription; dropping it unsubscribes.
pub struct MonitorHandle {
    path: PathBuf,
    unsubscribe: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl MonitorHandle {
    pub fn new(path: PathBuf, unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self {
            path,
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("path", &self.path)
            .finish()
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

/// Subscribers keyed by watched path, shared by both backends.
#[derive(Default)]
struct Routes {
    next_id: u64,
    by_path: hashbrown::HashMap<PathBuf, Vec<(u64, MonitorCallback)>>,
}

impl Routes {
    /// Returns the subscription id and whether `path` was not watched before.
    fn add(&mut self, path: &Path, callback: MonitorCallback) -> (u64, bool) {
        self.next_id += 1;
        let id = self.next_id;
        let subs = self.by_path.entry(path.to_path_buf()).or_default();
        let first = subs.is_empty();
        subs.push((id, callback));
        (id, first)
    }

    /// Returns true when the last subscriber for `path` went away.
    fn remove(&mut self, path: &Path, id: u64) -> bool {
        let Some(subs) = self.by_path.get_mut(path) else {
            return false;
        };
        subs.retain(|(sub, _)| *sub != id);
        if subs.is_empty() {
            self.by_path.remove(path);
            return true;
        }
        false
    }

    fn callbacks(&self, path: &Path) -> Vec<MonitorCallback> {
        self.by_path
            .get(path)
            .map(|subs| subs.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
