use std::{
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use log::trace;

use super::{FileMonitor, MonitorCallback, MonitorEvent, MonitorHandle, Routes};
use crate::sync::lock;

/// Monitor that only reports what it is told to through [`ManualMonitor::emit`].
///
/// Used where no kernel watch is wanted, and as the fallback when the
/// platform watcher cannot be created.
#[derive(Clone, Default)]
pub struct ManualMonitor {
    routes: Arc<Mutex<Routes>>,
}

impl ManualMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to every subscriber of `path` on the calling thread.
    /// Returns how many callbacks ran.
    pub fn emit(&self, path: &Path, event: MonitorEvent) -> usize {
        let callbacks = lock(&self.routes).callbacks(path);
        for cb in &callbacks {
            cb(&event);
        }
        callbacks.len()
    }

    pub fn is_watched(&self, path: &Path) -> bool {
        lock(&self.routes).by_path.contains_key(path)
    }

    pub fn watched_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = lock(&self.routes).by_path.keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl FileMonitor for ManualMonitor {
    fn subscribe(
        &self,
        path: &Path,
        _is_dir: bool,
        callback: MonitorCallback,
    ) -> io::Result<MonitorHandle> {
        let (id, _) = lock(&self.routes).add(path, callback);
        trace!("[monitor] manual watch on {:?}", path);

        let routes = Arc::downgrade(&self.routes);
        let owned = path.to_path_buf();
        Ok(MonitorHandle::new(path.to_path_buf(), move || {
            if let Some(routes) = routes.upgrade() {
                lock(&routes).remove(&owned, id);
            }
        }))
    }
}
