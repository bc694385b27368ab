use std::{
    io,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use log::{debug, trace, warn};
use notify::{
    Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher,
    event::{AccessKind, AccessMode, ModifyKind, RenameMode},
};

use super::{FileMonitor, MonitorCallback, MonitorEvent, MonitorEventKind, MonitorHandle, Routes};
use crate::sync::lock;

struct Inner {
    watcher: Mutex<RecommendedWatcher>,
    routes: Arc<Mutex<Routes>>,
}

/// Platform file watcher built on `notify`.
///
/// Each subscribed path gets one non-recursive watch. Events for a child of a
/// watched directory are delivered with the child's name; events for the
/// watched path itself carry no name.
pub struct NotifyMonitor {
    inner: Arc<Inner>,
}

impl NotifyMonitor {
    pub fn new() -> io::Result<Self> {
        let routes: Arc<Mutex<Routes>> = Arc::default();
        let dispatch = Arc::clone(&routes);

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => deliver(&dispatch, &event),
            Err(e) => warn!("[monitor] watcher error: {e}"),
        })
        .map_err(io::Error::other)?;

        Ok(Self {
            inner: Arc::new(Inner {
                watcher: Mutex::new(watcher),
                routes,
            }),
        })
    }
}

impl FileMonitor for NotifyMonitor {
    fn subscribe(
        &self,
        path: &Path,
        _is_dir: bool,
        callback: MonitorCallback,
    ) -> io::Result<MonitorHandle> {
        let (id, first) = lock(&self.inner.routes).add(path, callback);

        if first
            && let Err(e) = lock(&self.inner.watcher).watch(path, RecursiveMode::NonRecursive)
        {
            lock(&self.inner.routes).remove(path, id);
            return Err(io::Error::other(e));
        }
        debug!("[monitor] watching {:?}", path);

        let inner = Arc::downgrade(&self.inner);
        let owned = path.to_path_buf();
        Ok(MonitorHandle::new(path.to_path_buf(), move || {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            if lock(&inner.routes).remove(&owned, id) {
                if let Err(e) = lock(&inner.watcher).unwatch(&owned) {
                    trace!("[monitor] unwatch {:?}: {e}", owned);
                }
                debug!("[monitor] stopped watching {:?}", owned);
            }
        }))
    }
}

fn deliver(routes: &Mutex<Routes>, event: &Event) {
    for (path, kind) in translate(event) {
        // Look up both the path itself and its parent directory; the lock is
        // released before any callback runs.
        let (own, parent) = {
            let routes = lock(routes);
            let own = routes.callbacks(&path);
            let parent = path
                .parent()
                .map(|dir| routes.callbacks(dir))
                .unwrap_or_default();
            (own, parent)
        };

        if !own.is_empty() {
            let ev = MonitorEvent::itself(kind);
            for cb in &own {
                cb(&ev);
            }
        }

        if let Some(name) = path.file_name()
            && !parent.is_empty()
        {
            let ev = MonitorEvent::child(kind, name);
            for cb in &parent {
                cb(&ev);
            }
        }
    }
}

/// Flatten a `notify` event into per-path create/delete/change kinds.
///
/// Renames become a delete of the old name and a create of the new one. A
/// rename whose direction the backend could not tell is resolved by
/// checking whether the path still exists.
pub(crate) fn translate(event: &Event) -> Vec<(PathBuf, MonitorEventKind)> {
    use MonitorEventKind::*;

    let each = |kind: MonitorEventKind| -> Vec<(PathBuf, MonitorEventKind)> {
        event.paths.iter().map(|p| (p.clone(), kind)).collect()
    };

    match &event.kind {
        EventKind::Create(_) => each(Create),
        EventKind::Remove(_) => each(Delete),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(Delete),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => each(Create),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out = Vec::with_capacity(2);
            if let Some(from) = event.paths.first() {
                out.push((from.clone(), Delete));
            }
            if let Some(to) = event.paths.get(1) {
                out.push((to.clone(), Create));
            }
            out
        }
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| {
                let kind = if p.symlink_metadata().is_ok() {
                    Create
                } else {
                    Delete
                };
                (p.clone(), kind)
            })
            .collect(),
        EventKind::Modify(_) => each(Change),
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => each(Change),
        _ => Vec::new(),
    }
}
