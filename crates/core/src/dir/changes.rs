use std::{ffi::OsStr, sync::Arc, time::Instant};

use hashbrown::hash_map::Entry;
use log::{debug, trace};
use vfsdir_runtime::HIDDEN_LIST_NAME;

use super::{DelayedChange, DirCore, DirFlags};
use crate::{
    entry::{FileEntry, FileEntryRef},
    monitor::{MonitorEvent, MonitorEventKind},
    observer::DirEvent,
    sync::lock,
};

fn push_unique(queue: &mut Vec<FileEntryRef>, entry: FileEntryRef) {
    if !queue.iter().any(|queued| Arc::ptr_eq(queued, &entry)) {
        queue.push(entry);
    }
}

impl DirCore {
    pub(crate) fn on_monitor_event(self: &Arc<Self>, event: &MonitorEvent) {
        match (&event.name, event.kind) {
            (None, MonitorEventKind::Delete) => self.on_self_deleted(),
            (None, _) => {}
            (Some(name), MonitorEventKind::Create) => self.queue_created(name, false),
            (Some(name), MonitorEventKind::Delete) => self.queue_deleted(name),
            (Some(name), MonitorEventKind::Change) => self.queue_changed(name, false),
        }
    }

    fn ignores_unforced(&self, force: bool) -> bool {
        !force && self.flags.contains(DirFlags::AVOID_CHANGES)
    }

    pub(crate) fn queue_created(&self, name: &OsStr, force: bool) {
        if self.ignores_unforced(force) || name == HIDDEN_LIST_NAME {
            return;
        }
        {
            let mut listing = lock(&self.listing);
            if !listing.created.iter().any(|n| n == name) {
                listing.created.push(name.to_os_string());
            }
        }
        trace!("[changes] created {:?} in {:?}", name, self.path);
        self.ctx.schedule_sweep();
    }

    /// Queue the listed entry `name` for a re-stat; the sweep removes it if
    /// the stat fails. Unknown names are ignored.
    pub(crate) fn queue_deleted(&self, name: &OsStr) {
        {
            let mut listing = lock(&self.listing);
            let Some(entry) = listing.files.get(name).cloned() else {
                return;
            };
            push_unique(&mut listing.changed, entry);
        }
        trace!("[changes] deleted {:?} in {:?}", name, self.path);
        self.ctx.schedule_sweep();
    }

    pub(crate) fn queue_changed(&self, name: &OsStr, force: bool) {
        if self.ignores_unforced(force) {
            return;
        }
        {
            let mut listing = lock(&self.listing);
            let Some(entry) = listing.files.get(name).cloned() else {
                return;
            };

            if self.is_delayed_candidate(&entry) {
                let now = Instant::now();
                match listing
                    .delayed
                    .iter_mut()
                    .find(|d| Arc::ptr_eq(&d.entry, &entry))
                {
                    Some(pending) => pending.touched = now,
                    None => listing.delayed.push(DelayedChange {
                        entry,
                        touched: now,
                    }),
                }
            } else {
                push_unique(&mut listing.changed, entry);
            }
        }
        trace!("[changes] changed {:?} in {:?}", name, self.path);
        self.ctx.schedule_sweep();
    }

    /// Media files being written are re-read once they stop changing.
    fn is_delayed_candidate(&self, entry: &FileEntry) -> bool {
        (entry.is_image() || entry.is_video())
            && entry.size() < self.ctx.settings.delayed_change_max_size
    }

    fn on_self_deleted(self: &Arc<Self>) {
        {
            let mut listing = lock(&self.listing);
            listing.files.clear();
            listing.changed.clear();
            listing.delayed.clear();
            listing.created.clear();
        }
        debug!("[changes] {:?} itself was deleted", self.path);

        // Monitor callbacks may run on the watcher's own thread; observers
        // hear about it from the dispatch thread instead.
        let core = Arc::downgrade(self);
        self.ctx.pump.idle_add(move || {
            if let Some(core) = core.upgrade() {
                core.emit(DirEvent::Deleted(None));
            }
        });
    }

    /// Apply everything queued. Delayed changes are applied once they have
    /// been quiet long enough, or immediately when `force` is set. Returns
    /// when the earliest still-delayed change becomes due.
    pub(crate) fn drain_pending(self: &Arc<Self>, now: Instant, force: bool) -> Option<Instant> {
        let quiet = self.ctx.settings.delayed_quiet();

        let (created, mut changed, next_due) = {
            let mut listing = lock(&self.listing);
            let created = std::mem::take(&mut listing.created);
            let mut changed = std::mem::take(&mut listing.changed);
            let mut next_due: Option<Instant> = None;

            let delayed = std::mem::take(&mut listing.delayed);
            for pending in delayed {
                let due = pending.touched + quiet;
                if force || due <= now {
                    push_unique(&mut changed, pending.entry);
                } else {
                    next_due = Some(next_due.map_or(due, |n| n.min(due)));
                    listing.delayed.push(pending);
                }
            }
            (created, changed, next_due)
        };

        for name in &created {
            self.apply_created(name, &mut changed);
        }
        for entry in &changed {
            self.apply_changed(entry);
        }

        next_due
    }

    fn apply_created(self: &Arc<Self>, name: &OsStr, changed: &mut Vec<FileEntryRef>) {
        if let Some(existing) = self.file(name) {
            // Already listed: treat as a change and skip it in this pass's
            // change list.
            changed.retain(|e| !Arc::ptr_eq(e, &existing));
            self.apply_changed(&existing);
            return;
        }

        let entry = match FileEntry::load(&self.path, name) {
            Ok(entry) => Arc::new(entry),
            Err(e) => {
                trace!("[changes] {:?} gone before listing: {e}", name);
                return;
            }
        };
        entry.resolve_mime(self.ctx.mime.as_ref());

        let inserted = match lock(&self.listing).files.entry(name.to_os_string()) {
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&entry));
                true
            }
            Entry::Occupied(_) => false,
        };

        if inserted {
            self.emit(DirEvent::Created(entry));
        }
    }

    fn apply_changed(self: &Arc<Self>, entry: &FileEntryRef) {
        if !self.is_listed(entry) {
            return;
        }

        let had_large = entry.is_thumbnail_loaded(true);
        let had_small = entry.is_thumbnail_loaded(false);

        match entry.refresh() {
            Ok(()) => {
                entry.resolve_mime(self.ctx.mime.as_ref());
                self.emit(DirEvent::Changed(Arc::clone(entry)));
                if had_large {
                    self.request_thumbnail(entry, true);
                }
                if had_small {
                    self.request_thumbnail(entry, false);
                }
            }
            Err(e) => {
                trace!("[changes] {:?} no longer stats: {e}", entry.path());
                let removed = {
                    let mut listing = lock(&self.listing);
                    let listed = listing
                        .files
                        .get(entry.name())
                        .is_some_and(|e| Arc::ptr_eq(e, entry));
                    if listed {
                        listing.files.remove(entry.name());
                    }
                    listed
                };
                if removed {
                    self.emit(DirEvent::Deleted(Some(Arc::clone(entry))));
                }
            }
        }
    }
}
