use std::{
    fs::read_dir,
    sync::{Arc, atomic::Ordering},
};

use hashbrown::hash_map::Entry;
use log::{debug, info, trace, warn};
use vfsdir_fs::{HiddenList, dir_size};
use vfsdir_runtime::HIDDEN_LIST_NAME;

use super::{DirCore, LoadState};
use crate::{
    entry::{FileEntry, FileEntryRef},
    observer::DirEvent,
    sync::lock,
    task::TaskCtl,
};

/// References the scan itself holds on an entry: the listing and the
/// worker's private copy of the new entries.
const SCAN_INTERNAL_REFS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanOutcome {
    Listed,
    /// The directory could not be opened
    Unavailable,
    Cancelled,
}

#[inline]
fn is_watched(entry: &FileEntryRef) -> bool {
    Arc::strong_count(entry) > SCAN_INTERNAL_REFS
}

/// Full listing pass: enumerate, classify, then size watched directories.
pub(crate) fn run(core: &Arc<DirCore>, ctl: &TaskCtl) -> ScanOutcome {
    core.set_state(LoadState::ScanningFiles);

    // Subscribe before reading so nothing created mid-scan is missed.
    core.install_monitor();

    let rd = match read_dir(core.path()) {
        Ok(rd) => rd,
        Err(e) => {
            warn!("[scan] cannot open {:?}: {e}", core.path());
            return ScanOutcome::Unavailable;
        }
    };

    let hidden = HiddenList::load(core.path());
    let mut hidden_count = 0;
    let mut working: Vec<FileEntryRef> = Vec::new();

    for dent in rd {
        if ctl.is_cancelled() {
            return cancelled(core);
        }
        let Ok(dent) = dent else {
            continue;
        };
        let name = dent.file_name();
        if name == HIDDEN_LIST_NAME {
            continue;
        }

        if hidden.as_ref().is_some_and(|list| list.contains(&name)) {
            hidden_count += 1;
            continue;
        }

        let entry = match FileEntry::load(core.path(), &name) {
            Ok(entry) => Arc::new(entry),
            Err(e) => {
                trace!("[scan] {:?} vanished: {e}", name);
                continue;
            }
        };

        // A concurrent create may already have listed this name.
        if let Entry::Vacant(slot) = lock(&core.listing).files.entry(name) {
            slot.insert(Arc::clone(&entry));
            working.push(entry);
        }
    }

    if ctl.is_cancelled() {
        return cancelled(core);
    }

    core.hidden_count.store(hidden_count, Ordering::Release);
    debug!(
        "[scan] {:?}: {} entries, {} hidden",
        core.path(),
        working.len(),
        hidden_count
    );

    core.set_state(LoadState::ResolvingTypes);
    core.emit(DirEvent::Listed { cancelled: false });

    working.sort_by_cached_key(|entry| entry.disp_name().to_lowercase());

    for entry in &working {
        if ctl.is_cancelled() {
            return cancelled(core);
        }
        if entry.has_mime() {
            continue;
        }
        entry.resolve_mime(core.ctx.mime.as_ref());
        if is_watched(entry) {
            core.emit(DirEvent::Changed(Arc::clone(entry)));
        }
    }

    core.set_state(LoadState::ResolvingSizes);
    core.emit(DirEvent::Listed { cancelled: false });

    for entry in working.drain(..) {
        if ctl.is_cancelled() {
            return cancelled(core);
        }
        if !entry.is_dir() || !is_watched(&entry) {
            continue;
        }
        match dir_size(entry.path(), || ctl.is_cancelled()) {
            Some(total) => {
                entry.set_deep_size(total.bytes);
                core.emit(DirEvent::Changed(entry));
            }
            None => return cancelled(core),
        }
    }

    ScanOutcome::Listed
}

fn cancelled(core: &DirCore) -> ScanOutcome {
    lock(&core.listing).files.clear();
    debug!("[scan] {:?} cancelled, listing discarded", core.path());
    ScanOutcome::Cancelled
}

/// Completion callback, run on the scan thread.
pub(crate) fn finish(core: &DirCore, outcome: ScanOutcome, cancel_requested: bool) {
    match outcome {
        ScanOutcome::Listed if !cancel_requested => {
            core.set_state(LoadState::Listed);
            info!("[scan] {:?} listed", core.path());
            core.emit(DirEvent::Listed { cancelled: false });
        }
        ScanOutcome::Unavailable => {
            debug!("[scan] {:?} unavailable, no listing", core.path());
        }
        ScanOutcome::Listed | ScanOutcome::Cancelled => {
            core.emit(DirEvent::Listed { cancelled: true });
        }
    }
}
