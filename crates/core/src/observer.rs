use crossbeam::channel::{self, Receiver, Sender};

use crate::entry::FileEntryRef;

/// Receives change notifications from a directory model.
///
/// Notifications are delivered on whatever thread produced them: the scan
/// worker, the dispatch thread, or a caller flushing pending changes. No
/// model lock is held while a method runs, so implementations may query the
/// model or release handles to it.
pub trait DirObserver: Send + Sync {
    fn file_created(&self, _entry: &FileEntryRef) {}

    /// `None` means the directory itself was deleted.
    fn file_deleted(&self, _entry: Option<&FileEntryRef>) {}

    fn file_changed(&self, _entry: &FileEntryRef) {}

    fn thumbnail_loaded(&self, _entry: &FileEntryRef) {}

    /// Sent once per listing phase, and finally with the cancellation flag.
    fn file_listed(&self, _cancelled: bool) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);

#[derive(Debug, Clone)]
pub enum DirEvent {
    Created(FileEntryRef),
    Deleted(Option<FileEntryRef>),
    Changed(FileEntryRef),
    ThumbnailLoaded(FileEntryRef),
    Listed { cancelled: bool },
}

impl DirEvent {
    pub(crate) fn deliver(&self, observer: &dyn DirObserver) {
        match self {
            DirEvent::Created(entry) => observer.file_created(entry),
            DirEvent::Deleted(entry) => observer.file_deleted(entry.as_ref()),
            DirEvent::Changed(entry) => observer.file_changed(entry),
            DirEvent::ThumbnailLoaded(entry) => observer.thumbnail_loaded(entry),
            DirEvent::Listed { cancelled } => observer.file_listed(*cancelled),
        }
    }
}

/// Forwards every notification into a channel.
///
/// Events keep their entries alive until received, which counts as watching
/// them.
pub struct ChannelObserver {
    tx: Sender<DirEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, Receiver<DirEvent>) {
        let (tx, rx) = channel::unbounded();
        (Self { tx }, rx)
    }

    fn send(&self, event: DirEvent) {
        // Receiver gone: nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

impl DirObserver for ChannelObserver {
    fn file_created(&self, entry: &FileEntryRef) {
        self.send(DirEvent::Created(entry.clone()));
    }

    fn file_deleted(&self, entry: Option<&FileEntryRef>) {
        self.send(DirEvent::Deleted(entry.cloned()));
    }

    fn file_changed(&self, entry: &FileEntryRef) {
        self.send(DirEvent::Changed(entry.clone()));
    }

    fn thumbnail_loaded(&self, entry: &FileEntryRef) {
        self.send(DirEvent::ThumbnailLoaded(entry.clone()));
    }

    fn file_listed(&self, cancelled: bool) {
        self.send(DirEvent::Listed { cancelled });
    }
}

#[cfg(test)]
#[path = "observer_tests.rs"]
mod tests;
