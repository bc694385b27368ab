mod context;
mod dir;
mod entry;
mod mime;
mod monitor;
mod observer;
mod pump;
mod sync;
mod task;
mod thumbnail;

pub use context::{VfsContext, VfsContextBuilder};
pub use dir::{DirFlags, LoadState, VfsDir};
pub use entry::{EntryFlags, FileEntry, FileEntryRef, Thumbnail};
pub use mime::{
    GuessClassifier, MIME_DESKTOP_ENTRY, MIME_DIRECTORY, MIME_EXECUTABLE, MIME_UNKNOWN,
    MimeClassifier, MimeType,
};
pub use monitor::{
    FileMonitor, ManualMonitor, MonitorCallback, MonitorEvent, MonitorEventKind, MonitorHandle,
    NotifyMonitor,
};
pub use observer::{ChannelObserver, DirEvent, DirObserver, ObserverId};
pub use task::{AsyncTask, TaskCtl, TaskState};
pub use thumbnail::{ImageThumbnailer, ThumbnailDecoder};

#[cfg(test)]
mod testutil;
