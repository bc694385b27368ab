use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, Weak},
};

use log::trace;
use vfsdir_fs::dir_size;

use crate::{
    context::ContextInner,
    dir::DirCore,
    entry::FileEntryRef,
    observer::DirEvent,
    sync::lock,
    task::{AsyncTask, TaskCtl},
};

/// References held internally while a request is queued: the listing and
/// the request itself. Anything above means someone is looking at the entry.
const REQUEST_INTERNAL_REFS: usize = 2;

struct ThumbnailRequest {
    entry: FileEntryRef,
    n_large: u32,
    n_small: u32,
}

impl ThumbnailRequest {
    fn add(&mut self, large: bool) {
        if large {
            self.n_large += 1;
        } else {
            self.n_small += 1;
        }
    }

    fn remove(&mut self, large: bool) {
        if large {
            self.n_large = self.n_large.saturating_sub(1);
        } else {
            self.n_small = self.n_small.saturating_sub(1);
        }
    }

    fn wants(&self, large: bool) -> bool {
        if large { self.n_large > 0 } else { self.n_small > 0 }
    }

    fn is_empty(&self) -> bool {
        self.n_large == 0 && self.n_small == 0
    }
}

#[derive(Default)]
struct LoaderQueue {
    requests: VecDeque<ThumbnailRequest>,
    /// Entries whose thumbnails finished since the last flush
    updates: Vec<FileEntryRef>,
    running: bool,
    flush_queued: bool,
}

/// Background thumbnail and directory-size producer for one directory.
pub(crate) struct ThumbnailLoader {
    queue: Arc<Mutex<LoaderQueue>>,
    task: Option<AsyncTask<()>>,
    dir: Weak<DirCore>,
    ctx: Arc<ContextInner>,
}

impl ThumbnailLoader {
    pub(crate) fn new(dir: Weak<DirCore>, ctx: Arc<ContextInner>) -> Self {
        Self {
            queue: Arc::default(),
            task: None,
            dir,
            ctx,
        }
    }

    /// Queue `entry` once, counting repeated requests per size, and make
    /// sure a worker is running.
    pub(crate) fn request(&mut self, entry: &FileEntryRef, large: bool) {
        let start = {
            let mut q = lock(&self.queue);
            match q.requests.iter_mut().find(|r| Arc::ptr_eq(&r.entry, entry)) {
                Some(req) => req.add(large),
                None => {
                    let mut req = ThumbnailRequest {
                        entry: Arc::clone(entry),
                        n_large: 0,
                        n_small: 0,
                    };
                    req.add(large);
                    q.requests.push_back(req);
                }
            }
            !std::mem::replace(&mut q.running, true)
        };

        if start {
            self.spawn_worker();
        }
    }

    /// Withdraw one request of the given size from every queued entry.
    /// Returns true when nothing is left queued.
    pub(crate) fn cancel_requests(&mut self, large: bool) -> bool {
        let mut q = lock(&self.queue);
        for req in q.requests.iter_mut() {
            req.remove(large);
        }
        q.requests.retain(|r| !r.is_empty());
        q.requests.is_empty()
    }

    fn spawn_worker(&mut self) {
        // The previous worker already decided to exit; reap it.
        drop(self.task.take());

        let queue = Arc::clone(&self.queue);
        let ctx = Arc::clone(&self.ctx);
        let dir = self.dir.clone();

        let task = AsyncTask::new("vfsdir-thumbnail", move |ctl: &TaskCtl| {
            work(ctl, &queue, &ctx, &dir);
        });
        task.execute();
        self.task = Some(task);
    }
}

fn work(ctl: &TaskCtl, queue: &Arc<Mutex<LoaderQueue>>, ctx: &ContextInner, dir: &Weak<DirCore>) {
    loop {
        if ctl.is_cancelled() {
            return;
        }

        let req = {
            let mut q = lock(queue);
            match q.requests.pop_front() {
                Some(req) => req,
                None => {
                    q.running = false;
                    return;
                }
            }
        };

        if Arc::strong_count(&req.entry) <= REQUEST_INTERNAL_REFS {
            trace!("[thumbnail] {:?} no longer watched", req.entry.name());
            continue;
        }

        let loaded = load(ctl, &req, ctx);

        // No partial results from a cancelled pass.
        if ctl.is_cancelled() {
            return;
        }

        if loaded {
            let schedule = {
                let mut q = lock(queue);
                q.updates.push(Arc::clone(&req.entry));
                !std::mem::replace(&mut q.flush_queued, true)
            };
            if schedule {
                let queue = Arc::clone(queue);
                let dir = dir.clone();
                ctx.pump.idle_add(move || flush(&queue, &dir));
            }
        }
    }
}

fn load(ctl: &TaskCtl, req: &ThumbnailRequest, ctx: &ContextInner) -> bool {
    let entry = &req.entry;
    if !entry.has_mime() {
        entry.resolve_mime(ctx.mime.as_ref());
    }

    if entry.is_dir() {
        return match dir_size(entry.path(), || ctl.is_cancelled()) {
            Some(total) => {
                entry.set_deep_size(total.bytes);
                true
            }
            None => false,
        };
    }

    if !entry.is_image() || entry.size() > ctx.settings.max_thumbnail_file_size {
        return false;
    }

    let mut loaded = false;
    for large in [true, false] {
        if !req.wants(large) || entry.is_thumbnail_loaded(large) {
            continue;
        }
        let size = ctx.settings.thumbnail_size(large);
        if let Some(img) = ctx.thumbnailer.decode(entry.path(), size, entry.mtime()) {
            entry.set_thumbnail(large, Arc::new(img));
            loaded = true;
        }
    }
    loaded
}

fn flush(queue: &Mutex<LoaderQueue>, dir: &Weak<DirCore>) {
    let updates = {
        let mut q = lock(queue);
        q.flush_queued = false;
        std::mem::take(&mut q.updates)
    };

    let Some(dir) = dir.upgrade() else {
        return;
    };
    for entry in updates {
        dir.emit(DirEvent::ThumbnailLoaded(entry));
    }
}
