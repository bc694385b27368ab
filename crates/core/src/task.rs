use std::{
    panic,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
};

use log::{debug, error};

use crate::sync::lock;

type TaskFn<T> = Box<dyn FnOnce(&TaskCtl) -> T + Send + 'static>;
type FinishFn<T> = Box<dyn FnOnce(&T, bool) + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    Created,
    Running,
    Finished,
    Cancelled,
}

/// Cancellation flag shared between a task and its worker function.
#[derive(Debug, Default)]
pub struct TaskCtl {
    cancelled: AtomicBool,
}

impl TaskCtl {
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

struct Shared<T> {
    ctl: TaskCtl,
    started: AtomicBool,
    finished: AtomicBool,
    result: Mutex<Option<T>>,
}

/// One-shot background job running on its own thread.
///
/// The completion callback registered with [`AsyncTask::on_finish`] runs on
/// the worker thread right after the function returns and receives the
/// return value plus whether cancellation had been requested. Marshalling
/// onto another thread is the callback's business.
pub struct AsyncTask<T: Send + 'static> {
    name: String,
    shared: Arc<Shared<T>>,
    func: Mutex<Option<TaskFn<T>>>,
    on_finish: Mutex<Option<FinishFn<T>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Send + 'static> AsyncTask<T> {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: FnOnce(&TaskCtl) -> T + Send + 'static,
    {
        Self {
            name: name.into(),
            shared: Arc::new(Shared {
                ctl: TaskCtl::default(),
                started: AtomicBool::new(false),
                finished: AtomicBool::new(false),
                result: Mutex::new(None),
            }),
            func: Mutex::new(Some(Box::new(func))),
            on_finish: Mutex::new(None),
            handle: Mutex::new(None),
        }
    }

    /// Register the completion callback. Must be called before `execute`.
    pub fn on_finish<F>(&self, callback: F)
    where
        F: FnOnce(&T, bool) + Send + 'static,
    {
        *lock(&self.on_finish) = Some(Box::new(callback));
    }

    /// Spawn the worker thread. A task runs at most once; later calls are
    /// logged and ignored.
    pub fn execute(&self) {
        let Some(func) = lock(&self.func).take() else {
            error!("[task] {} executed twice", self.name);
            return;
        };
        let on_finish = lock(&self.on_finish).take();
        let shared = Arc::clone(&self.shared);

        shared.started.store(true, Ordering::Release);

        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                let ret = func(&shared.ctl);
                let cancelled = {
                    // Pairs with `cancel` so the outcome is decided once.
                    let _slot = lock(&shared.result);
                    shared.finished.store(true, Ordering::Release);
                    shared.ctl.is_cancelled()
                };

                if let Some(cb) = on_finish {
                    cb(&ret, cancelled);
                }

                *lock(&shared.result) = Some(ret);
            });

        match spawned {
            Ok(handle) => *lock(&self.handle) = Some(handle),
            Err(e) => {
                error!("[task] failed to spawn {}: {e}", self.name);
                self.shared.ctl.cancelled.store(true, Ordering::Release);
                self.shared.finished.store(true, Ordering::Release);
            }
        }
    }

    /// Request cancellation and block until the worker thread has exited.
    ///
    /// The worker's own completion callback may end up here (for instance by
    /// releasing the last handle on the owning model); in that case the join
    /// is skipped since the thread is already on its way out.
    ///
    /// A task that already finished keeps its outcome; only the join happens.
    pub fn cancel(&self) {
        {
            let _slot = lock(&self.shared.result);
            if !self.is_finished() {
                self.shared.ctl.cancelled.store(true, Ordering::Release);
            }
        }
        self.join(true);
        self.shared.finished.store(true, Ordering::Release);
    }

    fn join(&self, propagate_panic: bool) {
        let Some(handle) = lock(&self.handle).take() else {
            return;
        };

        if handle.thread().id() == thread::current().id() {
            debug!("[task] {} cancelled from its own thread", self.name);
            return;
        }

        if let Err(payload) = handle.join() {
            if propagate_panic && !thread::panicking() {
                panic::resume_unwind(payload);
            }
            error!("[task] {} panicked", self.name);
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.shared.ctl.is_cancelled()
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.shared.finished.load(Ordering::Acquire)
    }

    pub fn state(&self) -> TaskState {
        if self.is_cancelled() && self.is_finished() {
            TaskState::Cancelled
        } else if self.is_finished() {
            TaskState::Finished
        } else if self.shared.started.load(Ordering::Acquire) {
            TaskState::Running
        } else {
            TaskState::Created
        }
    }

    /// Take the function's return value once the task has finished.
    pub fn take_result(&self) -> Option<T> {
        lock(&self.shared.result).take()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T: Send + 'static> Drop for AsyncTask<T> {
    fn drop(&mut self) {
        if self.shared.started.load(Ordering::Acquire) {
            self.shared.ctl.cancelled.store(true, Ordering::Release);
            self.join(false);
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
