use std::{
    sync::Mutex,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use log::{debug, error, trace};

use crate::sync::lock;

pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

enum PumpMsg {
    Idle(Job),
    Timeout(Instant, Job),
    Stop,
}

pub(crate) struct PumpThread {
    tx: Sender<PumpMsg>,
    handle: JoinHandle<()>,
}

impl PumpThread {
    /// End the thread, dropping pending jobs. Joined unless called from the
    /// pump thread itself.
    pub(crate) fn shutdown(self) {
        let _ = self.tx.send(PumpMsg::Stop);

        if self.handle.thread().id() == thread::current().id() {
            return;
        }

        if self.handle.join().is_err() {
            error!("[pump] dispatch thread panicked");
        }
        debug!("[pump] stopped");
    }
}

/// Single dispatch thread standing in for a main loop.
///
/// Idle jobs run in submission order; timeout jobs run once their deadline
/// passes. The thread starts on the first submission and is torn down by
/// [`EventPump::stop`], after which a new submission starts a fresh one.
pub(crate) struct EventPump {
    thread: Mutex<Option<PumpThread>>,
}

impl EventPump {
    pub(crate) fn new() -> Self {
        Self {
            thread: Mutex::new(None),
        }
    }

    pub(crate) fn idle_add(&self, job: impl FnOnce() + Send + 'static) {
        self.post(PumpMsg::Idle(Box::new(job)));
    }

    pub(crate) fn timeout_add(&self, delay: Duration, job: impl FnOnce() + Send + 'static) {
        self.post(PumpMsg::Timeout(Instant::now() + delay, Box::new(job)));
    }

    fn post(&self, msg: PumpMsg) {
        let mut slot = lock(&self.thread);

        let msg = match slot.as_ref() {
            Some(pump) => match pump.tx.send(msg) {
                Ok(()) => return,
                // The thread died (a job panicked); start over.
                Err(channel::SendError(msg)) => msg,
            },
            None => msg,
        };

        let (tx, rx) = channel::unbounded();
        let spawned = thread::Builder::new()
            .name("vfsdir-pump".into())
            .spawn(move || run(rx));

        match spawned {
            Ok(handle) => {
                trace!("[pump] started");
                if tx.send(msg).is_err() {
                    error!("[pump] thread exited before its first job");
                }
                *slot = Some(PumpThread { tx, handle });
            }
            Err(e) => error!("[pump] failed to spawn dispatch thread: {e}"),
        }
    }

    /// Stop the dispatch thread, dropping pending jobs.
    pub(crate) fn stop(&self) {
        if let Some(pump) = self.detach() {
            pump.shutdown();
        }
    }

    /// Unhook the running thread so the next submission starts a fresh one.
    /// Jobs already queued on the detached thread still run until it is
    /// shut down.
    pub(crate) fn detach(&self) -> Option<PumpThread> {
        lock(&self.thread).take()
    }

    pub(crate) fn is_running(&self) -> bool {
        lock(&self.thread).is_some()
    }
}

impl Drop for EventPump {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(rx: Receiver<PumpMsg>) {
    let mut timers: Vec<(Instant, Job)> = Vec::new();

    loop {
        let next = timers.iter().map(|(at, _)| *at).min();
        let msg = match next {
            Some(deadline) => rx.recv_deadline(deadline),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match msg {
            Ok(PumpMsg::Idle(job)) => job(),
            Ok(PumpMsg::Timeout(at, job)) => timers.push((at, job)),
            Ok(PumpMsg::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let now = Instant::now();
        let (mut due, rest): (Vec<_>, Vec<_>) =
            timers.drain(..).partition(|(at, _)| *at <= now);
        timers = rest;

        due.sort_by_key(|(at, _)| *at);
        for (_, job) in due {
            job();
        }
    }
}

#[cfg(test)]
#[path = "pump_tests.rs"]
mod tests;
