//! Debounced background autosave.
//!
//! # Responsibility
//! - Save the latest chart snapshot after a quiet period.
//!
//! # Invariants
//! - At most one snapshot is pending; scheduling replaces it and restarts
//!   the quiet period.
//! - `cancel` and drop discard the pending snapshot before it is written.
//! - `cancel` returns only once no write is running, so a caller can write
//!   newer state (or touch the asset directory) without being overtaken by
//!   an older snapshot.
//! - Dropping the saver joins the worker, so no write outlives its owner.

use crate::model::chart::Chart;
use log::debug;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Quiet period used when the host does not configure one.
pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_millis(1000);

/// One snapshot waiting to be written.
#[derive(Debug, Clone)]
pub struct SaveJob {
    pub chart: Chart,
    pub path: PathBuf,
    /// Session revision the snapshot was taken at.
    pub revision: u64,
}

type SaveSink = Box<dyn Fn(SaveJob) + Send + 'static>;

#[derive(Debug, Default)]
struct AutoSaveState {
    pending: Option<SaveJob>,
    deadline: Option<Instant>,
    in_flight: bool,
    shutdown: bool,
}

#[derive(Debug, Default)]
struct AutoSaveInner {
    state: Mutex<AutoSaveState>,
    cv: Condvar,
}

impl AutoSaveInner {
    fn lock(&self) -> MutexGuard<'_, AutoSaveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Debounce timer plus worker thread that runs the save sink.
pub struct AutoSaver {
    inner: Arc<AutoSaveInner>,
    delay: Duration,
    worker: Option<JoinHandle<()>>,
}

impl AutoSaver {
    /// Spawns the worker thread.
    ///
    /// `sink` runs on the worker for every snapshot whose quiet period
    /// elapsed.
    pub fn new(delay: Duration, sink: impl Fn(SaveJob) + Send + 'static) -> io::Result<Self> {
        let inner = Arc::new(AutoSaveInner::default());
        let sink: SaveSink = Box::new(sink);
        let worker = std::thread::Builder::new()
            .name("mandala-autosave".to_owned())
            .spawn({
                let inner = Arc::clone(&inner);
                move || run_worker(inner, sink)
            })?;
        Ok(Self {
            inner,
            delay,
            worker: Some(worker),
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replaces the pending snapshot and restarts the quiet period.
    pub fn schedule(&self, job: SaveJob) {
        let mut state = self.inner.lock();
        state.pending = Some(job);
        state.deadline = Some(Instant::now() + self.delay);
        self.inner.cv.notify_all();
    }

    /// Drops the pending snapshot, if any, and waits for a write the
    /// worker already started.
    pub fn cancel(&self) {
        let mut state = self.inner.lock();
        if state.pending.take().is_some() {
            debug!("event=autosave_cancel module=service status=ok");
        }
        state.deadline = None;
        self.inner.cv.notify_all();
        while state.in_flight {
            state = self
                .inner
                .cv
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub fn has_pending(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    /// Writes the pending snapshot now and waits until the worker is idle.
    pub fn flush(&self) {
        let mut state = self.inner.lock();
        if state.pending.is_some() {
            state.deadline = Some(Instant::now());
            self.inner.cv.notify_all();
        }
        while state.pending.is_some() || state.in_flight {
            state = self
                .inner
                .cv
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl Drop for AutoSaver {
    fn drop(&mut self) {
        {
            let mut state = self.inner.lock();
            state.shutdown = true;
            state.pending = None;
            state.deadline = None;
            self.inner.cv.notify_all();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn run_worker(inner: Arc<AutoSaveInner>, sink: SaveSink) {
    loop {
        let job = {
            let mut state = inner.lock();
            loop {
                if state.shutdown {
                    return;
                }
                match state.deadline {
                    None => {
                        state = inner.cv.wait(state).unwrap_or_else(PoisonError::into_inner);
                    }
                    Some(deadline) => {
                        let now = Instant::now();
                        if now < deadline {
                            state = inner
                                .cv
                                .wait_timeout(state, deadline - now)
                                .unwrap_or_else(PoisonError::into_inner)
                                .0;
                            continue;
                        }
                        state.deadline = None;
                        if let Some(job) = state.pending.take() {
                            state.in_flight = true;
                            break job;
                        }
                    }
                }
            }
        };

        debug!(
            "event=autosave_fire module=service status=start revision={}",
            job.revision
        );
        sink(job);

        let mut state = inner.lock();
        state.in_flight = false;
        inner.cv.notify_all();
    }
}
