use crate::core::config::SchedulerConfig;
use crate::core::sync::lock;
use crate::prelude::Arc;
use crate::tiles::kernel::TileKernel;
use crate::tiles::tile::Tile;
use crate::Result;
use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Invoked on the worker thread after each tile the worker computed
pub type CompletionCallback = Arc<dyn Fn(&Arc<Tile>) + Send + Sync>;

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Arc<Tile>>,
    paused: bool,
    stopping: bool,
    /// A dequeued tile is being computed
    busy: bool,
}

struct SchedulerInner {
    state: Mutex<QueueState>,
    /// Signalled on enqueue, resume and stop
    work_ready: Condvar,
    /// Signalled whenever the worker goes idle
    idle: Condvar,
    worker: Mutex<Option<JoinHandle<()>>>,
    kernel: Arc<dyn TileKernel>,
    on_complete: CompletionCallback,
}

impl SchedulerInner {
    fn wait<'a>(
        condvar: &Condvar,
        guard: MutexGuard<'a, QueueState>,
    ) -> MutexGuard<'a, QueueState> {
        condvar.wait(guard).unwrap_or_else(PoisonError::into_inner)
    }

    fn next_tile(&self) -> Option<Arc<Tile>> {
        let mut state = lock(&self.state);
        loop {
            if state.stopping {
                return None;
            }
            if !state.paused {
                if let Some(tile) = state.pending.pop_front() {
                    state.busy = true;
                    return Some(tile);
                }
            }
            state = Self::wait(&self.work_ready, state);
        }
    }

    fn run(&self) {
        log::debug!("tile worker started");
        while let Some(tile) = self.next_tile() {
            // completed meanwhile, typically through its mirror
            if !tile.is_completed() {
                let raster = self.kernel.render(&tile);
                tile.complete(raster);
                log::debug!(
                    "computed tile z={} ({}, {})",
                    tile.zoom_level(),
                    tile.i(),
                    tile.j()
                );
                (self.on_complete)(&tile);
            }
            tile.clear_queued();

            let mut state = lock(&self.state);
            state.busy = false;
            self.idle.notify_all();
        }
        log::debug!("tile worker exiting");
    }
}

/// Single background worker computing tiles in FIFO order.
///
/// Cloning gives another handle to the same worker and queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Spawn the worker thread. `on_complete` runs on that thread after each
    /// computed tile.
    pub fn new(
        kernel: Arc<dyn TileKernel>,
        config: &SchedulerConfig,
        on_complete: CompletionCallback,
    ) -> Result<Self> {
        let inner = Arc::new(SchedulerInner {
            state: Mutex::new(QueueState {
                paused: config.start_paused,
                ..QueueState::default()
            }),
            work_ready: Condvar::new(),
            idle: Condvar::new(),
            worker: Mutex::new(None),
            kernel,
            on_complete,
        });

        let worker_inner = inner.clone();
        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || worker_inner.run())?;
        *lock(&inner.worker) = Some(handle);

        Ok(Self { inner })
    }

    /// Queue `tile` for computation. Returns false if it is already complete
    /// or already queued.
    pub fn schedule(&self, tile: &Arc<Tile>) -> bool {
        if tile.is_completed() {
            return false;
        }
        let mut state = lock(&self.inner.state);
        if state.stopping || !tile.mark_queued() {
            return false;
        }
        state.pending.push_back(tile.clone());
        self.inner.work_ready.notify_one();
        true
    }

    /// Drop every queued tile. A tile already being computed still finishes.
    pub fn clear(&self) {
        let mut state = lock(&self.inner.state);
        let dropped = state.pending.len();
        for tile in state.pending.drain(..) {
            tile.clear_queued();
        }
        if !state.busy {
            self.inner.idle.notify_all();
        }
        if dropped > 0 {
            log::debug!("dropped {} queued tiles", dropped);
        }
    }

    /// Withhold (`true`) or resume (`false`) dequeuing
    pub fn pause(&self, paused: bool) {
        let mut state = lock(&self.inner.state);
        state.paused = paused;
        self.inner.work_ready.notify_all();
    }

    pub fn is_paused(&self) -> bool {
        lock(&self.inner.state).paused
    }

    /// Whether any tile is queued or being computed
    pub fn has_pending(&self) -> bool {
        let state = lock(&self.inner.state);
        state.busy || !state.pending.is_empty()
    }

    /// Number of queued tiles, not counting one being computed
    pub fn pending_count(&self) -> usize {
        lock(&self.inner.state).pending.len()
    }

    /// Block until nothing is queued or computing, or until `timeout`
    /// elapses. Returns true when the worker went idle.
    ///
    /// A paused scheduler with queued tiles never goes idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = lock(&self.inner.state);
        loop {
            if !state.busy && state.pending.is_empty() {
                return true;
            }
            if state.stopping {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .inner
                .idle
                .wait_timeout(state, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    /// Ask the worker to exit and wait for it. Queued tiles are dropped.
    /// Calling it again is a no-op.
    pub fn stop(&self) {
        {
            let mut state = lock(&self.inner.state);
            state.stopping = true;
            for tile in state.pending.drain(..) {
                tile.clear_queued();
            }
            self.inner.work_ready.notify_all();
            self.inner.idle.notify_all();
        }

        let handle = lock(&self.inner.worker).take();
        if let Some(handle) = handle {
            // a completion callback may stop us from the worker itself
            if handle.thread().id() == thread::current().id() {
                return;
            }
            if handle.join().is_err() {
                log::warn!("tile worker panicked");
            }
            log::info!("tile worker stopped");
        }
    }

    pub fn is_stopped(&self) -> bool {
        lock(&self.inner.state).stopping
    }
}
