//! Asset preloader - fetch and decode the whole frame sequence up front
//!
//! **Why**: Scrubbing must never wait on I/O, so every frame is resident before
//! the first draw. The sequence is small and co-deployed with the app, which
//! makes a simple all-or-nothing batch the right shape:
//! - All N fetches are submitted at once
//! - Each completion bumps the loaded counter and republishes progress
//! - The cycle finishes only when all N are in; the first failure fails it
//! - No partial collection is ever published, no retries
//!
//! Completions arrive in any order; frames are slotted by index so the published
//! collection is in playback order regardless.
//!
//! **Cancellation**: `start()` and `cancel()` advance the epoch. Queued jobs of an
//! older cycle skip themselves, finished ones drop their result silently, and
//! events still waiting to be published are discarded.
//!
//! Events are queued under the cycle lock and published after it is released, so
//! subscribers may query a `PreloadHandle` or call back into the renderer.

use std::sync::atomic::{AtomicU8, Ordering};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use log::{debug, error, info, trace};
use uuid::Uuid;

use super::epoch::Epoch;
use super::event_bus::EventBus;
use super::renderer_events::{PreloadFailed, PreloadFinished, PreloadProgress};
use crate::entities::{AssetStore, FrameAsset, FrameError, FramePattern, WorkerPool};

/// Ordered, immutable frame collection (index = frame number)
pub type FrameSet = Arc<[FrameAsset]>;

#[derive(thiserror::Error, Debug)]
pub enum PreloadError {
    #[error("frame {index} ({locator}) failed to load: {source}")]
    Asset {
        index: usize,
        locator: String,
        #[source]
        source: FrameError,
    },

    #[error("sequence has no frames")]
    Empty,
}

/// Lifecycle of one preload cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreloadStatus {
    Loading,
    Finished,
    Failed,
    Cancelled,
}

/// round(loaded / total * 100)
pub fn load_percent(loaded: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((loaded as f64 / total as f64) * 100.0).round().min(100.0) as u8
}

/// Event waiting to be published, in the order the cycle produced it
enum Notice {
    Progress(PreloadProgress),
    Finished(PreloadFinished),
    Failed(PreloadFailed),
}

impl Notice {
    fn emit(self, bus: &EventBus) {
        match self {
            Notice::Progress(e) => bus.emit(e),
            Notice::Finished(e) => bus.emit(e),
            Notice::Failed(e) => bus.emit(e),
        }
    }
}

struct CycleInner {
    slots: Vec<Option<FrameAsset>>,
    loaded: usize,
    status: PreloadStatus,
    outbox: VecDeque<Notice>,
}

/// Shared state of one cycle, owned by its jobs and its handle
struct Cycle {
    id: Uuid,
    /// Epoch this cycle started in
    epoch: u64,
    epochs: Epoch,
    total: usize,
    percent: AtomicU8,
    inner: Mutex<CycleInner>,
    /// Held by the one thread currently publishing the outbox
    publishing: Mutex<()>,
}

impl Cycle {
    fn lock(&self) -> MutexGuard<'_, CycleInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record one finished fetch and publish the consequences.
    ///
    /// Events are queued under the cycle lock (so progress is queued in
    /// non-decreasing order) and published after it is released.
    fn complete(
        &self,
        index: usize,
        locator: String,
        result: Result<FrameAsset, FrameError>,
        bus: &EventBus,
    ) {
        self.record(index, locator, result);
        self.publish(bus);
    }

    fn record(&self, index: usize, locator: String, result: Result<FrameAsset, FrameError>) {
        let mut inner = self.lock();

        if !self.epochs.is_current(self.epoch) {
            if inner.status == PreloadStatus::Loading {
                debug!("Preload {}: abandoned, dropping late results", self.id);
                inner.status = PreloadStatus::Cancelled;
                inner.slots.clear();
            }
            return;
        }
        if inner.status != PreloadStatus::Loading {
            trace!("Preload {}: ignoring frame {} after {:?}", self.id, index, inner.status);
            return;
        }

        match result {
            Ok(frame) => {
                if inner.slots[index].replace(frame).is_none() {
                    inner.loaded += 1;
                }
                let percent = load_percent(inner.loaded, self.total);
                self.percent.store(percent, Ordering::Release);
                trace!("Preload {}: frame {} loaded ({}%)", self.id, index, percent);

                let loaded = inner.loaded;
                inner.outbox.push_back(Notice::Progress(PreloadProgress {
                    cycle: self.id,
                    percent,
                    loaded,
                    total: self.total,
                }));

                if loaded == self.total {
                    inner.status = PreloadStatus::Finished;
                    let frames: Vec<FrameAsset> = inner.slots.drain(..).flatten().collect();
                    let bytes: usize = frames.iter().map(FrameAsset::mem).sum();
                    info!(
                        "Preload {}: all {} frames loaded ({:.1} MB)",
                        self.id,
                        frames.len(),
                        bytes as f64 / (1024.0 * 1024.0)
                    );
                    inner.outbox.push_back(Notice::Finished(PreloadFinished {
                        cycle: self.id,
                        frames: frames.into(),
                    }));
                }
            }
            Err(source) => {
                inner.status = PreloadStatus::Failed;
                inner.slots.clear();
                let err = PreloadError::Asset {
                    index,
                    locator,
                    source,
                };
                error!("Failed to load frames: {}", err);
                inner.outbox.push_back(Notice::Failed(PreloadFailed {
                    cycle: self.id,
                    error: Arc::new(err),
                }));
            }
        }
    }

    /// Next queued notice, or None once the outbox is empty. Once the cycle
    /// is stale the outbox is discarded instead.
    fn next_notice(&self) -> Option<Notice> {
        let mut inner = self.lock();
        if !self.epochs.is_current(self.epoch) {
            if !inner.outbox.is_empty() {
                debug!(
                    "Preload {}: cancelled, dropping {} queued events",
                    self.id,
                    inner.outbox.len()
                );
                inner.outbox.clear();
                if inner.status == PreloadStatus::Finished {
                    // Frames were never handed out
                    inner.status = PreloadStatus::Cancelled;
                }
            }
            return None;
        }
        inner.outbox.pop_front()
    }

    /// Publish queued notices with no cycle lock held.
    ///
    /// One thread publishes at a time so events keep their queued order. A
    /// thread that finds publishing busy (another worker, or a subscriber
    /// re-entering on the same thread) leaves its notices to the current
    /// publisher, which re-checks the outbox after letting go.
    fn publish(&self, bus: &EventBus) {
        loop {
            let guard = match self.publishing.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(e)) => e.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            };
            while let Some(notice) = self.next_notice() {
                notice.emit(bus);
            }
            drop(guard);

            if self.lock().outbox.is_empty() {
                return;
            }
        }
    }
}

/// Handle on a running preload cycle
#[derive(Clone)]
pub struct PreloadHandle {
    cycle: Arc<Cycle>,
}

impl std::fmt::Debug for PreloadHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreloadHandle")
            .field("cycle", &self.cycle.id)
            .field("total", &self.cycle.total)
            .field("percent", &self.progress())
            .finish()
    }
}

impl PreloadHandle {
    pub fn id(&self) -> Uuid {
        self.cycle.id
    }

    pub fn total(&self) -> usize {
        self.cycle.total
    }

    /// Last published LoadProgress (lock-free)
    pub fn progress(&self) -> u8 {
        self.cycle.percent.load(Ordering::Acquire)
    }

    /// Current status. Safe to call from any event callback.
    pub fn status(&self) -> PreloadStatus {
        let status = self.cycle.lock().status;
        if status == PreloadStatus::Loading && !self.cycle.epochs.is_current(self.cycle.epoch) {
            return PreloadStatus::Cancelled;
        }
        status
    }
}

/// Preloads frame sequences through a worker pool, publishing on an event bus.
pub struct Preloader {
    store: Arc<dyn AssetStore>,
    pool: Arc<dyn WorkerPool>,
    pattern: FramePattern,
    bus: EventBus,
    epoch: Epoch,
}

impl Preloader {
    pub fn new(
        store: Arc<dyn AssetStore>,
        pool: Arc<dyn WorkerPool>,
        pattern: FramePattern,
        bus: EventBus,
    ) -> Self {
        Self {
            store,
            pool,
            pattern,
            bus,
            epoch: Epoch::new(),
        }
    }

    pub fn pattern(&self) -> &FramePattern {
        &self.pattern
    }

    /// Start loading frames `0..total`. Abandons any earlier cycle.
    ///
    /// Returns immediately; results arrive as bus events (possibly before this
    /// returns, if the pool runs jobs inline).
    pub fn start(&self, total: usize) -> PreloadHandle {
        self.start_cycle(Uuid::new_v4(), total)
    }

    /// `start()` with a caller-chosen cycle id, so the caller can recognize its
    /// own events even when they fire before this returns.
    pub fn start_cycle(&self, id: Uuid, total: usize) -> PreloadHandle {
        let epoch = self.epoch.increment();
        let cycle = Arc::new(Cycle {
            id,
            epoch,
            epochs: self.epoch.clone(),
            total,
            percent: AtomicU8::new(0),
            inner: Mutex::new(CycleInner {
                slots: vec![None; total],
                loaded: 0,
                status: PreloadStatus::Loading,
                outbox: VecDeque::new(),
            }),
            publishing: Mutex::new(()),
        });
        let handle = PreloadHandle {
            cycle: Arc::clone(&cycle),
        };

        if total == 0 {
            cycle.lock().status = PreloadStatus::Failed;
            error!("Failed to load frames: {}", PreloadError::Empty);
            self.bus.emit(PreloadFailed {
                cycle: cycle.id,
                error: Arc::new(PreloadError::Empty),
            });
            return handle;
        }

        info!("Preload {}: requesting {} frames", cycle.id, total);

        for index in 0..total {
            let cycle = Arc::clone(&cycle);
            let store = Arc::clone(&self.store);
            let bus = self.bus.clone();
            let locator = self.pattern.resolve(index);

            let job = self.epoch.guard(epoch, move || {
                let result = store.fetch(&locator);
                cycle.complete(index, locator, result, &bus);
            });
            self.pool.execute(Box::new(job));
        }

        handle
    }

    /// Abandon the running cycle (if any). Late completions mutate nothing.
    pub fn cancel(&self) {
        let epoch = self.epoch.increment();
        debug!("Preloader: cancelled (epoch {})", epoch);
    }
}

impl Drop for Preloader {
    fn drop(&mut self) {
        self.cancel();
    }
}
