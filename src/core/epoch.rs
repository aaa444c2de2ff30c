//! Epoch counter for cancelling stale background work
//!
//! Every preload cycle records the epoch it started in. Advancing the epoch
//! (teardown, restart) makes queued jobs skip themselves and makes finished
//! jobs drop their results instead of publishing them.

use log::debug;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared epoch counter. Clones observe the same counter.
#[derive(Debug, Clone, Default)]
pub struct Epoch {
    current: Arc<AtomicU64>,
}

impl Epoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get current epoch
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::Acquire)
    }

    /// Increment epoch and return new value
    ///
    /// Invalidates all work tagged with an older epoch.
    pub fn increment(&self) -> u64 {
        let new_epoch = self.current.fetch_add(1, Ordering::AcqRel) + 1;
        debug!("Epoch incremented: {}", new_epoch);
        new_epoch
    }

    /// True while no increment happened since `epoch` was read
    pub fn is_current(&self, epoch: u64) -> bool {
        self.current() == epoch
    }

    /// Wrap a job so it only runs if `epoch` is still current when it starts.
    ///
    /// The check happens at execution time, not enqueue time.
    pub fn guard<F>(&self, epoch: u64, f: F) -> impl FnOnce() + Send + 'static
    where
        F: FnOnce() + Send + 'static,
    {
        let current = Arc::clone(&self.current);
        move || {
            if current.load(Ordering::Acquire) == epoch {
                f();
            }
        }
    }
}
