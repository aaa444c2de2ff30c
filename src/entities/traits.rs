//! Abstract traits for dependency inversion.
//!
//! These traits define what the renderer needs from its host: somewhere to
//! fetch frames from, something to draw on, and somewhere to run background work.
//! Implementations live in `entities/loader.rs`, `entities/surface.rs` and
//! `core/workers.rs`; tests plug in their own.

use std::sync::Arc;

use super::frame::{FrameAsset, FrameError};
use super::geometry::{Color, Rect, SurfaceSize};

/// Read-only store of immutable frame assets addressed by locator.
///
/// `fetch` is called from worker threads, once per frame per preload cycle.
pub trait AssetStore: Send + Sync {
    /// Fetch and decode the asset at `locator`.
    fn fetch(&self, locator: &str) -> Result<FrameAsset, FrameError>;
}

/// 2D raster drawing surface (canvas-like).
///
/// Only the compositor draws on it; the resize coordinator only changes its size.
pub trait Surface: Send {
    /// Current backing-store size in pixels.
    fn size(&self) -> SurfaceSize;

    /// Resize the backing store. Contents after a resize are unspecified.
    fn set_size(&mut self, size: SurfaceSize);

    /// Fill `rect` with a solid color.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Draw the `src` region of `asset` scaled into the `dst` region.
    fn draw_image(&mut self, asset: &FrameAsset, src: Rect, dst: Rect);
}

/// Boxed unit of background work
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Abstract worker pool interface.
///
/// Allows the preloader to schedule background work without knowing
/// the concrete thread pool implementation. Cancellation is the caller's
/// business (see `core::epoch::Epoch::guard`).
pub trait WorkerPool: Send + Sync {
    /// Run `job` at some later point, possibly on another thread.
    fn execute(&self, job: Job);
}

/// Blanket impl: Arc<T> implements traits if T does
impl<T: AssetStore + ?Sized> AssetStore for Arc<T> {
    fn fetch(&self, locator: &str) -> Result<FrameAsset, FrameError> {
        (**self).fetch(locator)
    }
}

impl<T: WorkerPool + ?Sized> WorkerPool for Arc<T> {
    fn execute(&self, job: Job) {
        (**self).execute(job)
    }
}
