//! Test doubles shared by unit tests: in-memory assets, recording surface,
//! deterministic worker pools.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};

use crate::entities::{
    AssetStore, Color, FrameAsset, FrameError, FramePattern, Job, Rect, Surface, SurfaceSize,
    WorkerPool,
};

pub fn solid_frame(width: u32, height: u32, rgba: [u8; 4]) -> FrameAsset {
    FrameAsset::from_rgba(RgbaImage::from_pixel(width, height, Rgba(rgba)))
}

/// Unique scratch directory under the system temp dir
pub fn temp_dir(tag: &str) -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!("scrolly_test_{}_{}_{}", tag, std::process::id(), n))
}

// ========== Assets ==========

/// In-memory asset store; locators listed in `failing` return an error.
#[derive(Default)]
pub struct MemoryAssetStore {
    assets: HashMap<String, FrameAsset>,
    failing: Vec<String>,
    pub fetches: AtomicUsize,
}

impl MemoryAssetStore {
    /// `total` frames named by `pattern`; frame `i` is `(i+1)` pixels wide so tests
    /// can tell frames apart by width.
    pub fn sequence(pattern: &FramePattern, total: usize, height: u32) -> Self {
        let assets = (0..total)
            .map(|i| (pattern.resolve(i), solid_frame(i as u32 + 1, height, [i as u8, 0, 0, 255])))
            .collect();
        Self {
            assets,
            ..Default::default()
        }
    }

    pub fn failing(mut self, locator: impl Into<String>) -> Self {
        self.failing.push(locator.into());
        self
    }
}

impl AssetStore for MemoryAssetStore {
    fn fetch(&self, locator: &str) -> Result<FrameAsset, FrameError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|l| l == locator) {
            return Err(FrameError::decode(locator, "corrupt test asset"));
        }
        self.assets
            .get(locator)
            .cloned()
            .ok_or_else(|| FrameError::NotFound(locator.to_string()))
    }
}

// ========== Surfaces ==========

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Fill(Rect, Color),
    Image { asset_width: u32, src: Rect, dst: Rect },
}

/// Surface that records every draw call
#[derive(Debug)]
pub struct RecordingSurface {
    size: SurfaceSize,
    pub calls: Vec<DrawCall>,
    pub resizes: Vec<SurfaceSize>,
}

impl RecordingSurface {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            size,
            calls: Vec::new(),
            resizes: Vec::new(),
        }
    }

    /// Width of the most recently drawn asset
    pub fn last_drawn_width(&self) -> Option<u32> {
        self.calls.iter().rev().find_map(|c| match c {
            DrawCall::Image { asset_width, .. } => Some(*asset_width),
            DrawCall::Fill(..) => None,
        })
    }

    pub fn image_calls(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, DrawCall::Image { .. })).count()
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> SurfaceSize {
        self.size
    }

    fn set_size(&mut self, size: SurfaceSize) {
        self.size = size;
        self.resizes.push(size);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.calls.push(DrawCall::Fill(rect, color));
    }

    fn draw_image(&mut self, asset: &FrameAsset, src: Rect, dst: Rect) {
        self.calls.push(DrawCall::Image {
            asset_width: asset.width(),
            src,
            dst,
        });
    }
}

// ========== Worker pools ==========

/// Runs every job immediately on the submitting thread
pub struct InlinePool;

impl WorkerPool for InlinePool {
    fn execute(&self, job: Job) {
        job();
    }
}

/// Holds jobs until the test runs them, in any order it likes
#[derive(Default)]
pub struct QueuedPool {
    jobs: Mutex<Vec<Job>>,
}

impl QueuedPool {
    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    fn take(&self) -> Vec<Job> {
        std::mem::take(&mut *self.jobs.lock().unwrap())
    }

    pub fn run_all(&self) {
        for job in self.take() {
            job();
        }
    }

    /// Completion order opposite to submission order
    pub fn run_reversed(&self) {
        for job in self.take().into_iter().rev() {
            job();
        }
    }

    /// Run only the first `n` submitted jobs; the rest stay queued
    pub fn run_first(&self, n: usize) {
        let mut jobs = self.take();
        let rest = jobs.split_off(n.min(jobs.len()));
        *self.jobs.lock().unwrap() = rest;
        for job in jobs {
            job();
        }
    }
}

impl WorkerPool for QueuedPool {
    fn execute(&self, job: Job) {
        self.jobs.lock().unwrap().push(job);
    }
}

/// Shared handle so a test keeps access to the pool it hands to the renderer
pub fn queued_pool() -> Arc<QueuedPool> {
    Arc::new(QueuedPool::default())
}
