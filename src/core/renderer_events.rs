//! Renderer events.
//!
//! Host → renderer: `ScrollMeasured`, `ViewportResized`.
//! Preloader → renderer/presentation: `PreloadProgress`, `PreloadFinished`, `PreloadFailed`.
//! Renderer → presentation: `CompletionChanged`, `FrameDrawn`.
//!
//! All of them also land in the bus queue for `EventBus::poll()`.

use std::sync::Arc;

use uuid::Uuid;

use super::preloader::{FrameSet, PreloadError};
use super::scroll::ScrollMetrics;
use crate::entities::SurfaceSize;

/// Host measured the tracked container after a scroll.
#[derive(Clone, Debug)]
pub struct ScrollMeasured(pub ScrollMetrics);

/// Host viewport changed size.
#[derive(Clone, Debug)]
pub struct ViewportResized(pub SurfaceSize);

/// One more frame of a preload cycle finished decoding.
#[derive(Clone, Debug)]
pub struct PreloadProgress {
    pub cycle: Uuid,
    /// round(loaded / total * 100)
    pub percent: u8,
    pub loaded: usize,
    pub total: usize,
}

/// Every frame of the cycle loaded; frames are in playback order.
#[derive(Clone, Debug)]
pub struct PreloadFinished {
    pub cycle: Uuid,
    pub frames: FrameSet,
}

/// A frame failed; the whole cycle is abandoned.
#[derive(Clone, Debug)]
pub struct PreloadFailed {
    pub cycle: Uuid,
    pub error: Arc<PreloadError>,
}

/// Completion flag flipped (canvas layer should fade out / back in).
#[derive(Clone, Debug)]
pub struct CompletionChanged {
    pub complete: bool,
}

/// Compositor drew frame `index` on a surface of `size`.
#[derive(Clone, Debug)]
pub struct FrameDrawn {
    pub index: usize,
    pub size: SurfaceSize,
}
