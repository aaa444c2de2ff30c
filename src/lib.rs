//! SCROLLY - scroll-scrubbed image sequence renderer library
//!
//! Re-exports all modules for use by binary targets.

// Core engine (sampling, preload, compositing, events, workers)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod entities;
pub mod progress;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types from core
pub use core::event_bus::{BoxedEvent, EventBus, downcast_event};
pub use core::renderer::{RendererPhase, ScrollyRenderer};
pub use core::workers::Workers;

// Re-export entities
pub use config::RendererConfig;
pub use entities::{FrameAsset, FramePattern, FsAssetStore, RasterSurface, SurfaceSize};
