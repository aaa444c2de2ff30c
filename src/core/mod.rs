//! Core engine modules - scroll sampling, preload, compositing, events, workers
//!
//! These modules form the scrubbing engine, independent of any host surface.

pub mod completion;
pub mod compositor;
pub mod epoch;
pub mod event_bus;
pub mod frame_mapper;
pub mod preloader;
pub mod renderer;
pub mod renderer_events;
pub mod scroll;
pub mod workers;

// Re-exports for convenience
pub use completion::CompletionGate;
pub use compositor::{Compositor, DrawPlan};
pub use epoch::Epoch;
pub use event_bus::{EventBus, SubscriptionId};
pub use frame_mapper::FrameMapper;
pub use preloader::{FrameSet, PreloadError, PreloadHandle, PreloadStatus, Preloader};
pub use renderer::{RendererPhase, ScrollyRenderer};
pub use scroll::{Intersection, ScrollMetrics, ScrollOffset, ScrollProgress, ScrollSampler};
pub use workers::Workers;
