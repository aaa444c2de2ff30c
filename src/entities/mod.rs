//! Entities module - frame assets, naming, geometry and the host-facing traits
//!
//! Everything here is independent of the event loop; `core` builds the
//! renderer on top of these types.

pub mod frame;
pub mod frame_path;
pub mod geometry;
pub mod loader;
pub mod surface;
pub mod traits;

pub use frame::{FrameAsset, FrameError};
pub use frame_path::FramePattern;
pub use geometry::{Color, Rect, SurfaceSize};
pub use loader::FsAssetStore;
pub use surface::RasterSurface;
pub use traits::{AssetStore, Job, Surface, WorkerPool};
