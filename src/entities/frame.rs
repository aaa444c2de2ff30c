//! Decoded frame assets
//!
//! **Why**: The compositor needs the decoded RGBA pixels plus the natural size of
//! every frame in the sequence. Assets are immutable once decoded, so a frame is a
//! cheap `Arc` handle that can be shared between the preloader, the renderer and
//! the event bus without copying pixel data.
//!
//! **Used by**: Asset stores (decode), Preloader (ordered collection), Compositor (blit source)

use std::path::Path;
use std::sync::Arc;

use image::RgbaImage;
use log::debug;

/// Frame loading errors
#[derive(thiserror::Error, Debug)]
pub enum FrameError {
    #[error("I/O error for {locator}: {source}")]
    Io {
        locator: String,
        #[source]
        source: std::io::Error,
    },

    #[error("decode error for {locator}: {message}")]
    Decode { locator: String, message: String },

    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("empty image: {0}")]
    Empty(String),
}

impl FrameError {
    pub fn decode(locator: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            locator: locator.into(),
            message: message.to_string(),
        }
    }
}

/// Single decoded frame of the sequence.
///
/// Clone is cheap (shared pixel buffer).
#[derive(Debug, Clone)]
pub struct FrameAsset {
    image: Arc<RgbaImage>,
}

impl FrameAsset {
    /// Wrap an already decoded RGBA image
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self { image: Arc::new(image) }
    }

    /// Decode an encoded image (PNG/JPEG/WebP) from memory
    pub fn decode(locator: &str, bytes: &[u8]) -> Result<Self, FrameError> {
        let img = image::load_from_memory(bytes).map_err(|e| FrameError::decode(locator, e))?;
        Self::checked(locator, img.to_rgba8())
    }

    /// Load and decode an image file
    pub fn open(locator: &str, path: &Path) -> Result<Self, FrameError> {
        debug!("Loading frame: {}", path.display());

        let bytes = std::fs::read(path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => FrameError::NotFound(locator.to_string()),
            _ => FrameError::Io {
                locator: locator.to_string(),
                source,
            },
        })?;

        Self::decode(locator, &bytes)
    }

    fn checked(locator: &str, rgba: RgbaImage) -> Result<Self, FrameError> {
        if rgba.width() == 0 || rgba.height() == 0 {
            return Err(FrameError::Empty(locator.to_string()));
        }
        Ok(Self::from_rgba(rgba))
    }

    /// Natural width in pixels
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Natural height in pixels
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Get resolution as tuple
    pub fn resolution(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Borrow decoded pixels
    pub fn pixels(&self) -> &RgbaImage {
        &self.image
    }

    /// Memory size in bytes
    pub fn mem(&self) -> usize {
        self.image.as_raw().len()
    }
}
