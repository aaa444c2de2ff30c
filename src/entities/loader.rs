//! Frame asset store backed by a deployed asset directory
//!
//! Locators produced by `FramePattern` are site-absolute (`/sequence/frame_000.png`);
//! the store resolves them against a root directory standing in for the web root
//! the assets were deployed with.

use std::path::{Component, Path, PathBuf};

use log::trace;

use super::frame::{FrameAsset, FrameError};
use super::traits::AssetStore;

/// Asset store reading frames from a root directory
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a locator to a path under the root.
    ///
    /// Returns None for locators escaping the root (`..`).
    pub fn path_for(&self, locator: &str) -> Option<PathBuf> {
        let relative = Path::new(locator.trim_start_matches('/'));
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl AssetStore for FsAssetStore {
    fn fetch(&self, locator: &str) -> Result<FrameAsset, FrameError> {
        let path = self
            .path_for(locator)
            .ok_or_else(|| FrameError::NotFound(locator.to_string()))?;
        trace!("FsAssetStore: {} -> {}", locator, path.display());
        FrameAsset::open(locator, &path)
    }
}
