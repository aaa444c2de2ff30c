//! Frame path resolver
//!
//! Maps a zero-based frame index to the locator of its asset. The numeric part is
//! zero-padded to a fixed width so listing assets by name yields playback order.

use serde::{Deserialize, Serialize};

/// Naming convention of a frame sequence: `{prefix}{index:0pad_width}.{extension}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FramePattern {
    pub prefix: String,
    pub pad_width: usize,
    pub extension: String,
}

impl Default for FramePattern {
    fn default() -> Self {
        Self {
            prefix: "/sequence/frame_".to_string(),
            pad_width: 3,
            extension: "png".to_string(),
        }
    }
}

impl FramePattern {
    pub fn new(prefix: impl Into<String>, pad_width: usize, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            pad_width,
            extension: extension.into(),
        }
    }

    /// Locator for frame `index`.
    ///
    /// `index` must already be clamped to the sequence range.
    pub fn resolve(&self, index: usize) -> String {
        format!(
            "{}{:0width$}.{}",
            self.prefix,
            index,
            self.extension,
            width = self.pad_width
        )
    }

    /// True if every index below `total` pads to the same width.
    ///
    /// Without this, `frame_1000` sorts before `frame_999` by name.
    pub fn fits(&self, total: usize) -> bool {
        digits(total.saturating_sub(1)) <= self.pad_width
    }
}

/// Number of decimal digits in `n` (`digits(0) == 1`)
pub fn digits(n: usize) -> usize {
    let mut n = n;
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}
