//! Renderer configuration and config file discovery
//!
//! `RendererConfig` carries every deployment-specific constant of a frame
//! sequence (length, naming, watermark band, colors, scroll range). It is read
//! from `scrolly.json`; every field has a default, so a partial file is fine.

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::completion::DEFAULT_COMPLETION_THRESHOLD;
use crate::core::compositor::{Compositor, DEFAULT_WATERMARK_PX};
use crate::core::scroll::ScrollOffset;
use crate::entities::{Color, FramePattern};

/// Config file name looked up in the config directory
pub const CONFIG_FILE: &str = "scrolly.json";

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "SCROLLY_CONFIG_DIR";

/// Configuration validation errors
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("total_frames must be at least 1")]
    NoFrames,

    #[error("pad_width {pad_width} is too narrow for {total_frames} frames")]
    PadTooNarrow { pad_width: usize, total_frames: usize },

    #[error("completion_threshold {0} outside [0, 1]")]
    Threshold(f64),

    #[error("scroll_offset start and end are the same intersection ({0})")]
    DegenerateOffset(String),
}

/// Everything the renderer needs to know about a frame sequence deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Number of frames in the sequence
    pub total_frames: usize,
    /// Asset naming convention
    pub frame_pattern: FramePattern,
    /// Height of the watermark band cropped from the bottom of every frame.
    /// Re-measure whenever the frames are regenerated.
    pub watermark_px: u32,
    /// Letterbox color; must match the page background
    pub background: Color,
    /// Scroll progress at which the canvas layer retires
    pub completion_threshold: f64,
    /// Tracked scroll range of the container
    pub scroll_offset: ScrollOffset,
    /// Worker threads for fetch/decode (None = number of CPUs)
    pub workers: Option<usize>,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            total_frames: 120,
            frame_pattern: FramePattern::default(),
            watermark_px: DEFAULT_WATERMARK_PX,
            background: Color::BACKDROP,
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            scroll_offset: ScrollOffset::default(),
            workers: None,
        }
    }
}

impl RendererConfig {
    /// Check invariants the renderer relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_frames == 0 {
            return Err(ConfigError::NoFrames);
        }
        if !self.frame_pattern.fits(self.total_frames) {
            return Err(ConfigError::PadTooNarrow {
                pad_width: self.frame_pattern.pad_width,
                total_frames: self.total_frames,
            });
        }
        if !(0.0..=1.0).contains(&self.completion_threshold) {
            return Err(ConfigError::Threshold(self.completion_threshold));
        }
        if self.scroll_offset.start == self.scroll_offset.end {
            return Err(ConfigError::DegenerateOffset(self.scroll_offset.start.to_string()));
        }
        Ok(())
    }

    /// Worker thread count after applying the default
    pub fn worker_threads(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }

    pub fn compositor(&self) -> Compositor {
        Compositor::new(self.watermark_px, self.background)
    }

    /// Parse and validate a config from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).context("Invalid renderer config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config = Self::from_json(&text)
            .with_context(|| format!("Failed to load config: {}", path.display()))?;
        info!("Loaded config: {}", path.display());
        Ok(config)
    }

    /// Load the discovered config file, or defaults if there is none
    pub fn load_or_default(paths: &PathConfig) -> Result<Self> {
        let path = config_file(CONFIG_FILE, paths);
        if path.exists() {
            Self::load(&path)
        } else {
            debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Write config as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write config: {}", path.display()))
    }
}

// ========== Config discovery ==========

/// Configuration for overriding default application paths
#[derive(Debug, Clone)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Create PathConfig from CLI arguments and environment variables
    ///
    /// Priority: CLI args → ENV var (SCROLLY_CONFIG_DIR) → None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from));
        Self { config_dir }
    }
}

/// Get path to a configuration file
///
/// Priority:
/// 1. CLI --config-dir argument
/// 2. SCROLLY_CONFIG_DIR environment variable
/// 3. Local folder IF the file exists there
/// 4. Platform-specific config directory from dirs-next (default)
///
/// Platform paths:
/// - Linux: ~/.config/scrolly/{name}
/// - macOS: ~/Library/Application Support/scrolly/{name}
/// - Windows: %APPDATA%\scrolly\{name}
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.join(name);
    }

    if let Ok(current_dir) = std::env::current_dir() {
        if current_dir.join(name).exists() {
            return current_dir.join(name);
        }
    }

    if let Some(dir) = dirs_next::config_dir() {
        return dir.join("scrolly").join(name);
    }

    PathBuf::from(".").join(name)
}

/// Get path to a data file (logs)
///
/// Priority: CLI/ENV config dir → platform data directory → local folder
pub fn data_file(name: &str, config: &PathConfig) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.join(name);
    }

    if let Some(dir) = dirs_next::data_dir() {
        return dir.join("scrolly").join(name);
    }

    PathBuf::from(".").join(name)
}

/// Create the directory that data files land in
pub fn ensure_dirs(config: &PathConfig) -> std::io::Result<()> {
    if let Some(dir) = data_file("scrolly.log", config).parent() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scroll::Intersection;
    use crate::test_support::temp_dir;

    #[test]
    fn test_defaults_are_reference_deployment() {
        let config = RendererConfig::default();
        assert_eq!(config.total_frames, 120);
        assert_eq!(config.watermark_px, 40);
        assert_eq!(config.background, "#0a0a0a".parse().unwrap());
        assert_eq!(config.completion_threshold, 0.95);
        assert_eq!(config.frame_pattern.resolve(5), "/sequence/frame_005.png");
        assert!(config.validate().is_ok());
    }

    /// Test: Partial JSON
    /// Validates: Missing fields fall back to defaults
    #[test]
    fn test_partial_json() {
        let config = RendererConfig::from_json(
            r##"{ "total_frames": 48, "watermark_px": 0, "background": "#ffffff",
                 "scroll_offset": { "start": "start end", "end": "end start" } }"##,
        )
        .unwrap();

        assert_eq!(config.total_frames, 48);
        assert_eq!(config.watermark_px, 0);
        assert_eq!(config.background, Color::rgb(255, 255, 255));
        assert_eq!(config.scroll_offset.start, Intersection::START_END);
        assert_eq!(config.frame_pattern, FramePattern::default());
    }

    #[test]
    fn test_validation() {
        let bad = |f: fn(&mut RendererConfig)| {
            let mut c = RendererConfig::default();
            f(&mut c);
            c.validate().unwrap_err()
        };

        assert_eq!(bad(|c| c.total_frames = 0), ConfigError::NoFrames);
        assert!(matches!(bad(|c| c.total_frames = 1001), ConfigError::PadTooNarrow { .. }));
        assert_eq!(bad(|c| c.completion_threshold = 1.5), ConfigError::Threshold(1.5));
        assert!(matches!(
            bad(|c| c.scroll_offset.end = c.scroll_offset.start),
            ConfigError::DegenerateOffset(_)
        ));

        assert!(RendererConfig::from_json(r#"{ "total_frames": 0 }"#).is_err());
        assert!(RendererConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_save_load_file() {
        let dir = temp_dir("config");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(CONFIG_FILE);

        let mut config = RendererConfig::default();
        config.total_frames = 60;
        config.workers = Some(2);
        config.save(&path).unwrap();

        let loaded = RendererConfig::load_or_default(&PathConfig {
            config_dir: Some(dir.clone()),
        })
        .unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.worker_threads(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = RendererConfig::load_or_default(&PathConfig {
            config_dir: Some(temp_dir("config_missing")),
        })
        .unwrap();
        assert_eq!(config, RendererConfig::default());
    }

    #[test]
    fn test_config_file_with_custom_dir() {
        let config = PathConfig {
            config_dir: Some(PathBuf::from("/custom")),
        };
        assert_eq!(config_file("test.json", &config), PathBuf::from("/custom/test.json"));
        assert_eq!(data_file("scrolly.log", &config), PathBuf::from("/custom/scrolly.log"));
    }

    #[test]
    fn test_ensure_dirs_creates_data_dir() {
        let dir = temp_dir("config_dirs").join("nested");
        let config = PathConfig {
            config_dir: Some(dir.clone()),
        };
        ensure_dirs(&config).unwrap();
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(dir.parent().unwrap());
    }
}
