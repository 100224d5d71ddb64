// SPDX-License-Identifier: GPL-3.0-only

//! User configuration
//!
//! Stored as JSON in `$XDG_CONFIG_HOME/honey-snap/config.json`. A missing file
//! yields [`Config::default`]; unknown or missing keys fall back to defaults.

use crate::constants::{BitratePreset, app_info, formats, surfaces, timing};
use crate::errors::{AppError, AppResult};
use crate::media::encoders::EncoderSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Still image export format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PhotoFormat {
    #[default]
    Png,
    Jpeg,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capture device (`/dev/videoN`, `test-pattern` or `image:<path>`)
    pub device: Option<String>,
    /// Ask the device for microphone tracks too
    ///
    /// Only a hint: the built-in devices provide video only, and tracks a
    /// device does hand over are passed to the encoder, which may drop them.
    pub capture_audio: bool,
    /// Mirror camera frames horizontally (selfie mode)
    pub mirror_preview: bool,
    /// Preset id selected for preview at startup
    pub preview_filter: String,
    /// Countdown length in one-second ticks
    pub countdown_seconds: u32,
    /// Flash pulse duration in milliseconds
    pub flash_duration_ms: u64,
    /// Recording frame rate
    pub recording_fps: u32,
    /// Encoder chunk interval in milliseconds
    pub chunk_interval_ms: u64,
    /// Recording surface width used until the camera reports its size
    pub fallback_recording_width: u32,
    /// Recording surface height used until the camera reports its size
    pub fallback_recording_height: u32,
    /// Recording formats in priority order (MIME types)
    pub preferred_formats: Vec<String>,
    /// Encoder quality preset
    pub bitrate_preset: BitratePreset,
    /// Still image export format
    pub photo_format: PhotoFormat,
    /// JPEG quality for still image export
    pub jpeg_quality: u8,
    /// Override for the photo output directory
    pub photo_dir: Option<PathBuf>,
    /// Override for the video output directory
    pub video_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: None,
            capture_audio: false,
            mirror_preview: true, // Default to mirrored (selfie mode)
            preview_filter: "none".to_string(),
            countdown_seconds: timing::COUNTDOWN_START,
            flash_duration_ms: timing::FLASH_DURATION.as_millis() as u64,
            recording_fps: timing::RECORDING_FPS,
            chunk_interval_ms: timing::CHUNK_INTERVAL.as_millis() as u64,
            fallback_recording_width: surfaces::FALLBACK_RECORDING_WIDTH,
            fallback_recording_height: surfaces::FALLBACK_RECORDING_HEIGHT,
            preferred_formats: formats::PREFERRED_MIME_TYPES
                .iter()
                .map(|m| m.to_string())
                .collect(),
            bitrate_preset: BitratePreset::default(),
            photo_format: PhotoFormat::default(),
            jpeg_quality: 90,
            photo_dir: None,
            video_dir: None,
        }
    }
}

impl Config {
    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(app_info::APP_DIR_NAME).join("config.json"))
    }

    /// Load from the default location, or defaults when absent
    pub fn load() -> AppResult<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from a specific file; a missing file yields defaults
    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)?;
        config.validate()?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Write to a specific file, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject values the pipelines cannot work with
    pub fn validate(&self) -> AppResult<()> {
        if self.recording_fps == 0 || self.recording_fps > 120 {
            return Err(AppError::Config(format!(
                "recording_fps must be between 1 and 120, got {}",
                self.recording_fps
            )));
        }
        if self.countdown_seconds == 0 {
            return Err(AppError::Config("countdown_seconds must be at least 1".into()));
        }
        if self.chunk_interval_ms == 0 {
            return Err(AppError::Config("chunk_interval_ms must be positive".into()));
        }
        if self.fallback_recording_width == 0 || self.fallback_recording_height == 0 {
            return Err(AppError::Config(format!(
                "fallback recording size must be non-zero, got {}x{}",
                self.fallback_recording_width, self.fallback_recording_height
            )));
        }
        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(AppError::Config(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        if crate::media::filters::preset(&self.preview_filter).is_none() {
            return Err(AppError::UnknownFilter(self.preview_filter.clone()));
        }
        Ok(())
    }

    /// Fallback surface size for recordings
    pub fn fallback_recording_size(&self) -> (u32, u32) {
        (self.fallback_recording_width, self.fallback_recording_height)
    }

    pub fn flash_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.flash_duration_ms)
    }

    pub fn chunk_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.chunk_interval_ms)
    }

    /// Settings handed to every encoder backend
    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            chunk_interval: self.chunk_interval(),
            quality: self.bitrate_preset,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.mirror_preview);
        assert_eq!(config.countdown_seconds, 3);
        assert_eq!(config.flash_duration_ms, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"preview_filter":"sepia"}"#).unwrap();
        assert_eq!(config.preview_filter, "sepia");
        assert_eq!(config.recording_fps, 30);
    }

    #[test]
    fn test_unknown_filter_rejected() {
        let config = Config {
            preview_filter: "polaroid".into(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::UnknownFilter(_))));
    }

    #[test]
    fn test_fallback_size_from_config() {
        let config: Config =
            serde_json::from_str(r#"{"fallback_recording_width":320,"fallback_recording_height":240}"#)
                .unwrap();
        assert_eq!(config.fallback_recording_size(), (320, 240));

        let config = Config {
            fallback_recording_height: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
