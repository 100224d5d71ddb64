// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Encoder quality presets
///
/// Picks the bitrate for hardware encoders and the JPEG quality for the
/// Motion-JPEG fallback encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BitratePreset {
    /// Smaller files, reduced quality
    Low,
    /// Balanced quality and file size (default)
    #[default]
    Medium,
    /// Larger files, better quality
    High,
}

impl BitratePreset {
    /// All presets, lowest first
    pub const ALL: [BitratePreset; 3] = [
        BitratePreset::Low,
        BitratePreset::Medium,
        BitratePreset::High,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            BitratePreset::Low => "Low",
            BitratePreset::Medium => "Medium",
            BitratePreset::High => "High",
        }
    }

    /// Target bitrate in kbps for a given frame width
    ///
    /// - SD (up to 640 wide): Low=1, Medium=2, High=4 Mbps
    /// - HD (up to 1280 wide): Low=2.5, Medium=5, High=10 Mbps
    /// - Full HD and above: Low=4, Medium=8, High=16 Mbps
    pub fn bitrate_kbps(&self, width: u32) -> u32 {
        let tier = if width <= 640 {
            0
        } else if width <= 1280 {
            1
        } else {
            2
        };

        match (tier, self) {
            (0, BitratePreset::Low) => 1_000,
            (0, BitratePreset::Medium) => 2_000,
            (0, BitratePreset::High) => 4_000,
            (1, BitratePreset::Low) => 2_500,
            (1, BitratePreset::Medium) => 5_000,
            (1, BitratePreset::High) => 10_000,
            (_, BitratePreset::Low) => 4_000,
            (_, BitratePreset::Medium) => 8_000,
            (_, BitratePreset::High) => 16_000,
        }
    }

    /// JPEG quality (1-100) used by the Motion-JPEG encoder
    pub fn jpeg_quality(&self) -> u8 {
        match self {
            BitratePreset::Low => 60,
            BitratePreset::Medium => 80,
            BitratePreset::High => 92,
        }
    }
}

/// Fixed render target sizes
pub mod surfaces {
    /// Width of each preview thumbnail
    pub const PREVIEW_WIDTH: u32 = 150;

    /// Height of each preview thumbnail
    pub const PREVIEW_HEIGHT: u32 = 100;

    /// Recording surface size used before the source reports its intrinsic size
    pub const FALLBACK_RECORDING_WIDTH: u32 = 640;
    pub const FALLBACK_RECORDING_HEIGHT: u32 = 480;
}

/// Timing constants for the capture and recording pipelines
pub mod timing {
    use super::Duration;

    /// Countdown start value (ticks)
    pub const COUNTDOWN_START: u32 = 3;

    /// Interval between countdown ticks
    pub const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

    /// How long the flash pulse stays visible
    pub const FLASH_DURATION: Duration = Duration::from_millis(200);

    /// Nominal capture rate of the recording surface
    pub const RECORDING_FPS: u32 = 30;

    /// How often the encoder emits a data chunk
    pub const CHUNK_INTERVAL: Duration = Duration::from_secs(1);

    /// Display refresh interval the CLI drives the frame loop at (~60 Hz)
    pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

    /// Maximum time to wait for the encoder to flush after stop
    pub const FINALIZE_TIMEOUT: Duration = Duration::from_secs(5);

    /// Frame duration for virtual sources
    pub const VIRTUAL_FRAME_DURATION: Duration = Duration::from_millis(33);
}

/// Output container MIME types
pub mod formats {
    pub const MIME_MP4: &str = "video/mp4";
    pub const MIME_WEBM_H264: &str = "video/webm; codecs=h264";
    pub const MIME_WEBM: &str = "video/webm";
    pub const MIME_MJPEG: &str = "video/x-motion-jpeg";

    /// Preferred recording formats, highest priority first
    pub const PREFERRED_MIME_TYPES: &[&str] = &[MIME_MP4, MIME_WEBM_H264, MIME_WEBM];
}

/// Suggested export file names
pub mod file_names {
    pub const PHOTO_STEM: &str = "honey-snap-photo";
    pub const VIDEO_STEM: &str = "honey-snap-video";
}

/// Application information utilities
pub mod app_info {
    /// Application version from the build environment
    pub fn version() -> &'static str {
        env!("GIT_VERSION")
    }

    pub const APP_DIR_NAME: &str = "honey-snap";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitrate_tiers() {
        assert_eq!(BitratePreset::Medium.bitrate_kbps(640), 2_000);
        assert_eq!(BitratePreset::High.bitrate_kbps(1280), 10_000);
        assert_eq!(BitratePreset::Low.bitrate_kbps(1920), 4_000);
    }

    #[test]
    fn test_jpeg_quality_increases_with_preset() {
        let qualities: Vec<u8> = BitratePreset::ALL.iter().map(|p| p.jpeg_quality()).collect();
        assert!(qualities.windows(2).all(|w| w[0] < w[1]));
    }
}
